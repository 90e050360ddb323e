pub mod quarter_reader;
pub mod quarter_writer;
pub mod submission;

pub use quarter_reader::{get_quarters, QuarterReport};
pub use quarter_writer::{refresh_year_rollup, save_draft, save_quarter, SaveAction, SaveOutcome, WriteError};
pub use submission::{QuarterDraft, QuarterSubmission, QuarterTotals, SubmissionError};
