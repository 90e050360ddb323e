pub mod quarter;
pub mod year;

pub use quarter::{
    DonorBehavior, ExpenseBreakdown, IncomeBreakdown, QuarterId, QuarterRecord, QuarterReportRow,
    QuarterView, YearPair,
};
pub use year::{YearRollup, YearTarget};
