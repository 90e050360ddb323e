pub mod manager;
pub mod models;
pub mod postgres;
pub mod repository;

pub use manager::{DatabaseManager, StoreError};
pub use postgres::PgQuarterStore;
pub use repository::{QuarterStore, QuarterTx, YearSnapshot};
