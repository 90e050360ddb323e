use async_trait::async_trait;

use crate::database::manager::StoreError;
use crate::database::models::{
    DonorBehavior, ExpenseBreakdown, IncomeBreakdown, QuarterId, QuarterRecord, QuarterView, YearRollup,
    YearTarget,
};

/// Stored state of one year as seen by a single consistent read
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct YearSnapshot {
    /// Joined with their breakdowns, ordered by quarter number
    pub quarters: Vec<QuarterView>,
    pub target: Option<YearTarget>,
    pub rollup: Option<YearRollup>,
}

/// Read access to the quarter tables plus the entry point for write transactions
#[async_trait]
pub trait QuarterStore: Send + Sync {
    /// Open a write transaction. Dropping the handle without `commit` discards every write.
    async fn begin(&self) -> Result<Box<dyn QuarterTx>, StoreError>;

    /// Quarters, target and rollup of `year`, all read from one snapshot
    async fn read_year(&self, year: i32) -> Result<YearSnapshot, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

/// Typed write operations, all executed inside one transaction
#[async_trait]
pub trait QuarterTx: Send {
    /// Insert a zero rollup for `year` unless one exists
    async fn ensure_year_rollup(&mut self, year: i32) -> Result<(), StoreError>;

    async fn upsert_year_target(&mut self, year: i32, target: &YearTarget) -> Result<(), StoreError>;

    /// Locate the quarter row and hold it for the rest of the transaction
    async fn find_quarter(&mut self, year: i32, quarter: i32) -> Result<Option<QuarterId>, StoreError>;

    /// Fails with `StoreError::Conflict` if `(year, quarter)` already exists
    async fn insert_quarter(&mut self, record: &QuarterRecord) -> Result<QuarterId, StoreError>;

    async fn update_quarter(&mut self, id: QuarterId, record: &QuarterRecord) -> Result<(), StoreError>;

    /// Stores the sub-categories together with `income.total()`
    async fn upsert_income(&mut self, id: QuarterId, income: &IncomeBreakdown) -> Result<(), StoreError>;

    /// Stores the sub-categories together with `expense.total()`
    async fn upsert_expense(&mut self, id: QuarterId, expense: &ExpenseBreakdown) -> Result<(), StoreError>;

    async fn upsert_donor_behavior(&mut self, id: QuarterId, donor: &DonorBehavior) -> Result<(), StoreError>;

    /// Sum of surplus, income total and expense total over all quarters of `year`
    async fn aggregate_year(&mut self, year: i32) -> Result<YearRollup, StoreError>;

    async fn write_year_rollup(&mut self, year: i32, rollup: &YearRollup) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
