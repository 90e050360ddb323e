// Quarter save path.
//
// One submission runs as an ordered sequence of repository operations inside
// a single transaction. Each stage is its own type, so the sequence can only
// be driven in order and `commit` is reachable only after the rollup refresh:
//
//   Opened --prepare_year--> YearPrepared --write_quarter--> QuarterWritten
//     --write_breakdowns--> BreakdownsWritten --write_donor_behavior-->
//     DonorBehaviorWritten --refresh_rollup--> RolledUp --commit--> SaveOutcome
//
// Any error drops the transaction handle, which discards the writes so far.

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::database::models::{QuarterId, YearRollup};
use crate::database::{QuarterStore, QuarterTx, StoreError};
use crate::services::submission::{QuarterDraft, QuarterSubmission, QuarterTotals, SubmissionError};

#[derive(Debug, Error)]
pub enum WriteError {
    #[error(transparent)]
    Invalid(#[from] SubmissionError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveAction {
    Inserted,
    Updated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub year: i32,
    pub quarter: i32,
    pub quarter_id: QuarterId,
    pub action: SaveAction,
    pub totals: QuarterTotals,
    pub rollup: YearRollup,
}

impl SaveOutcome {
    pub fn surplus(&self) -> Decimal {
        self.totals.surplus
    }

    /// Confirmation text shown by the dashboard
    pub fn message(&self) -> String {
        let verb = match self.action {
            SaveAction::Inserted => "gespeichert",
            SaveAction::Updated => "aktualisiert",
        };
        format!("Quartal {}/{} erfolgreich {}", self.quarter, self.year, verb)
    }
}

/// Validate a submission and persist it in one transaction
pub async fn save_quarter(
    store: &dyn QuarterStore,
    submission: QuarterSubmission,
) -> Result<SaveOutcome, WriteError> {
    // rejected before any datastore access
    let draft = submission.validate()?;
    Ok(save_draft(store, draft).await?)
}

/// Persist an already validated draft
pub async fn save_draft(store: &dyn QuarterStore, draft: QuarterDraft) -> Result<SaveOutcome, StoreError> {
    let (year, quarter) = (draft.year, draft.quarter);

    let result = async {
        SavePipeline::begin(store, draft)
            .await?
            .prepare_year()
            .await?
            .write_quarter()
            .await?
            .write_breakdowns()
            .await?
            .write_donor_behavior()
            .await?
            .refresh_rollup()
            .await?
            .commit()
            .await
    }
    .await;

    match &result {
        Ok(outcome) => info!(
            "Saved quarter {}/{} (id {}, {:?}), surplus {}",
            quarter, year, outcome.quarter_id, outcome.action, outcome.totals.surplus
        ),
        Err(e) => warn!("Saving quarter {}/{} rolled back: {}", quarter, year, e),
    }

    result
}

/// Recompute and persist the rollup of `year` on its own transaction
pub async fn refresh_year_rollup(store: &dyn QuarterStore, year: i32) -> Result<YearRollup, StoreError> {
    let mut tx = store.begin().await?;
    let rollup = recompute_rollup(tx.as_mut(), year).await?;
    tx.commit().await?;

    info!(
        "Refreshed rollup for {}: income {}, expense {}, surplus {}",
        year, rollup.total_income, rollup.total_expense, rollup.cumulative_surplus
    );
    Ok(rollup)
}

async fn recompute_rollup(tx: &mut dyn QuarterTx, year: i32) -> Result<YearRollup, StoreError> {
    let rollup = tx.aggregate_year(year).await?;
    tx.write_year_rollup(year, &rollup).await?;
    Ok(rollup)
}

pub struct Opened;

pub struct YearPrepared;

pub struct QuarterWritten {
    id: QuarterId,
    action: SaveAction,
}

pub struct BreakdownsWritten {
    id: QuarterId,
    action: SaveAction,
}

pub struct DonorBehaviorWritten {
    id: QuarterId,
    action: SaveAction,
}

pub struct RolledUp {
    id: QuarterId,
    action: SaveAction,
    rollup: YearRollup,
}

pub struct SavePipeline<S> {
    tx: Box<dyn QuarterTx>,
    draft: QuarterDraft,
    totals: QuarterTotals,
    stage: S,
}

impl<S> SavePipeline<S> {
    fn advance<N>(self, stage: N) -> SavePipeline<N> {
        SavePipeline {
            tx: self.tx,
            draft: self.draft,
            totals: self.totals,
            stage,
        }
    }
}

impl SavePipeline<Opened> {
    /// Open the transaction and derive income, expense and surplus from the draft
    pub async fn begin(store: &dyn QuarterStore, draft: QuarterDraft) -> Result<Self, StoreError> {
        let tx = store.begin().await?;
        let totals = draft.totals();

        Ok(Self {
            tx,
            draft,
            totals,
            stage: Opened,
        })
    }

    /// Make sure the year rows exist: a zero rollup if none, and the year target
    pub async fn prepare_year(mut self) -> Result<SavePipeline<YearPrepared>, StoreError> {
        let year = self.draft.year;

        self.tx.ensure_year_rollup(year).await?;
        self.tx.upsert_year_target(year, &self.draft.target).await?;

        debug!("Prepared year rows for {}", year);
        Ok(self.advance(YearPrepared))
    }
}

impl SavePipeline<YearPrepared> {
    /// Insert the quarter row, or update it in place keeping its id
    pub async fn write_quarter(mut self) -> Result<SavePipeline<QuarterWritten>, StoreError> {
        let record = self.draft.record(&self.totals);

        let (id, action) = match self.tx.find_quarter(record.year, record.quarter).await? {
            Some(id) => {
                self.tx.update_quarter(id, &record).await?;
                (id, SaveAction::Updated)
            }
            None => (self.tx.insert_quarter(&record).await?, SaveAction::Inserted),
        };

        debug!("Wrote quarter {}/{} as id {} ({:?})", record.quarter, record.year, id, action);
        Ok(self.advance(QuarterWritten { id, action }))
    }
}

impl SavePipeline<QuarterWritten> {
    pub async fn write_breakdowns(mut self) -> Result<SavePipeline<BreakdownsWritten>, StoreError> {
        let QuarterWritten { id, action } = self.stage;

        self.tx.upsert_income(id, &self.draft.income).await?;
        self.tx.upsert_expense(id, &self.draft.expense).await?;

        Ok(self.advance(BreakdownsWritten { id, action }))
    }
}

impl SavePipeline<BreakdownsWritten> {
    /// Upsert donor behaviour when supplied; an existing row is never removed
    pub async fn write_donor_behavior(mut self) -> Result<SavePipeline<DonorBehaviorWritten>, StoreError> {
        let BreakdownsWritten { id, action } = self.stage;

        if let Some(donor) = self.draft.donor_behavior {
            self.tx.upsert_donor_behavior(id, &donor).await?;
        }

        Ok(self.advance(DonorBehaviorWritten { id, action }))
    }
}

impl SavePipeline<DonorBehaviorWritten> {
    /// Recompute the year's rollup so it sees the rows written above
    pub async fn refresh_rollup(mut self) -> Result<SavePipeline<RolledUp>, StoreError> {
        let DonorBehaviorWritten { id, action } = self.stage;
        let rollup = recompute_rollup(self.tx.as_mut(), self.draft.year).await?;

        Ok(self.advance(RolledUp { id, action, rollup }))
    }
}

impl SavePipeline<RolledUp> {
    pub async fn commit(self) -> Result<SaveOutcome, StoreError> {
        let RolledUp { id, action, rollup } = self.stage;
        self.tx.commit().await?;

        Ok(SaveOutcome {
            year: self.draft.year,
            quarter: self.draft.quarter,
            quarter_id: id,
            action,
            totals: self.totals,
            rollup,
        })
    }
}
