// In-memory quarter store for unit tests.
//
// Transactions are serialized through an owned mutex guard and work on a
// staged copy of the state; `commit` writes the copy back, dropping the
// transaction discards it. Every call is logged and a single operation can be
// made to fail so rollback paths can be exercised.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::database::models::{
    DonorBehavior, ExpenseBreakdown, IncomeBreakdown, QuarterId, QuarterRecord, QuarterReportRow, QuarterView,
    YearRollup, YearTarget,
};
use crate::database::{QuarterStore, QuarterTx, StoreError, YearSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Begin,
    ReadYear,
    HealthCheck,
    EnsureYearRollup,
    UpsertYearTarget,
    FindQuarter,
    InsertQuarter,
    UpdateQuarter,
    UpsertIncome,
    UpsertExpense,
    UpsertDonorBehavior,
    AggregateYear,
    WriteYearRollup,
    Commit,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub last_id: QuarterId,
    pub quarters: BTreeMap<QuarterId, QuarterRecord>,
    pub income: HashMap<QuarterId, IncomeBreakdown>,
    pub expense: HashMap<QuarterId, ExpenseBreakdown>,
    pub donors: HashMap<QuarterId, DonorBehavior>,
    pub targets: HashMap<i32, YearTarget>,
    pub rollups: HashMap<i32, YearRollup>,
}

impl MemoryState {
    fn view(&self, id: QuarterId, record: &QuarterRecord) -> QuarterView {
        let income = self.income.get(&id);
        let expense = self.expense.get(&id);
        let donor = self.donors.get(&id);

        QuarterReportRow {
            id,
            year: record.year,
            quarter: record.quarter,
            period_start: record.period_start,
            period_end: record.period_end,
            surplus: Some(record.surplus),
            balance_current: Some(record.balance.current),
            balance_prior_year: Some(record.balance.prior_year),
            donations_current: income.map(|i| i.donations.current),
            donations_prior_year: income.map(|i| i.donations.prior_year),
            mission_income_current: income.map(|i| i.mission.current),
            mission_income_prior_year: income.map(|i| i.mission.prior_year),
            other_income_current: income.map(|i| i.other.current),
            other_income_prior_year: income.map(|i| i.other.prior_year),
            income_total_current: income.map(|i| i.total().current),
            income_total_prior_year: income.map(|i| i.total().prior_year),
            building_current: expense.map(|e| e.building.current),
            building_prior_year: expense.map(|e| e.building.prior_year),
            personnel_current: expense.map(|e| e.personnel.current),
            personnel_prior_year: expense.map(|e| e.personnel.prior_year),
            mission_expense_current: expense.map(|e| e.mission.current),
            mission_expense_prior_year: expense.map(|e| e.mission.prior_year),
            other_expense_current: expense.map(|e| e.other.current),
            other_expense_prior_year: expense.map(|e| e.other.prior_year),
            expense_total_current: expense.map(|e| e.total().current),
            expense_total_prior_year: expense.map(|e| e.total().prior_year),
            regular_donors_percent: donor.map(|d| d.regular_percent),
            irregular_donors_percent: donor.map(|d| d.irregular_percent),
        }
        .into()
    }

    fn quarters_of(&self, year: i32) -> Vec<QuarterView> {
        let mut views: Vec<QuarterView> = self
            .quarters
            .iter()
            .filter(|(_, record)| record.year == year)
            .map(|(id, record)| self.view(*id, record))
            .collect();
        views.sort_by_key(|q| q.quarter);
        views
    }
}

#[derive(Clone, Default)]
struct Recorder {
    calls: Arc<Mutex<Vec<Op>>>,
    fail: Arc<Mutex<Option<Op>>>,
}

impl Recorder {
    fn hit(&self, op: Op) -> Result<(), StoreError> {
        self.calls.lock().unwrap().push(op);
        if *self.fail.lock().unwrap() == Some(op) {
            return Err(StoreError::QueryError(format!("injected failure at {:?}", op)));
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<AsyncMutex<MemoryState>>,
    recorder: Recorder,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later call of `op` fail
    pub fn fail_on(&self, op: Op) {
        *self.recorder.fail.lock().unwrap() = Some(op);
    }

    pub fn calls(&self) -> Vec<Op> {
        self.recorder.calls.lock().unwrap().clone()
    }

    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }

    pub async fn overwrite_rollup(&self, year: i32, rollup: YearRollup) {
        self.state.lock().await.rollups.insert(year, rollup);
    }

    pub async fn remove_rollup(&self, year: i32) {
        self.state.lock().await.rollups.remove(&year);
    }
}

#[async_trait]
impl QuarterStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn QuarterTx>, StoreError> {
        self.recorder.hit(Op::Begin)?;
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();

        Ok(Box::new(MemoryTx {
            guard,
            staged,
            recorder: self.recorder.clone(),
        }))
    }

    async fn read_year(&self, year: i32) -> Result<YearSnapshot, StoreError> {
        self.recorder.hit(Op::ReadYear)?;
        let state = self.state.lock().await;
        Ok(YearSnapshot {
            quarters: state.quarters_of(year),
            target: state.targets.get(&year).copied(),
            rollup: state.rollups.get(&year).copied(),
        })
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.recorder.hit(Op::HealthCheck)
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
    recorder: Recorder,
}

#[async_trait]
impl QuarterTx for MemoryTx {
    async fn ensure_year_rollup(&mut self, year: i32) -> Result<(), StoreError> {
        self.recorder.hit(Op::EnsureYearRollup)?;
        self.staged.rollups.entry(year).or_default();
        Ok(())
    }

    async fn upsert_year_target(&mut self, year: i32, target: &YearTarget) -> Result<(), StoreError> {
        self.recorder.hit(Op::UpsertYearTarget)?;
        self.staged.targets.insert(year, *target);
        Ok(())
    }

    async fn find_quarter(&mut self, year: i32, quarter: i32) -> Result<Option<QuarterId>, StoreError> {
        self.recorder.hit(Op::FindQuarter)?;
        Ok(self
            .staged
            .quarters
            .iter()
            .find(|(_, r)| r.year == year && r.quarter == quarter)
            .map(|(id, _)| *id))
    }

    async fn insert_quarter(&mut self, record: &QuarterRecord) -> Result<QuarterId, StoreError> {
        self.recorder.hit(Op::InsertQuarter)?;
        let taken = self
            .staged
            .quarters
            .values()
            .any(|r| r.year == record.year && r.quarter == record.quarter);
        if taken {
            return Err(StoreError::Conflict(format!("quarter {}/{} already exists", record.quarter, record.year)));
        }

        self.staged.last_id += 1;
        let id = self.staged.last_id;
        self.staged.quarters.insert(id, record.clone());
        Ok(id)
    }

    async fn update_quarter(&mut self, id: QuarterId, record: &QuarterRecord) -> Result<(), StoreError> {
        self.recorder.hit(Op::UpdateQuarter)?;
        match self.staged.quarters.get_mut(&id) {
            Some(row) => {
                *row = record.clone();
                Ok(())
            }
            None => Err(StoreError::QueryError(format!("quarter row {} disappeared during update", id))),
        }
    }

    async fn upsert_income(&mut self, id: QuarterId, income: &IncomeBreakdown) -> Result<(), StoreError> {
        self.recorder.hit(Op::UpsertIncome)?;
        self.staged.income.insert(id, *income);
        Ok(())
    }

    async fn upsert_expense(&mut self, id: QuarterId, expense: &ExpenseBreakdown) -> Result<(), StoreError> {
        self.recorder.hit(Op::UpsertExpense)?;
        self.staged.expense.insert(id, *expense);
        Ok(())
    }

    async fn upsert_donor_behavior(&mut self, id: QuarterId, donor: &DonorBehavior) -> Result<(), StoreError> {
        self.recorder.hit(Op::UpsertDonorBehavior)?;
        self.staged.donors.insert(id, *donor);
        Ok(())
    }

    async fn aggregate_year(&mut self, year: i32) -> Result<YearRollup, StoreError> {
        self.recorder.hit(Op::AggregateYear)?;
        Ok(YearRollup::from_quarters(&self.staged.quarters_of(year)))
    }

    async fn write_year_rollup(&mut self, year: i32, rollup: &YearRollup) -> Result<(), StoreError> {
        self.recorder.hit(Op::WriteYearRollup)?;
        self.staged.rollups.insert(year, *rollup);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.recorder.hit(Op::Commit)?;
        let MemoryTx { mut guard, staged, .. } = *self;
        *guard = staged;
        Ok(())
    }
}
