use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::database::models::{QuarterView, YearRollup, YearTarget};
use crate::database::{QuarterStore, StoreError, YearSnapshot};

/// Body of the quarter report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuarterReport {
    pub quarters: Vec<QuarterView>,
    pub year_target: YearTarget,
    pub year_rollup: YearRollup,
}

/// Read every quarter of `year` with its target and rollup.
///
/// A missing target falls back to the defaults without being stored. A
/// missing rollup is computed from the fetched quarters with the same sums
/// the save path persists. All three come from one consistent read.
pub async fn get_quarters(store: &dyn QuarterStore, year: i32) -> Result<QuarterReport, StoreError> {
    let YearSnapshot { quarters, target, rollup } = store.read_year(year).await?;
    let year_target = target.unwrap_or_default();

    let year_rollup = match rollup {
        Some(rollup) => rollup,
        None => {
            debug!("No stored rollup for {}, aggregating {} quarters", year, quarters.len());
            YearRollup::from_quarters(&quarters)
        }
    };

    debug!("Read {} quarters for {}", quarters.len(), year);

    Ok(QuarterReport {
        quarters,
        year_target,
        year_rollup,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{IncomeBreakdown, QuarterRecord, YearPair};
    use crate::database::QuarterTx;
    use crate::services::quarter_writer::save_quarter;
    use crate::testing::{MemoryStore, Op};
    use rust_decimal::Decimal;
    use serde_json::json;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    async fn save(store: &MemoryStore, body: serde_json::Value) {
        save_quarter(store, serde_json::from_value(body).unwrap()).await.unwrap();
    }

    #[tokio::test]
    async fn empty_year_reports_defaults() {
        let store = MemoryStore::new();

        let report = get_quarters(&store, 2099).await.unwrap();

        assert!(report.quarters.is_empty());
        assert_eq!(report.year_target, YearTarget::default());
        assert_eq!(report.year_rollup, YearRollup::default());
        assert!(store.snapshot().await.targets.is_empty());

        let body = serde_json::to_value(&report).unwrap();
        assert_eq!(
            body,
            json!({
                "quarters": [],
                "yearTarget": {"quarterlyRequirement": 75000.0, "visionAmount": 81000.0},
                "yearRollup": {"totalIncome": 0.0, "totalExpense": 0.0, "cumulativeSurplus": 0.0}
            })
        );
    }

    #[tokio::test]
    async fn quarters_are_ordered_and_rollup_matches_them() {
        let store = MemoryStore::new();
        save(&store, json!({"year": 2025, "quarter": 3, "donationsCurrent": "300", "buildingCurrent": "50"})).await;
        save(&store, json!({"year": 2025, "quarter": 1, "donationsCurrent": "100.25"})).await;
        save(&store, json!({"year": 2024, "quarter": 2, "donationsCurrent": "7"})).await;

        let report = get_quarters(&store, 2025).await.unwrap();

        let order: Vec<i32> = report.quarters.iter().map(|q| q.quarter).collect();
        assert_eq!(order, vec![1, 3]);
        assert_eq!(report.year_rollup, YearRollup::from_quarters(&report.quarters));
        assert_eq!(report.year_rollup.total_income, d("400.25"));
        assert_eq!(report.year_rollup.cumulative_surplus, d("350.25"));
    }

    #[tokio::test]
    async fn missing_rollup_is_aggregated_from_quarters() {
        let store = MemoryStore::new();
        save(&store, json!({"year": 2025, "quarter": 2, "donationsCurrent": "80", "personnelCurrent": "30"})).await;
        store.remove_rollup(2025).await;

        let report = get_quarters(&store, 2025).await.unwrap();

        assert_eq!(
            report.year_rollup,
            YearRollup {
                total_income: d("80"),
                total_expense: d("30"),
                cumulative_surplus: d("50"),
            }
        );
    }

    #[tokio::test]
    async fn stored_target_is_returned() {
        let store = MemoryStore::new();
        save(
            &store,
            json!({"year": 2025, "quarter": 1, "quarterlyRequirement": 60000, "visionAmount": 90000}),
        )
        .await;

        let report = get_quarters(&store, 2025).await.unwrap();

        assert_eq!(report.year_target.quarterly_requirement, d("60000"));
        assert_eq!(report.year_target.vision_amount, d("90000"));
    }

    #[tokio::test]
    async fn missing_breakdowns_read_as_zero() {
        let store = MemoryStore::new();
        save(&store, json!({"year": 2025, "quarter": 4})).await;

        let report = get_quarters(&store, 2025).await.unwrap();
        let body = serde_json::to_value(&report.quarters[0]).unwrap();

        assert_eq!(body["donationsCurrent"], json!(0.0));
        assert_eq!(body["expenseTotalPriorYear"], json!(0.0));
        assert_eq!(body["donorBehavior"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn storage_failure_is_not_an_empty_year() {
        let store = MemoryStore::new();
        store.fail_on(Op::ReadYear);

        let err = get_quarters(&store, 2025).await.unwrap_err();
        assert!(matches!(err, StoreError::QueryError(_)));
    }

    #[tokio::test]
    async fn report_is_one_read_that_waits_for_an_open_save() {
        let store = MemoryStore::new();
        save(&store, json!({"year": 2025, "quarter": 1, "donationsCurrent": "100"})).await;

        // a save in flight holds the year until it commits
        let mut tx: Box<dyn QuarterTx> = store.begin().await.unwrap();
        let reader = {
            let store = store.clone();
            tokio::spawn(async move { get_quarters(&store, 2025).await })
        };
        tokio::task::yield_now().await;

        let id = tx.find_quarter(2025, 1).await.unwrap().unwrap();
        let mut income = IncomeBreakdown::default();
        income.donations.current = d("250");
        let record = QuarterRecord {
            year: 2025,
            quarter: 1,
            period_start: None,
            period_end: None,
            surplus: d("250"),
            balance: YearPair::default(),
        };
        tx.update_quarter(id, &record).await.unwrap();
        tx.upsert_income(id, &income).await.unwrap();
        let rollup = tx.aggregate_year(2025).await.unwrap();
        tx.write_year_rollup(2025, &rollup).await.unwrap();
        tx.commit().await.unwrap();

        let report = reader.await.unwrap().unwrap();
        assert_eq!(report.year_rollup.total_income, d("250"));
        assert_eq!(report.year_rollup, YearRollup::from_quarters(&report.quarters));

        let reads: Vec<Op> = store.calls().into_iter().filter(|op| *op == Op::ReadYear).collect();
        assert_eq!(reads, vec![Op::ReadYear]);
    }
}
