use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

use crate::database::manager::StoreError;
use crate::database::models::{
    DonorBehavior, ExpenseBreakdown, IncomeBreakdown, QuarterId, QuarterRecord, QuarterReportRow,
    QuarterView, YearRollup, YearTarget,
};
use crate::database::repository::{QuarterStore, QuarterTx, YearSnapshot};

const SELECT_QUARTER_REPORT: &str = r#"
    SELECT
        q.id,
        q.jahr::int4 AS year,
        q.quartal::int4 AS quarter,
        q.period_start,
        q.period_end,
        q.ueberschuss AS surplus,
        q.kontostand_aktuell AS balance_current,
        q.kontostand_vorjahr AS balance_prior_year,
        e.spenden_aktuell AS donations_current,
        e.spenden_vorjahr AS donations_prior_year,
        e.mission_aktuell AS mission_income_current,
        e.mission_vorjahr AS mission_income_prior_year,
        e.sonstige_aktuell AS other_income_current,
        e.sonstige_vorjahr AS other_income_prior_year,
        e.gesamt_aktuell AS income_total_current,
        e.gesamt_vorjahr AS income_total_prior_year,
        a.gebaeude_aktuell AS building_current,
        a.gebaeude_vorjahr AS building_prior_year,
        a.personal_aktuell AS personnel_current,
        a.personal_vorjahr AS personnel_prior_year,
        a.mission_aktuell AS mission_expense_current,
        a.mission_vorjahr AS mission_expense_prior_year,
        a.sonstige_aktuell AS other_expense_current,
        a.sonstige_vorjahr AS other_expense_prior_year,
        a.gesamt_aktuell AS expense_total_current,
        a.gesamt_vorjahr AS expense_total_prior_year,
        s.regelmaessig_prozent AS regular_donors_percent,
        s.unregelmaessig_prozent AS irregular_donors_percent
    FROM quartale q
    LEFT JOIN einnahmen_kategorien e ON q.id = e.quartal_id
    LEFT JOIN ausgaben_kategorien a ON q.id = a.quartal_id
    LEFT JOIN spenderverhalten s ON q.id = s.quartal_id
    WHERE q.jahr = $1
    ORDER BY q.quartal
"#;

pub struct PgQuarterStore {
    pool: PgPool,
}

impl PgQuarterStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuarterStore for PgQuarterStore {
    async fn begin(&self) -> Result<Box<dyn QuarterTx>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgQuarterTx { tx }))
    }

    async fn read_year(&self, year: i32) -> Result<YearSnapshot, StoreError> {
        let mut tx = self.pool.begin().await?;
        // one snapshot for all three reads, so a concurrent save is seen whole or not at all
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let rows = sqlx::query_as::<_, QuarterReportRow>(SELECT_QUARTER_REPORT)
            .bind(year)
            .fetch_all(&mut *tx)
            .await?;

        let target = sqlx::query_as::<_, YearTarget>(
            "SELECT quartalsbedarf AS quarterly_requirement, visionsbetrag AS vision_amount
             FROM quartalsziele
             WHERE jahr = $1
             LIMIT 1",
        )
        .bind(year)
        .fetch_optional(&mut *tx)
        .await?;

        let rollup = sqlx::query_as::<_, YearRollup>(
            "SELECT gesamteinnahmen AS total_income,
                    gesamtausgaben AS total_expense,
                    kumuliertes_ergebnis AS cumulative_surplus
             FROM jahresuebersicht
             WHERE jahr = $1
             LIMIT 1",
        )
        .bind(year)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!("Loaded {} quarters for {}", rows.len(), year);
        Ok(YearSnapshot {
            quarters: rows.into_iter().map(QuarterView::from).collect(),
            target,
            rollup,
        })
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Write transaction; sqlx rolls it back when dropped uncommitted
pub struct PgQuarterTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl QuarterTx for PgQuarterTx {
    async fn ensure_year_rollup(&mut self, year: i32) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO jahresuebersicht (jahr, gesamteinnahmen, gesamtausgaben, kumuliertes_ergebnis)
             VALUES ($1, 0, 0, 0)
             ON CONFLICT (jahr) DO NOTHING",
        )
        .bind(year)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn upsert_year_target(&mut self, year: i32, target: &YearTarget) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO quartalsziele (jahr, quartalsbedarf, visionsbetrag)
             VALUES ($1, $2, $3)
             ON CONFLICT (jahr) DO UPDATE SET
                quartalsbedarf = EXCLUDED.quartalsbedarf,
                visionsbetrag = EXCLUDED.visionsbetrag,
                updated_at = CURRENT_TIMESTAMP",
        )
        .bind(year)
        .bind(target.quarterly_requirement)
        .bind(target.vision_amount)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn find_quarter(&mut self, year: i32, quarter: i32) -> Result<Option<QuarterId>, StoreError> {
        let row: Option<(QuarterId,)> =
            sqlx::query_as("SELECT id FROM quartale WHERE jahr = $1 AND quartal = $2 FOR UPDATE")
                .bind(year)
                .bind(quarter)
                .fetch_optional(&mut *self.tx)
                .await?;

        Ok(row.map(|(id,)| id))
    }

    async fn insert_quarter(&mut self, record: &QuarterRecord) -> Result<QuarterId, StoreError> {
        let (id,): (QuarterId,) = sqlx::query_as(
            "INSERT INTO quartale (
                jahr, quartal, period_start, period_end, ueberschuss,
                kontostand_aktuell, kontostand_vorjahr
             ) VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING id",
        )
        .bind(record.year)
        .bind(record.quarter)
        .bind(record.period_start)
        .bind(record.period_end)
        .bind(record.surplus)
        .bind(record.balance.current)
        .bind(record.balance.prior_year)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| {
            StoreError::from_write(e, || {
                format!("Quartal {}/{} wurde gleichzeitig angelegt", record.quarter, record.year)
            })
        })?;

        Ok(id)
    }

    async fn update_quarter(&mut self, id: QuarterId, record: &QuarterRecord) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE quartale SET
                period_start = $1,
                period_end = $2,
                ueberschuss = $3,
                kontostand_aktuell = $4,
                kontostand_vorjahr = $5,
                updated_at = CURRENT_TIMESTAMP
             WHERE id = $6",
        )
        .bind(record.period_start)
        .bind(record.period_end)
        .bind(record.surplus)
        .bind(record.balance.current)
        .bind(record.balance.prior_year)
        .bind(id)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() != 1 {
            return Err(StoreError::QueryError(format!("quarter row {} disappeared during update", id)));
        }
        Ok(())
    }

    async fn upsert_income(&mut self, id: QuarterId, income: &IncomeBreakdown) -> Result<(), StoreError> {
        let total = income.total();

        sqlx::query(
            "INSERT INTO einnahmen_kategorien (
                quartal_id,
                spenden_aktuell, spenden_vorjahr,
                mission_aktuell, mission_vorjahr,
                sonstige_aktuell, sonstige_vorjahr,
                gesamt_aktuell, gesamt_vorjahr
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (quartal_id) DO UPDATE SET
                spenden_aktuell = EXCLUDED.spenden_aktuell,
                spenden_vorjahr = EXCLUDED.spenden_vorjahr,
                mission_aktuell = EXCLUDED.mission_aktuell,
                mission_vorjahr = EXCLUDED.mission_vorjahr,
                sonstige_aktuell = EXCLUDED.sonstige_aktuell,
                sonstige_vorjahr = EXCLUDED.sonstige_vorjahr,
                gesamt_aktuell = EXCLUDED.gesamt_aktuell,
                gesamt_vorjahr = EXCLUDED.gesamt_vorjahr,
                updated_at = CURRENT_TIMESTAMP",
        )
        .bind(id)
        .bind(income.donations.current)
        .bind(income.donations.prior_year)
        .bind(income.mission.current)
        .bind(income.mission.prior_year)
        .bind(income.other.current)
        .bind(income.other.prior_year)
        .bind(total.current)
        .bind(total.prior_year)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn upsert_expense(&mut self, id: QuarterId, expense: &ExpenseBreakdown) -> Result<(), StoreError> {
        let total = expense.total();

        sqlx::query(
            "INSERT INTO ausgaben_kategorien (
                quartal_id,
                gebaeude_aktuell, gebaeude_vorjahr,
                personal_aktuell, personal_vorjahr,
                mission_aktuell, mission_vorjahr,
                sonstige_aktuell, sonstige_vorjahr,
                gesamt_aktuell, gesamt_vorjahr
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             ON CONFLICT (quartal_id) DO UPDATE SET
                gebaeude_aktuell = EXCLUDED.gebaeude_aktuell,
                gebaeude_vorjahr = EXCLUDED.gebaeude_vorjahr,
                personal_aktuell = EXCLUDED.personal_aktuell,
                personal_vorjahr = EXCLUDED.personal_vorjahr,
                mission_aktuell = EXCLUDED.mission_aktuell,
                mission_vorjahr = EXCLUDED.mission_vorjahr,
                sonstige_aktuell = EXCLUDED.sonstige_aktuell,
                sonstige_vorjahr = EXCLUDED.sonstige_vorjahr,
                gesamt_aktuell = EXCLUDED.gesamt_aktuell,
                gesamt_vorjahr = EXCLUDED.gesamt_vorjahr,
                updated_at = CURRENT_TIMESTAMP",
        )
        .bind(id)
        .bind(expense.building.current)
        .bind(expense.building.prior_year)
        .bind(expense.personnel.current)
        .bind(expense.personnel.prior_year)
        .bind(expense.mission.current)
        .bind(expense.mission.prior_year)
        .bind(expense.other.current)
        .bind(expense.other.prior_year)
        .bind(total.current)
        .bind(total.prior_year)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn upsert_donor_behavior(&mut self, id: QuarterId, donor: &DonorBehavior) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO spenderverhalten (quartal_id, regelmaessig_prozent, unregelmaessig_prozent)
             VALUES ($1, $2, $3)
             ON CONFLICT (quartal_id) DO UPDATE SET
                regelmaessig_prozent = EXCLUDED.regelmaessig_prozent,
                unregelmaessig_prozent = EXCLUDED.unregelmaessig_prozent,
                updated_at = CURRENT_TIMESTAMP",
        )
        .bind(id)
        .bind(donor.regular_percent)
        .bind(donor.irregular_percent)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn aggregate_year(&mut self, year: i32) -> Result<YearRollup, StoreError> {
        let rollup = sqlx::query_as::<_, YearRollup>(
            "SELECT
                COALESCE(SUM(e.gesamt_aktuell), 0) AS total_income,
                COALESCE(SUM(a.gesamt_aktuell), 0) AS total_expense,
                COALESCE(SUM(q.ueberschuss), 0) AS cumulative_surplus
             FROM quartale q
             LEFT JOIN einnahmen_kategorien e ON q.id = e.quartal_id
             LEFT JOIN ausgaben_kategorien a ON q.id = a.quartal_id
             WHERE q.jahr = $1",
        )
        .bind(year)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(rollup)
    }

    async fn write_year_rollup(&mut self, year: i32, rollup: &YearRollup) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO jahresuebersicht (jahr, gesamteinnahmen, gesamtausgaben, kumuliertes_ergebnis)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (jahr) DO UPDATE SET
                gesamteinnahmen = EXCLUDED.gesamteinnahmen,
                gesamtausgaben = EXCLUDED.gesamtausgaben,
                kumuliertes_ergebnis = EXCLUDED.kumuliertes_ergebnis,
                updated_at = CURRENT_TIMESTAMP",
        )
        .bind(year)
        .bind(rollup.total_income)
        .bind(rollup.total_expense)
        .bind(rollup.cumulative_surplus)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}
