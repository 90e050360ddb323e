// handlers/legacy.rs - /.netlify/functions/{get-quarters,save-quarter}
//
// Same services as the dashboard routes, serialized with the German
// snake_case keys the existing front end reads.

use axum::{
    body::Bytes,
    extract::{Query, State},
    response::Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::database::models::{QuarterId, QuarterView, YearRollup, YearTarget};
use crate::error::ApiError;
use crate::handlers::quarters::{load_report, QuartersQuery};
use crate::handlers::save_quarter::store_submission;
use crate::middleware::RequireAuth;
use crate::services::{QuarterReport, SaveOutcome};

#[derive(Debug, Serialize, Deserialize)]
pub struct LegacyReport {
    pub quartale: Vec<LegacyQuarter>,
    pub quartalsziele: LegacyTarget,
    pub jahresuebersicht: LegacyRollup,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LegacyQuarter {
    pub quartal: i32,
    pub jahr: i32,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    #[serde(with = "rust_decimal::serde::float")]
    pub ueberschuss: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub kontostand_aktuell: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub kontostand_vorjahr: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub spenden_aktuell: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub spenden_vorjahr: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub mission_einnahmen_aktuell: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub mission_einnahmen_vorjahr: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub sonstige_einnahmen_aktuell: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub sonstige_einnahmen_vorjahr: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub gesamt_einnahmen_aktuell: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub gesamt_einnahmen_vorjahr: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub gebaeude_aktuell: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub gebaeude_vorjahr: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub personal_aktuell: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub personal_vorjahr: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub mission_ausgaben_aktuell: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub mission_ausgaben_vorjahr: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub sonstige_ausgaben_aktuell: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub sonstige_ausgaben_vorjahr: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub gesamt_ausgaben_aktuell: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub gesamt_ausgaben_vorjahr: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LegacyTarget {
    #[serde(with = "rust_decimal::serde::float")]
    pub quartalsbedarf: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub visionsbetrag: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LegacyRollup {
    #[serde(with = "rust_decimal::serde::float")]
    pub gesamteinnahmen: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub gesamtausgaben: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub kumuliertes_ergebnis: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LegacySaveResponse {
    pub success: bool,
    pub message: String,
    pub data: LegacySavedQuarter,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LegacySavedQuarter {
    pub jahr: i32,
    pub quartal: i32,
    #[serde(rename = "quartalId")]
    pub quartal_id: QuarterId,
    #[serde(with = "rust_decimal::serde::float")]
    pub ueberschuss: Decimal,
}

impl From<QuarterView> for LegacyQuarter {
    fn from(q: QuarterView) -> Self {
        Self {
            quartal: q.quarter,
            jahr: q.year,
            period_start: q.period_start,
            period_end: q.period_end,
            ueberschuss: q.surplus,
            kontostand_aktuell: q.balance_current,
            kontostand_vorjahr: q.balance_prior_year,
            spenden_aktuell: q.donations_current,
            spenden_vorjahr: q.donations_prior_year,
            mission_einnahmen_aktuell: q.mission_income_current,
            mission_einnahmen_vorjahr: q.mission_income_prior_year,
            sonstige_einnahmen_aktuell: q.other_income_current,
            sonstige_einnahmen_vorjahr: q.other_income_prior_year,
            gesamt_einnahmen_aktuell: q.income_total_current,
            gesamt_einnahmen_vorjahr: q.income_total_prior_year,
            gebaeude_aktuell: q.building_current,
            gebaeude_vorjahr: q.building_prior_year,
            personal_aktuell: q.personnel_current,
            personal_vorjahr: q.personnel_prior_year,
            mission_ausgaben_aktuell: q.mission_expense_current,
            mission_ausgaben_vorjahr: q.mission_expense_prior_year,
            sonstige_ausgaben_aktuell: q.other_expense_current,
            sonstige_ausgaben_vorjahr: q.other_expense_prior_year,
            gesamt_ausgaben_aktuell: q.expense_total_current,
            gesamt_ausgaben_vorjahr: q.expense_total_prior_year,
        }
    }
}

impl From<YearTarget> for LegacyTarget {
    fn from(target: YearTarget) -> Self {
        Self {
            quartalsbedarf: target.quarterly_requirement,
            visionsbetrag: target.vision_amount,
        }
    }
}

impl From<YearRollup> for LegacyRollup {
    fn from(rollup: YearRollup) -> Self {
        Self {
            gesamteinnahmen: rollup.total_income,
            gesamtausgaben: rollup.total_expense,
            kumuliertes_ergebnis: rollup.cumulative_surplus,
        }
    }
}

impl From<QuarterReport> for LegacyReport {
    fn from(report: QuarterReport) -> Self {
        Self {
            quartale: report.quarters.into_iter().map(LegacyQuarter::from).collect(),
            quartalsziele: report.year_target.into(),
            jahresuebersicht: report.year_rollup.into(),
        }
    }
}

impl From<SaveOutcome> for LegacySaveResponse {
    fn from(outcome: SaveOutcome) -> Self {
        Self {
            success: true,
            message: outcome.message(),
            data: LegacySavedQuarter {
                jahr: outcome.year,
                quartal: outcome.quarter,
                quartal_id: outcome.quarter_id,
                ueberschuss: outcome.surplus(),
            },
        }
    }
}

pub async fn get_quarters(
    State(state): State<AppState>,
    RequireAuth(_claims): RequireAuth,
    Query(query): Query<QuartersQuery>,
) -> Result<Json<LegacyReport>, ApiError> {
    let report = load_report(&state, &query).await?;
    Ok(Json(report.into()))
}

pub async fn save_quarter(
    State(state): State<AppState>,
    RequireAuth(_claims): RequireAuth,
    body: Bytes,
) -> Result<Json<LegacySaveResponse>, ApiError> {
    let outcome = store_submission(&state, &body).await?;
    Ok(Json(outcome.into()))
}
