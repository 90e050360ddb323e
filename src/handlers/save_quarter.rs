// handlers/save_quarter.rs - POST /save-quarter

use axum::{body::Bytes, extract::State, response::Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::database::models::QuarterId;
use crate::error::ApiError;
use crate::handlers::parse_json;
use crate::middleware::RequireAuth;
use crate::services::{save_draft, QuarterSubmission, SaveOutcome};

#[derive(Debug, Serialize, Deserialize)]
pub struct SaveResponse {
    pub success: bool,
    pub message: String,
    pub data: SavedQuarter,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedQuarter {
    pub year: i32,
    pub quarter: i32,
    pub quarter_id: QuarterId,
    #[serde(with = "rust_decimal::serde::float")]
    pub surplus: Decimal,
}

impl From<SaveOutcome> for SaveResponse {
    fn from(outcome: SaveOutcome) -> Self {
        Self {
            success: true,
            message: outcome.message(),
            data: SavedQuarter {
                year: outcome.year,
                quarter: outcome.quarter,
                quarter_id: outcome.quarter_id,
                surplus: outcome.surplus(),
            },
        }
    }
}

/// Parse, validate and store a submission body
pub(crate) async fn store_submission(state: &AppState, body: &[u8]) -> Result<SaveOutcome, ApiError> {
    let submission: QuarterSubmission = parse_json(body)?;

    // validation runs before the store is touched, even when none is configured
    let draft = submission.validate()?;
    let store = state.store()?;

    Ok(save_draft(store, draft).await?)
}

pub async fn save_quarter(
    State(state): State<AppState>,
    RequireAuth(_claims): RequireAuth,
    body: Bytes,
) -> Result<Json<SaveResponse>, ApiError> {
    let outcome = store_submission(&state, &body).await?;
    Ok(Json(outcome.into()))
}
