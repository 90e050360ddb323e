// handlers/quarters.rs - GET /quarters?jahr=<year>

use axum::{
    extract::{Query, State},
    response::Json,
};
use chrono::Datelike;
use serde::Deserialize;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::RequireAuth;
use crate::services::{self, QuarterReport};

#[derive(Debug, Default, Deserialize)]
pub struct QuartersQuery {
    #[serde(default, alias = "year")]
    pub jahr: Option<String>,
}

impl QuartersQuery {
    /// Requested year, or the current UTC year when the parameter is absent or empty
    pub fn year(&self) -> Result<i32, ApiError> {
        match self.jahr.as_deref().map(str::trim) {
            None | Some("") => Ok(chrono::Utc::now().year()),
            Some(raw) => raw
                .parse()
                .map_err(|_| ApiError::bad_request(format!("Ungültiges Jahr: {}", raw))),
        }
    }
}

pub(crate) async fn load_report(state: &AppState, query: &QuartersQuery) -> Result<QuarterReport, ApiError> {
    let year = query.year()?;
    let store = state.store()?;

    Ok(services::get_quarters(store, year).await?)
}

pub async fn get_quarters(
    State(state): State<AppState>,
    RequireAuth(_claims): RequireAuth,
    Query(query): Query<QuartersQuery>,
) -> Result<Json<QuarterReport>, ApiError> {
    let report = load_report(&state, &query).await?;
    Ok(Json(report))
}
