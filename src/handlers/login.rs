// handlers/login.rs - POST /login

use axum::{body::Bytes, extract::State, response::Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::app::AppState;
use crate::auth::{issue_token, AuthError};
use crate::error::ApiError;
use crate::handlers::parse_json;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub message: String,
}

/// Exchange the dashboard password for a session token.
///
/// 200 `{success, token, message}`, 401 on a wrong password, 500 when the
/// password or signing secret is not configured.
pub async fn login(State(state): State<AppState>, body: Bytes) -> Result<Json<LoginResponse>, ApiError> {
    let request: LoginRequest = parse_json(&body)?;
    let security = &state.config.security;

    let token = issue_token(
        &request.password,
        security.dashboard_password.as_deref(),
        security.jwt_secret.as_deref(),
        security.token_ttl_hours,
    )
    .map_err(|e| {
        if matches!(e, AuthError::InvalidCredentials) {
            warn!("Dashboard login rejected");
        }
        ApiError::from(e)
    })?;

    info!("Dashboard login succeeded");

    Ok(Json(LoginResponse {
        success: true,
        token,
        message: "Login erfolgreich".to_string(),
    }))
}
