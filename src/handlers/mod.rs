// handlers/mod.rs - dashboard endpoints
//
// Public: login, health. Protected (RequireAuth): quarters, save_quarter and
// their legacy counterparts.
// OPTIONS is answered by the CORS layer before routing; any other method a
// route does not serve goes to fallback::method_not_allowed.

pub mod fallback;
pub mod health;
pub mod legacy;
pub mod login;
pub mod quarters;
pub mod save_quarter;

use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// Parse a JSON request body regardless of its content type
pub(crate) fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::invalid_json(format!("Invalid JSON: {}", e)))
}
