use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use crate::app::AppState;
use crate::auth::{verify_token, Claims};
use crate::error::ApiError;

/// Verified session claims.
///
/// Taking this extractor as a handler argument guards the route: requests
/// without a valid `Authorization: Bearer <token>` header are answered with
/// 401 before the handler runs. Method routing happens first, so wrong
/// methods still get 405 and preflights need no token.
#[derive(Clone, Debug)]
pub struct RequireAuth(pub Claims);

#[axum::async_trait]
impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let secret = state
            .config
            .security
            .jwt_secret
            .as_deref()
            .ok_or(ApiError::ServerMisconfigured("JWT_SECRET"))?;

        // a header that is not valid ASCII is treated like a missing one
        let header = parts.headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok());

        match verify_token(header, secret) {
            Ok(claims) => Ok(RequireAuth(claims)),
            Err(e) => {
                warn!("Rejected {} {}: {}", parts.method, parts.uri.path(), e);
                Err(e.into())
            }
        }
    }
}
