// handlers/fallback.rs - any method a route does not serve

use crate::error::ApiError;

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
