use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::errors::AppError;
use crate::state::AppState;

/// Requires `Authorization: Bearer <SERVICE_API_KEY>`.
pub async fn require_bearer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match token {
        Some(token) if token == state.config.service_api_key => Ok(next.run(request).await),
        _ => {
            warn!("Rejected unauthenticated request to {}", request.uri().path());
            Err(AppError::Unauthorized)
        }
    }
}
