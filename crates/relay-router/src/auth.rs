use std::sync::Arc;

use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use relay_core::AppState;

/// Checks `Authorization: Bearer <token>` against the `api_key` system
/// setting on every request. Simplified from the teacher's per-provider
/// `AuthProvider` trait down to a single system-wide token, matching the
/// gateway's one `api_key` setting.
pub async fn bearer_auth(
    State(state): State<Arc<AppState>>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match relay_core::auth::check_bearer_token(state.storage.as_ref(), header).await {
        Ok(()) => Ok(next.run(req).await),
        Err(_) => Err(StatusCode::UNAUTHORIZED),
    }
}
