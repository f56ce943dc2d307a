// src/middleware/api_key.rs

use axum::{extract::State, http::Request, middleware::Next, response::Response};

use crate::{common::error::AppError, config::AppState};

pub const API_KEY_HEADER: &str = "X-API-KEY";

/// Exige `X-API-KEY` igual à chave configurada. Webhooks e health ficam fora deste guard.
pub async fn api_key_guard(
    State(app_state): State<AppState>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let expected = app_state.config.api_secret_key.reveal();
    let authorized = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|key| key == expected.as_str());

    if !authorized {
        tracing::warn!(path = %request.uri().path(), "🔒 Requisição sem chave de API válida");
        return Err(AppError::InvalidApiKey);
    }

    Ok(next.run(request).await)
}
