// src/middleware/rate_limit.rs

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};

use crate::{
    common::error::AppError,
    config::AppState,
    services::rate_limiter::{classify, RETRY_AFTER_SECS},
};

/// Primeiro IP do `X-Forwarded-For`; senão, o endereço da conexão.
pub fn client_ip(headers: &HeaderMap, connect_info: Option<&ConnectInfo<SocketAddr>>) -> String {
    headers
        .get("X-Forwarded-For")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .or_else(|| connect_info.map(|ConnectInfo(addr)| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn rate_limit(
    State(app_state): State<AppState>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let Some(class) = classify(request.method(), request.uri().path()) else {
        return Ok(next.run(request).await);
    };

    let ip = client_ip(request.headers(), request.extensions().get::<ConnectInfo<SocketAddr>>());

    if !app_state.rate_limiter.allow(&ip, class).await {
        return Err(AppError::RateLimited {
            retry_after: RETRY_AFTER_SECS,
        });
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn forwarded_for_wins_over_socket() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Forwarded-For", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        let socket = ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 5000)));

        assert_eq!(client_ip(&headers, Some(&socket)), "203.0.113.7");
        assert_eq!(client_ip(&HeaderMap::new(), Some(&socket)), "127.0.0.1");
        assert_eq!(client_ip(&HeaderMap::new(), None), "unknown");
    }
}
