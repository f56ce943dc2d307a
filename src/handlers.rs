// src/handlers.rs

pub mod admin;
pub mod health;
pub mod payments;
pub mod pix;
pub mod registrations;
pub mod statistics;
pub mod webhooks;

use axum::http::{header, HeaderMap};
use reqwest::Url;

/// Origem de quem chamou: header `Origin`, senão a origem do `Referer`.
pub fn caller_origin(headers: &HeaderMap) -> Option<String> {
    if let Some(origin) = headers
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && *v != "null")
    {
        return Some(origin.trim_end_matches('/').to_string());
    }

    let referer = headers.get(header::REFERER).and_then(|v| v.to_str().ok())?;
    let url = Url::parse(referer).ok()?;
    let origin = url.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn origin_header_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(header::ORIGIN, HeaderValue::from_static("http://localhost:5173"));
        headers.insert(header::REFERER, HeaderValue::from_static("https://other.example/page"));
        assert_eq!(caller_origin(&headers).as_deref(), Some("http://localhost:5173"));
    }

    #[test]
    fn referer_is_reduced_to_its_origin() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::REFERER,
            HeaderValue::from_static("http://localhost:3000/inscricao?step=2"),
        );
        assert_eq!(caller_origin(&headers).as_deref(), Some("http://localhost:3000"));
        assert_eq!(caller_origin(&HeaderMap::new()), None);
    }
}
