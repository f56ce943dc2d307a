// src/common/error.rs

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Falhas ao conversar com um gateway de pagamento (Stripe ou AbacatePay).
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Tempo esgotado ao contatar o gateway de pagamento")]
    Timeout,

    #[error("Falha de comunicação com o gateway: {0}")]
    Transport(String),

    #[error("Gateway recusou a operação ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Resposta inválida do gateway: {0}")]
    InvalidResponse(String),

    #[error("Gateway de pagamento não configurado")]
    NotConfigured,
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else if err.is_decode() {
            GatewayError::InvalidResponse(err.to_string())
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Requisição inválida: {0}")]
    BadRequest(String),

    #[error("Chave de API inválida")]
    InvalidApiKey,

    #[error("Assinatura do webhook inválida")]
    InvalidSignature,

    #[error("Operação não permitida: {0}")]
    Forbidden(String),

    #[error("Inscrição {0} não encontrada")]
    RegistrationNotFound(i64),

    #[error("Inscrição {0} já está paga")]
    AlreadyPaid(i64),

    #[error("Limite de requisições excedido")]
    RateLimited { retry_after: u64 },

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Falha no envio de e-mail: {0}")]
    EmailError(String),

    #[error("Erro no armazenamento de contadores: {0}")]
    CounterStoreError(String),

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| match &e.message {
                            Some(m) => m.to_string(),
                            None => e.code.to_string(),
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::RateLimited { retry_after } => {
                let body = Json(json!({
                    "error": "Rate limit exceeded",
                    "message": "Muitas requisições. Tente novamente em alguns minutos.",
                    "retry_after": retry_after,
                    "status_code": 429,
                }));
                return (
                    StatusCode::TOO_MANY_REQUESTS,
                    [(header::RETRY_AFTER, retry_after.to_string())],
                    body,
                )
                    .into_response();
            }
            AppError::Gateway(err) => {
                tracing::warn!("Falha no gateway de pagamento: {}", err);
                let body = Json(json!({ "success": false, "error": err.to_string() }));
                return (StatusCode::BAD_GATEWAY, body).into_response();
            }
            AppError::BadRequest(message) => {
                return (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response();
            }
            AppError::Forbidden(message) => {
                return (StatusCode::FORBIDDEN, Json(json!({ "error": message }))).into_response();
            }
            AppError::InvalidApiKey => (StatusCode::UNAUTHORIZED, "Chave de API inválida ou ausente."),
            AppError::InvalidSignature => (StatusCode::BAD_REQUEST, "Assinatura do webhook inválida."),
            AppError::RegistrationNotFound(_) => (StatusCode::NOT_FOUND, "Inscrição não encontrada."),
            AppError::AlreadyPaid(_) => (StatusCode::BAD_REQUEST, "Esta inscrição já está paga."),

            // Todos os outros erros viram 500 sem expor detalhes internos.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Ocorreu um erro inesperado.")
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
