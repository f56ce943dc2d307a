// src/common/signature.rs
//! Verificação de assinaturas HMAC-SHA256 dos webhooks de pagamento.
//!
//! Dois formatos são aceitos:
//!
//! * Stripe: header `Stripe-Signature: t=<unix>,v1=<hex>`, assinando `"{t}.{body}"`.
//! * Webhook genérico: header `X-Webhook-Signature: <hex>`, assinando o corpo cru.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Janela padrão aceita entre o timestamp assinado e o relógio local.
pub const STRIPE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("header de assinatura ausente ou malformado")]
    Malformed,
    #[error("timestamp fora da janela de tolerância")]
    Expired,
    #[error("assinatura não confere")]
    Mismatch,
}

fn mac_for(secret: &[u8]) -> HmacSha256 {
    HmacSha256::new_from_slice(secret).expect("HMAC aceita chaves de qualquer tamanho")
}

pub fn sign_hex(secret: &[u8], payload: &[u8]) -> String {
    let mut mac = mac_for(secret);
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

pub fn verify_hex(secret: &[u8], payload: &[u8], signature_hex: &str) -> Result<(), SignatureError> {
    let expected = hex::decode(signature_hex.trim()).map_err(|_| SignatureError::Malformed)?;
    let mut mac = mac_for(secret);
    mac.update(payload);
    mac.verify_slice(&expected).map_err(|_| SignatureError::Mismatch)
}

pub fn verify_stripe_signature(
    header: &str,
    payload: &[u8],
    secret: &str,
    now: i64,
    tolerance_secs: i64,
) -> Result<(), SignatureError> {
    let mut timestamp: Option<i64> = None;
    let mut candidates: Vec<&str> = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::Malformed)?;
    if candidates.is_empty() {
        return Err(SignatureError::Malformed);
    }
    if (now - timestamp).abs() > tolerance_secs {
        return Err(SignatureError::Expired);
    }

    let mut signed = format!("{timestamp}.").into_bytes();
    signed.extend_from_slice(payload);

    if candidates
        .iter()
        .any(|candidate| verify_hex(secret.as_bytes(), &signed, candidate).is_ok())
    {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Monta um header `Stripe-Signature` válido. Usado pelos testes e por ferramentas locais.
pub fn stripe_signature_header(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut signed = format!("{timestamp}.").into_bytes();
    signed.extend_from_slice(payload);
    format!("t={timestamp},v1={}", sign_hex(secret.as_bytes(), &signed))
}
