// src/services/pricing.rs

use std::sync::Arc;

use rust_decimal::{prelude::ToPrimitive, Decimal};

use crate::{
    common::error::AppError,
    db::RegistrationStore,
    models::registration::{Modality, Registration},
    services::coupon_service::{normalize_code, CouponBook},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceTable {
    pub adult: Decimal,
    pub child: Decimal,
}

impl Default for PriceTable {
    fn default() -> Self {
        Self {
            adult: Decimal::new(5000, 2),
            child: Decimal::new(3500, 2),
        }
    }
}

impl PriceTable {
    pub fn price_for(&self, modality: Modality) -> Decimal {
        match modality {
            Modality::Adulto => self.adult,
            Modality::Infantil => self.child,
        }
    }
}

/// Preço final nunca fica negativo.
pub fn apply_discount(price: Decimal, discount: Decimal) -> Decimal {
    (price - discount).max(Decimal::ZERO)
}

pub fn to_cents(amount: Decimal) -> i64 {
    (amount * Decimal::ONE_HUNDRED).round().to_i64().unwrap_or_default()
}

pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeQuote {
    pub base_price: Decimal,
    pub discount: Decimal,
    pub amount: Decimal,
    pub coupon_code: Option<String>,
}

impl ChargeQuote {
    fn from_trace(base_price: Decimal, code: &str, discount: Decimal) -> Self {
        Self {
            base_price,
            discount,
            amount: apply_discount(base_price, discount),
            coupon_code: Some(code.to_string()),
        }
    }
}

/// Calcula o valor de uma cobrança e grava o rastro do cupom.
///
/// O rastro (código + desconto) é gravado uma única vez por inscrição e antes da
/// chamada ao gateway: se a inscrição já tem um cupom registrado, esse desconto é
/// reaplicado e o código informado agora é ignorado.
#[derive(Clone)]
pub struct ChargeQuoter {
    store: Arc<dyn RegistrationStore>,
    coupons: Arc<CouponBook>,
    prices: PriceTable,
}

impl ChargeQuoter {
    pub fn new(store: Arc<dyn RegistrationStore>, coupons: Arc<CouponBook>, prices: PriceTable) -> Self {
        Self { store, coupons, prices }
    }

    pub async fn quote(&self, registration: &Registration, coupon_code: Option<&str>) -> Result<ChargeQuote, AppError> {
        let base_price = self.prices.price_for(registration.modality);

        if let (Some(code), Some(discount)) = (&registration.coupon_code, registration.coupon_discount) {
            if let Some(requested) = coupon_code {
                if normalize_code(requested) != *code {
                    tracing::warn!(
                        registration_id = registration.id,
                        "Cupom {} ignorado: inscrição já usa o cupom {}",
                        requested,
                        code
                    );
                }
            }
            return Ok(ChargeQuote::from_trace(base_price, code, discount));
        }

        let Some(requested) = coupon_code.map(str::trim).filter(|c| !c.is_empty()) else {
            return Ok(ChargeQuote {
                base_price,
                discount: Decimal::ZERO,
                amount: base_price,
                coupon_code: None,
            });
        };

        let validation = self.coupons.validate(requested, Some(registration.modality));
        if !validation.valid {
            tracing::warn!(
                registration_id = registration.id,
                "Cupom {} recusado ({}); cobrando valor cheio",
                requested,
                validation.message
            );
            return Ok(ChargeQuote {
                base_price,
                discount: Decimal::ZERO,
                amount: base_price,
                coupon_code: None,
            });
        }

        let code = normalize_code(requested);
        let recorded = self
            .store
            .record_coupon(registration.id, &code, validation.discount_amount)
            .await?;
        if !recorded {
            // Outra requisição gravou um cupom entre a leitura e a escrita.
            let current = self
                .store
                .find_by_id(registration.id)
                .await?
                .ok_or(AppError::RegistrationNotFound(registration.id))?;
            if let (Some(code), Some(discount)) = (&current.coupon_code, current.coupon_discount) {
                return Ok(ChargeQuote::from_trace(base_price, code, discount));
            }
        }

        Ok(ChargeQuote {
            base_price,
            discount: validation.discount_amount,
            amount: apply_discount(base_price, validation.discount_amount),
            coupon_code: Some(code),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prices_depend_only_on_category() {
        let prices = PriceTable::default();
        assert_eq!(prices.price_for(Modality::Adulto), Decimal::new(5000, 2));
        assert_eq!(prices.price_for(Modality::Infantil), Decimal::new(3500, 2));
    }

    #[test]
    fn discount_is_clamped_at_zero() {
        assert_eq!(apply_discount(Decimal::new(500, 2), Decimal::new(1000, 2)), Decimal::ZERO);
        assert_eq!(apply_discount(Decimal::new(5000, 2), Decimal::new(500, 2)), Decimal::new(4500, 2));
    }

    #[test]
    fn cents_conversion() {
        assert_eq!(to_cents(Decimal::new(4500, 2)), 4500);
        assert_eq!(from_cents(10000), Decimal::new(10000, 2));
    }
}
