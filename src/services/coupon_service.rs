// src/services/coupon_service.rs

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::models::registration::Modality;

/// Cupom de desconto de valor fixo.
#[derive(Debug, Clone, Deserialize)]
pub struct Coupon {
    pub code: String,
    pub discount: Decimal,
    #[serde(default = "enabled")]
    pub active: bool,
    #[serde(default = "enabled")]
    pub adult: bool,
    #[serde(default = "enabled")]
    pub child: bool,
}

fn enabled() -> bool {
    true
}

impl Coupon {
    fn accepts(&self, modality: Modality) -> bool {
        match modality {
            Modality::Adulto => self.adult,
            Modality::Infantil => self.child,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouponValidation {
    pub valid: bool,
    pub message: String,
    pub discount_amount: Decimal,
}

impl CouponValidation {
    fn rejected(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
            discount_amount: Decimal::ZERO,
        }
    }
}

/// Tabela imutável de cupons, montada uma vez na inicialização.
#[derive(Debug, Clone)]
pub struct CouponBook {
    coupons: HashMap<String, Coupon>,
}

impl Default for CouponBook {
    fn default() -> Self {
        Self::new(vec![Coupon {
            code: "AD10".to_string(),
            discount: Decimal::new(500, 2),
            active: true,
            adult: true,
            child: true,
        }])
    }
}

impl CouponBook {
    pub fn new(coupons: Vec<Coupon>) -> Self {
        let coupons = coupons
            .into_iter()
            .map(|c| (normalize_code(&c.code), c))
            .collect();
        Self { coupons }
    }

    /// Lê a tabela a partir de JSON: `[{"code": "AD10", "discount": "5.00", ...}]`.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let coupons: Vec<Coupon> = serde_json::from_str(raw)?;
        Ok(Self::new(coupons))
    }

    pub fn len(&self) -> usize {
        self.coupons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coupons.is_empty()
    }

    /// Sem categoria informada, a elegibilidade por modalidade não é checada.
    pub fn validate(&self, code: &str, modality: Option<Modality>) -> CouponValidation {
        let Some(coupon) = self.coupons.get(&normalize_code(code)) else {
            return CouponValidation::rejected("Cupom inválido");
        };

        if !coupon.active {
            return CouponValidation::rejected("Cupom inativo");
        }

        if let Some(modality) = modality {
            if !coupon.accepts(modality) {
                return CouponValidation::rejected(format!(
                    "Cupom não válido para a modalidade {}",
                    modality.label()
                ));
            }
        }

        CouponValidation {
            valid: true,
            message: format!("Desconto de {}", format_brl(coupon.discount)),
            discount_amount: coupon.discount,
        }
    }
}

pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// `5` -> `R$ 5,00`
pub fn format_brl(amount: Decimal) -> String {
    format!("R$ {:.2}", amount).replace('.', ",")
}
