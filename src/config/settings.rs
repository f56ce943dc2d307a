// src/config/settings.rs
//
// Configuração lida do ambiente (.env via dotenvy) uma única vez na inicialização.
// Valores inválidos geram um aviso e caem no padrão.

use std::{env, str::FromStr, time::Duration};

use anyhow::Context;
use rust_decimal::Decimal;

use crate::{
    common::secret::Secret,
    services::{coupon_service::CouponBook, pricing::PriceTable},
};

pub const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";
pub const DEFAULT_ABACATEPAY_BASE_URL: &str = "https://api.abacatepay.com";
pub const DEFAULT_FRONTEND_URL: &str = "https://www.admoving.com.br";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Production,
}

impl AppEnvironment {
    pub fn is_production(self) -> bool {
        self == AppEnvironment::Production
    }
}

impl FromStr for AppEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "production" | "prod" => Ok(AppEnvironment::Production),
            "development" | "dev" | "local" | "test" => Ok(AppEnvironment::Development),
            other => Err(format!("ambiente desconhecido: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: Secret<String>,
    pub webhook_secret: Secret<String>,
    pub api_base: String,
    /// Habilita PIX como forma de pagamento dentro do checkout.
    pub enable_pix: bool,
}

#[derive(Debug, Clone)]
pub struct AbacatePayConfig {
    pub api_key: Secret<String>,
    pub base_url: String,
    pub expires_in_secs: u64,
}

#[derive(Debug, Clone)]
pub struct ReturnUrlConfig {
    /// Quando definido, sempre vence.
    pub override_base: Option<String>,
    pub production_base: String,
}

#[derive(Debug, Clone)]
pub struct KitPickup {
    pub date: String,
    pub time: String,
    pub location: String,
    pub required_documents: String,
}

#[derive(Debug, Clone)]
pub struct RaceInfo {
    pub name: String,
    pub date: String,
    pub location: String,
    pub start_time: String,
    pub kit_pickup: KitPickup,
    pub contact_email: String,
    pub contact_whatsapp: String,
}

impl Default for RaceInfo {
    fn default() -> Self {
        Self {
            name: "Corrida ADMoving".to_string(),
            date: "A definir".to_string(),
            location: "A definir".to_string(),
            start_time: "07:00".to_string(),
            kit_pickup: KitPickup {
                date: "A definir".to_string(),
                time: "A definir".to_string(),
                location: "A definir".to_string(),
                required_documents: "Documento com foto e comprovante de inscrição".to_string(),
            },
            contact_email: "contato@admoving.com.br".to_string(),
            contact_whatsapp: String::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Secret<String>,
    pub from_email: String,
    pub from_name: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: AppEnvironment,
    pub database_url: Secret<String>,
    pub redis_url: Option<String>,
    pub api_secret_key: Secret<String>,
    pub payment_webhook_secret: Option<Secret<String>>,
    pub stripe: StripeConfig,
    pub abacatepay: AbacatePayConfig,
    pub return_urls: ReturnUrlConfig,
    pub gateway_timeout: Duration,
    pub prices: PriceTable,
    pub coupons: CouponBook,
    pub race: RaceInfo,
    pub smtp: Option<SmtpConfig>,
    /// `None` desativa a varredura de PIX dentro do processo.
    pub pix_sweep_interval: Option<Duration>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let api_secret_key = env::var("API_SECRET_KEY")
            .ok()
            .filter(|v| !v.is_empty())
            .context("API_SECRET_KEY deve ser definida")?;

        let race_defaults = RaceInfo::default();
        let race = RaceInfo {
            name: env_or("RACE_NAME", &race_defaults.name),
            date: env_or("RACE_DATE", &race_defaults.date),
            location: env_or("RACE_LOCATION", &race_defaults.location),
            start_time: env_or("RACE_START_TIME", &race_defaults.start_time),
            kit_pickup: KitPickup {
                date: env_or("KIT_PICKUP_DATE", &race_defaults.kit_pickup.date),
                time: env_or("KIT_PICKUP_TIME", &race_defaults.kit_pickup.time),
                location: env_or("KIT_PICKUP_LOCATION", &race_defaults.kit_pickup.location),
                required_documents: env_or("KIT_PICKUP_DOCS", &race_defaults.kit_pickup.required_documents),
            },
            contact_email: env_or("CONTACT_EMAIL", &race_defaults.contact_email),
            contact_whatsapp: env_or("CONTACT_WHATSAPP", &race_defaults.contact_whatsapp),
        };

        let smtp = env_opt("SMTP_HOST").map(|host| SmtpConfig {
            host,
            port: env_parse("SMTP_PORT", 587),
            username: env_or("SMTP_USERNAME", ""),
            password: Secret::new(env_or("SMTP_PASSWORD", "")),
            from_email: env_or("EMAIL_FROM", "noreply@admoving.com.br"),
            from_name: env_or("EMAIL_FROM_NAME", &race.name),
        });
        if smtp.is_none() {
            tracing::warn!("⚠️ SMTP_HOST não definido: e-mails de confirmação serão apenas registrados no log");
        }

        let defaults = PriceTable::default();
        let prices = PriceTable {
            adult: env_parse("RACE_PRICE_ADULT", defaults.adult),
            child: env_parse("RACE_PRICE_CHILD", defaults.child),
        };

        let coupons = match env_opt("RACE_COUPONS") {
            Some(raw) => CouponBook::from_json(&raw).unwrap_or_else(|e| {
                tracing::warn!("⚠️ RACE_COUPONS inválido ({}); usando a tabela padrão", e);
                CouponBook::default()
            }),
            None => CouponBook::default(),
        };

        let sweep_secs: u64 = env_parse("PIX_SWEEP_INTERVAL_SECS", 0);

        Ok(Self {
            host: env_or("HOST", "0.0.0.0"),
            port: env_parse("PORT", 8000),
            environment: env_parse("APP_ENV", AppEnvironment::Development),
            database_url: Secret::new(database_url),
            redis_url: env_opt("REDIS_URL"),
            api_secret_key: Secret::new(api_secret_key),
            payment_webhook_secret: env_opt("PAYMENT_WEBHOOK_SECRET").map(Secret::new),
            stripe: StripeConfig {
                secret_key: Secret::new(env_or("STRIPE_SECRET_KEY", "")),
                webhook_secret: Secret::new(env_or("STRIPE_WEBHOOK_SECRET", "")),
                api_base: env_or("STRIPE_API_BASE", DEFAULT_STRIPE_API_BASE),
                enable_pix: env_parse("STRIPE_ENABLE_PIX", false),
            },
            abacatepay: AbacatePayConfig {
                api_key: Secret::new(env_or("ABACATEPAY_API_KEY", "")),
                base_url: env_or("ABACATEPAY_BASE_URL", DEFAULT_ABACATEPAY_BASE_URL),
                expires_in_secs: env_parse("ABACATEPAY_PIX_EXPIRES_IN", 3600),
            },
            return_urls: ReturnUrlConfig {
                override_base: env_opt("PAYMENT_RETURN_BASE_URL"),
                production_base: env_or("FRONTEND_URL", DEFAULT_FRONTEND_URL),
            },
            gateway_timeout: Duration::from_secs(env_parse("GATEWAY_TIMEOUT_SECS", 10)),
            prices,
            coupons,
            race,
            smtp,
            pix_sweep_interval: (sweep_secs > 0).then(|| Duration::from_secs(sweep_secs)),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Configuração mínima para testes: gateways apontando para `gateway_base`.
    pub fn for_tests(gateway_base: &str) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            environment: AppEnvironment::Development,
            database_url: Secret::default(),
            redis_url: None,
            api_secret_key: Secret::new("test-api-key".to_string()),
            payment_webhook_secret: Some(Secret::new("test-webhook-secret".to_string())),
            stripe: StripeConfig {
                secret_key: Secret::new("sk_test_123".to_string()),
                webhook_secret: Secret::new("whsec_test".to_string()),
                api_base: gateway_base.to_string(),
                enable_pix: false,
            },
            abacatepay: AbacatePayConfig {
                api_key: Secret::new("abc_dev_123".to_string()),
                base_url: gateway_base.to_string(),
                expires_in_secs: 3600,
            },
            return_urls: ReturnUrlConfig {
                override_base: None,
                production_base: DEFAULT_FRONTEND_URL.to_string(),
            },
            gateway_timeout: Duration::from_secs(2),
            prices: PriceTable::default(),
            coupons: CouponBook::default(),
            race: RaceInfo::default(),
            smtp: None,
            pix_sweep_interval: None,
        }
    }
}

fn env_opt(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn env_or(name: &str, default: &str) -> String {
    env_opt(name).unwrap_or_else(|| default.to_string())
}

fn env_parse<T>(name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_or(name, env_opt(name).as_deref(), default)
}

/// Interpreta o valor bruto; ausente ou inválido vira `default`.
fn parse_or<T>(name: &str, raw: Option<&str>, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|e| {
            tracing::warn!("⚠️ Valor inválido para {} ({}): {}. Usando o padrão.", name, raw, e);
            default
        }),
    }
}
