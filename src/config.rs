// src/config.rs

pub mod settings;

use std::{sync::Arc, time::Duration};

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    config::settings::AppConfig,
    db::{RegistrationRepository, RegistrationStore},
    services::{
        checkout_gateway::CheckoutGateway,
        coupon_service::CouponBook,
        mailer::{ConsoleMailer, Mailer, SmtpMailer},
        notification_service::NotificationService,
        payment_gateway::PaymentGateway,
        pix_gateway::PixGateway,
        pix_sweeper::PixSweeper,
        pricing::ChargeQuoter,
        rate_limiter::{CounterStore, MemoryCounterStore, RateLimiter, RedisCounterStore},
        registration_number::RegistrationNumberGenerator,
        registration_service::RegistrationService,
        settlement_service::SettlementService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn RegistrationStore>,
    pub coupons: Arc<CouponBook>,
    pub registration_service: RegistrationService,
    pub checkout: PaymentGateway,
    pub pix: PaymentGateway,
    pub checkout_gateway: CheckoutGateway,
    pub pix_gateway: PixGateway,
    pub settlement_service: SettlementService,
    pub notification_service: NotificationService,
    pub rate_limiter: RateLimiter,
    pub pix_sweeper: PixSweeper,
}

impl AppState {
    /// Monta o estado a partir do ambiente: Postgres, Redis (se houver) e SMTP (se houver).
    pub async fn new(config: AppConfig) -> anyhow::Result<(Self, PgPool)> {
        let db_pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(3))
            .connect(config.database_url.reveal())
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        let counters: Arc<dyn CounterStore> = match &config.redis_url {
            Some(url) => {
                let store = RedisCounterStore::new(url).await?;
                tracing::info!("✅ Rate limit usando Redis");
                Arc::new(store)
            }
            None => {
                tracing::warn!("⚠️ REDIS_URL não definida: rate limit em memória (por processo)");
                Arc::new(MemoryCounterStore::new())
            }
        };

        let mailer: Arc<dyn Mailer> = match &config.smtp {
            Some(smtp) => Arc::new(SmtpMailer::new(smtp)?),
            None => Arc::new(ConsoleMailer),
        };

        let store = Arc::new(RegistrationRepository::new(db_pool.clone()));
        let state = Self::from_parts(config, store, mailer, counters)?;
        Ok((state, db_pool))
    }

    /// Monta o gráfico de dependências com as implementações recebidas.
    pub fn from_parts(
        config: AppConfig,
        store: Arc<dyn RegistrationStore>,
        mailer: Arc<dyn Mailer>,
        counters: Arc<dyn CounterStore>,
    ) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        let coupons = Arc::new(config.coupons.clone());
        let race = Arc::new(config.race.clone());

        let quoter = ChargeQuoter::new(store.clone(), coupons.clone(), config.prices);

        let checkout_gateway = CheckoutGateway::new(
            config.stripe.clone(),
            config.return_urls.clone(),
            &config.race.name,
            config.gateway_timeout,
            store.clone(),
            quoter.clone(),
        )?;
        let pix_gateway = PixGateway::new(
            config.abacatepay.clone(),
            config.environment,
            &config.race.name,
            config.gateway_timeout,
            store.clone(),
            quoter,
        )?;

        let notification_service = NotificationService::new(store.clone(), mailer, race);
        let settlement_service = SettlementService::new(
            store.clone(),
            RegistrationNumberGenerator::default(),
            notification_service.clone(),
        );

        let checkout = PaymentGateway::Checkout(checkout_gateway.clone());
        let pix = PaymentGateway::Pix(pix_gateway.clone());

        let registration_service = RegistrationService::new(
            store.clone(),
            checkout.clone(),
            pix.clone(),
            notification_service.clone(),
        );
        let pix_sweeper = PixSweeper::new(store.clone(), pix_gateway.clone(), settlement_service.clone());

        Ok(Self {
            config,
            store,
            coupons,
            registration_service,
            checkout,
            pix,
            checkout_gateway,
            pix_gateway,
            settlement_service,
            notification_service,
            rate_limiter: RateLimiter::new(counters),
            pix_sweeper,
        })
    }
}
