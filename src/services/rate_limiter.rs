// src/services/rate_limiter.rs
//
// Limite por janela fixa, por IP e por classe de endpoint. Contadores ficam no
// Redis quando configurado; caso contrário, em memória no próprio processo.

use std::{collections::HashMap, fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::http::Method;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use tokio::{sync::Mutex, time::Instant};

use crate::common::error::AppError;

/// Valor enviado no `Retry-After` das respostas 429.
pub const RETRY_AFTER_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointClass {
    Registration,
    PaymentCreate,
    PaymentVerify,
    Statistics,
    Webhook,
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatePolicy {
    pub limit: u64,
    pub window: Duration,
}

impl EndpointClass {
    pub fn as_str(self) -> &'static str {
        match self {
            EndpointClass::Registration => "registration",
            EndpointClass::PaymentCreate => "payment_create",
            EndpointClass::PaymentVerify => "payment_verify",
            EndpointClass::Statistics => "statistics",
            EndpointClass::Webhook => "webhook",
            EndpointClass::General => "general",
        }
    }

    pub fn policy(self) -> RatePolicy {
        let (limit, secs) = match self {
            EndpointClass::Registration => (10, 3600),
            EndpointClass::PaymentCreate => (5, 60),
            EndpointClass::PaymentVerify => (30, 60),
            EndpointClass::Statistics => (100, 3600),
            EndpointClass::Webhook => (100, 3600),
            EndpointClass::General => (1000, 3600),
        };
        RatePolicy {
            limit,
            window: Duration::from_secs(secs),
        }
    }
}

impl fmt::Display for EndpointClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classe da requisição, ou `None` para rotas isentas (health e fora de `/api`).
pub fn classify(method: &Method, path: &str) -> Option<EndpointClass> {
    if !path.starts_with("/api") {
        return None;
    }
    let path = path.trim_end_matches('/');

    let class = match path {
        "/api/health" => return None,
        "/api/race-registrations" if method == Method::POST => EndpointClass::Registration,
        "/api/payment/create-session" | "/api/payment/pix/create" | "/api/payment/pix/simulate" => {
            EndpointClass::PaymentCreate
        }
        "/api/payment/verify-status" | "/api/payment/pix/check-status" => EndpointClass::PaymentVerify,
        "/api/race-statistics" => EndpointClass::Statistics,
        "/api/payment-webhook" | "/api/payment/stripe-webhook" => EndpointClass::Webhook,
        _ => EndpointClass::General,
    };
    Some(class)
}

// =============================================================================
//  ARMAZENAMENTO DOS CONTADORES
// =============================================================================

#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Valor atual do contador, `None` se ausente ou expirado.
    async fn get(&self, key: &str) -> Result<Option<u64>, AppError>;

    /// Cria o contador com valor 1 e validade `window`, se ainda não existir.
    /// Retorna `true` se esta chamada criou a chave.
    async fn start_window(&self, key: &str, window: Duration) -> Result<bool, AppError>;

    /// Incrementa sem mexer na validade.
    async fn increment(&self, key: &str) -> Result<u64, AppError>;
}

/// Intervalo mínimo entre duas limpezas de contadores expirados.
const PURGE_EVERY: Duration = Duration::from_secs(60);

struct Counters {
    entries: HashMap<String, (u64, Instant)>,
    next_purge: Instant,
}

pub struct MemoryCounterStore {
    counters: Mutex<Counters>,
}

impl Default for MemoryCounterStore {
    fn default() -> Self {
        Self {
            counters: Mutex::new(Counters {
                entries: HashMap::new(),
                next_purge: Instant::now() + PURGE_EVERY,
            }),
        }
    }
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Counters {
    /// Remove chaves vencidas de outros IPs; sem isso o mapa só cresce.
    fn purge_expired(&mut self, now: Instant) {
        if now < self.next_purge {
            return;
        }
        let before = self.entries.len();
        self.entries.retain(|_, (_, expires_at)| now < *expires_at);
        self.next_purge = now + PURGE_EVERY;
        tracing::debug!("Rate limit: {} contador(es) expirado(s) removido(s)", before - self.entries.len());
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn get(&self, key: &str) -> Result<Option<u64>, AppError> {
        let mut counters = self.counters.lock().await;
        match counters.entries.get(key) {
            Some(&(count, expires_at)) if Instant::now() < expires_at => Ok(Some(count)),
            Some(_) => {
                counters.entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn start_window(&self, key: &str, window: Duration) -> Result<bool, AppError> {
        let mut counters = self.counters.lock().await;
        let now = Instant::now();
        counters.purge_expired(now);
        match counters.entries.get(key) {
            Some(&(_, expires_at)) if now < expires_at => Ok(false),
            _ => {
                counters.entries.insert(key.to_string(), (1, now + window));
                Ok(true)
            }
        }
    }

    async fn increment(&self, key: &str) -> Result<u64, AppError> {
        let mut counters = self.counters.lock().await;
        match counters.entries.get_mut(key) {
            Some((count, _)) => {
                *count += 1;
                Ok(*count)
            }
            // Expirou entre o get e o incremento.
            None => Err(AppError::CounterStoreError(format!("contador {key} inexistente"))),
        }
    }
}

#[derive(Clone)]
pub struct RedisCounterStore {
    conn_manager: ConnectionManager,
}

impl RedisCounterStore {
    pub async fn new(redis_url: &str) -> Result<Self, AppError> {
        let client = Client::open(redis_url)
            .map_err(|e| AppError::CounterStoreError(format!("falha ao criar cliente Redis: {e}")))?;
        let conn_manager = ConnectionManager::new(client)
            .await
            .map_err(|e| AppError::CounterStoreError(format!("falha ao conectar no Redis: {e}")))?;
        Ok(Self { conn_manager })
    }

    fn key(key: &str) -> String {
        format!("rate_limit:{key}")
    }
}

fn redis_error(e: redis::RedisError) -> AppError {
    AppError::CounterStoreError(e.to_string())
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn get(&self, key: &str) -> Result<Option<u64>, AppError> {
        let mut conn = self.conn_manager.clone();
        let count: Option<u64> = conn.get(Self::key(key)).await.map_err(redis_error)?;
        Ok(count)
    }

    async fn start_window(&self, key: &str, window: Duration) -> Result<bool, AppError> {
        let mut conn = self.conn_manager.clone();
        let created: Option<String> = redis::cmd("SET")
            .arg(Self::key(key))
            .arg(1)
            .arg("EX")
            .arg(window.as_secs().max(1))
            .arg("NX")
            .query_async(&mut conn)
            .await
            .map_err(redis_error)?;
        Ok(created.is_some())
    }

    async fn increment(&self, key: &str) -> Result<u64, AppError> {
        let mut conn = self.conn_manager.clone();
        let count: u64 = conn.incr(Self::key(key), 1).await.map_err(redis_error)?;
        Ok(count)
    }
}

// =============================================================================
//  LIMITADOR
// =============================================================================

#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self { store }
    }

    /// Registra a requisição e diz se ela pode seguir. Falhas no armazenamento
    /// liberam a requisição.
    pub async fn allow(&self, ip: &str, class: EndpointClass) -> bool {
        match self.check(ip, class).await {
            Ok(allowed) => allowed,
            Err(e) => {
                tracing::warn!(class = class.as_str(), ip, "⚠️ Rate limit indisponível, liberando: {}", e);
                true
            }
        }
    }

    async fn check(&self, ip: &str, class: EndpointClass) -> Result<bool, AppError> {
        let policy = class.policy();
        let key = format!("{class}:{ip}");

        match self.store.get(&key).await? {
            None => {
                if !self.store.start_window(&key, policy.window).await? {
                    // Outra requisição abriu a janela primeiro.
                    self.store.increment(&key).await?;
                }
                Ok(true)
            }
            Some(count) if count < policy.limit => {
                self.store.increment(&key).await?;
                Ok(true)
            }
            Some(count) => {
                tracing::warn!(class = class.as_str(), ip, count, "🚫 Rate limit excedido");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> RateLimiter {
        RateLimiter::new(Arc::new(MemoryCounterStore::new()))
    }

    struct BrokenStore;

    #[async_trait]
    impl CounterStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<u64>, AppError> {
            Err(AppError::CounterStoreError("offline".to_string()))
        }
        async fn start_window(&self, _key: &str, _window: Duration) -> Result<bool, AppError> {
            Err(AppError::CounterStoreError("offline".to_string()))
        }
        async fn increment(&self, _key: &str) -> Result<u64, AppError> {
            Err(AppError::CounterStoreError("offline".to_string()))
        }
    }

    #[test]
    fn classifies_paths() {
        assert_eq!(
            classify(&Method::POST, "/api/race-registrations/"),
            Some(EndpointClass::Registration)
        );
        assert_eq!(
            classify(&Method::GET, "/api/race-registrations/"),
            Some(EndpointClass::General)
        );
        assert_eq!(
            classify(&Method::POST, "/api/payment/pix/simulate/"),
            Some(EndpointClass::PaymentCreate)
        );
        assert_eq!(
            classify(&Method::GET, "/api/payment/pix/check-status/"),
            Some(EndpointClass::PaymentVerify)
        );
        assert_eq!(
            classify(&Method::POST, "/api/payment/stripe-webhook/"),
            Some(EndpointClass::Webhook)
        );
        assert_eq!(classify(&Method::GET, "/api/health/"), None);
        assert_eq!(classify(&Method::GET, "/other"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn registration_allows_ten_per_hour() {
        let limiter = limiter();
        for _ in 0..10 {
            assert!(limiter.allow("10.0.0.1", EndpointClass::Registration).await);
        }
        assert!(!limiter.allow("10.0.0.1", EndpointClass::Registration).await);

        // Outro IP e outra classe têm contadores próprios.
        assert!(limiter.allow("10.0.0.2", EndpointClass::Registration).await);
        assert!(limiter.allow("10.0.0.1", EndpointClass::General).await);

        tokio::time::advance(Duration::from_secs(3601)).await;
        assert!(limiter.allow("10.0.0.1", EndpointClass::Registration).await);
    }

    #[tokio::test(start_paused = true)]
    async fn window_is_not_extended_by_hits() {
        let limiter = limiter();
        for _ in 0..5 {
            assert!(limiter.allow("ip", EndpointClass::PaymentCreate).await);
            tokio::time::advance(Duration::from_secs(10)).await;
        }
        assert!(!limiter.allow("ip", EndpointClass::PaymentCreate).await);

        // A janela começou no primeiro acesso, há 50s.
        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(limiter.allow("ip", EndpointClass::PaymentCreate).await);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_counters_are_purged() {
        let store = Arc::new(MemoryCounterStore::new());
        let limiter = RateLimiter::new(store.clone());
        for n in 0..500 {
            assert!(limiter.allow(&format!("10.0.{}.{}", n / 256, n % 256), EndpointClass::PaymentCreate).await);
        }
        assert_eq!(store.counters.lock().await.entries.len(), 500);

        tokio::time::advance(Duration::from_secs(7200)).await;
        assert!(limiter.allow("192.0.2.1", EndpointClass::PaymentCreate).await);

        assert_eq!(store.counters.lock().await.entries.len(), 1);
    }

    #[tokio::test]
    async fn storage_failure_fails_open() {
        let limiter = RateLimiter::new(Arc::new(BrokenStore));
        assert!(limiter.allow("ip", EndpointClass::Registration).await);
    }
}
