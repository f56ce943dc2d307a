// tests/common/mod.rs
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::MockServer;

use race_registration_backend::{
    config::{settings::AppConfig, AppState},
    create_router,
    db::InMemoryRegistrationStore,
    mocks::RecordingMailer,
    services::rate_limiter::MemoryCounterStore,
};

pub const API_KEY: &str = "test-api-key";
pub const STRIPE_WEBHOOK_SECRET: &str = "whsec_test";
pub const PAYMENT_WEBHOOK_SECRET: &str = "test-webhook-secret";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<InMemoryRegistrationStore>,
    pub mailer: RecordingMailer,
    pub gateway: MockServer,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

pub async fn spawn_app_with(customize: impl FnOnce(&mut AppConfig)) -> TestApp {
    let gateway = MockServer::start().await;
    let mut config = AppConfig::for_tests(&gateway.uri());
    customize(&mut config);

    let store = Arc::new(InMemoryRegistrationStore::new());
    let mailer = RecordingMailer::new();
    let state = AppState::from_parts(
        config,
        store.clone(),
        Arc::new(mailer.clone()),
        Arc::new(MemoryCounterStore::new()),
    )
    .expect("estado de teste");

    TestApp {
        router: create_router(state.clone()),
        state,
        store,
        mailer,
        gateway,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        TestResponse { status, headers, body }
    }

    /// Requisição autenticada com a chave de API de teste.
    pub async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        self.send(api_request(method, uri, body, Some(API_KEY))).await
    }

    pub async fn create_registration(&self, payload: Value) -> TestResponse {
        self.call(Method::POST, "/api/race-registrations/", Some(payload)).await
    }
}

pub fn api_request(method: Method, uri: &str, body: Option<Value>, api_key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("X-Forwarded-For", "198.51.100.10");
    if let Some(key) = api_key {
        builder = builder.header("X-API-KEY", key);
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub fn raw_post(uri: &str, body: &[u8], headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::from(body.to_vec())).unwrap()
}

pub fn adult_payload() -> Value {
    json!({
        "full_name": "Maria da Silva",
        "cpf": "529.982.247-25",
        "email": "maria@example.com",
        "phone": "(11) 99999-8888",
        "birth_date": "1990-05-20",
        "gender": "F",
        "course": "RUN_5K",
        "shirt_size": "M",
        "athlete_declaration": true
    })
}

pub fn kids_payload() -> Value {
    json!({
        "full_name": "Pedro da Silva",
        "email": "maria@example.com",
        "phone": "11999998888",
        "birth_date": "2016-03-10",
        "gender": "M",
        "course": "KIDS",
        "shirt_size": "8",
        "responsible_full_name": "Maria da Silva",
        "responsible_cpf": "52998224725",
        "responsible_email": "maria@example.com",
        "responsible_phone": "11999998888",
        "athlete_declaration": true
    })
}

pub fn checkout_session_json(id: &str, registration_id: i64) -> Value {
    json!({
        "id": id,
        "url": format!("https://checkout.stripe.com/c/pay/{id}"),
        "amount_total": 5000,
        "payment_status": "unpaid",
        "metadata": { "registration_id": registration_id.to_string() }
    })
}
