// tests/pix_test.rs

mod common;

use axum::http::{Method, StatusCode};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use wiremock::{
    matchers::{body_partial_json, method, path, query_param},
    Mock, ResponseTemplate,
};

use race_registration_backend::{
    config::settings::AppEnvironment,
    db::RegistrationStore,
    mocks::fixtures,
    models::registration::PaymentStatus,
    services::pix_sweeper::SweepReport,
};

use common::{kids_payload, spawn_app, spawn_app_with, TestApp};

fn qr_code(id: &str, cents: i64) -> Value {
    json!({
        "data": {
            "id": id,
            "amount": cents,
            "status": "PENDING",
            "brCode": "00020101021226950014br.gov.bcb.pix",
            "brCodeBase64": "data:image/png;base64,iVBORw0KGgo=",
            "expiresAt": "2026-10-15T13:00:00.000Z"
        },
        "error": null
    })
}

fn status(value: &str) -> Value {
    json!({ "data": { "status": value, "expiresAt": null }, "error": null })
}

async fn mock_check(app: &TestApp, pix_id: &str, value: &str) {
    Mock::given(method("GET"))
        .and(path("/v1/pixQrCode/check"))
        .and(query_param("id", pix_id))
        .respond_with(ResponseTemplate::new(200).set_body_json(status(value)))
        .mount(&app.gateway)
        .await;
}

#[tokio::test]
async fn create_pix_records_the_charge() {
    let app = spawn_app().await;
    let registration = app.store.insert(&fixtures::adult_registration()).await.unwrap();
    Mock::given(method("POST"))
        .and(path("/v1/pixQrCode/create"))
        .and(body_partial_json(json!({
            "amount": 5000,
            "metadata": { "externalId": registration.id.to_string() },
            "customer": { "taxId": "52998224725" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(qr_code("pix_char_1", 5000)))
        .expect(1)
        .mount(&app.gateway)
        .await;

    let response = app
        .call(
            Method::POST,
            "/api/payment/pix/create/",
            Some(json!({"registration_id": registration.id})),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["pix_id"], "pix_char_1");
    assert_eq!(response.body["amount"], "50.00");
    assert_eq!(response.body["status"], "PENDING");
    assert!(response.body["pix_code"].as_str().unwrap().starts_with("000201"));

    let stored = app.store.find_by_id(registration.id).await.unwrap().unwrap();
    assert_eq!(stored.pix_id.as_deref(), Some("pix_char_1"));
    assert_eq!(stored.payment_amount, Some(Decimal::new(5000, 2)));
    assert_eq!(stored.payment_status, PaymentStatus::Pending);
}

#[tokio::test]
async fn kids_registration_can_pay_with_pix() {
    let app = spawn_app().await;
    Mock::given(method("POST"))
        .and(path("/v1/pixQrCode/create"))
        .and(body_partial_json(json!({ "amount": 3500, "customer": { "name": "Maria da Silva" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(qr_code("pix_kids", 3500)))
        .expect(1)
        .mount(&app.gateway)
        .await;

    let mut payload = kids_payload();
    payload["payment_method"] = json!("pix");
    let response = app.create_registration(payload).await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["payment"]["success"], true);
    assert_eq!(response.body["payment"]["method"], "pix");
    assert_eq!(response.body["payment"]["pix_id"], "pix_kids");
}

#[tokio::test]
async fn check_status_settles_paid_pix() {
    let app = spawn_app().await;
    let registration = app.store.insert(&fixtures::adult_registration()).await.unwrap();
    app.store
        .record_pix_charge(registration.id, "pix_char_1", Decimal::new(5000, 2))
        .await
        .unwrap();
    mock_check(&app, "pix_char_1", "PAID").await;

    let response = app
        .call(Method::GET, "/api/payment/pix/check-status/?pix_id=pix_char_1", None)
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "PAID");
    assert_eq!(response.body["registration_id"], registration.id);
    assert_eq!(response.body["settled"], true);

    let stored = app.store.find_by_id(registration.id).await.unwrap().unwrap();
    assert_eq!(stored.payment_status, PaymentStatus::Paid);
    assert_eq!(stored.payment_amount, Some(Decimal::new(5000, 2)));
    assert_eq!(app.mailer.sent_count(), 1);

    let missing = app.call(Method::GET, "/api/payment/pix/check-status/", None).await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn sweep_settles_only_paid_charges() {
    let app = spawn_app().await;
    let paid = app.store.insert(&fixtures::adult_registration()).await.unwrap();
    let waiting = app.store.insert(&fixtures::child_registration()).await.unwrap();
    app.store.record_pix_charge(paid.id, "pix_a", Decimal::new(5000, 2)).await.unwrap();
    app.store.record_pix_charge(waiting.id, "pix_b", Decimal::new(3500, 2)).await.unwrap();
    mock_check(&app, "pix_a", "PAID").await;
    mock_check(&app, "pix_b", "PENDING").await;

    let dry_run = app.state.pix_sweeper.sweep(true).await.unwrap();
    assert_eq!(
        dry_run,
        SweepReport {
            checked: 2,
            would_settle: 1,
            still_pending: 1,
            dry_run: true,
            ..SweepReport::default()
        }
    );
    let untouched = app.store.find_by_id(paid.id).await.unwrap().unwrap();
    assert_eq!(untouched.payment_status, PaymentStatus::Pending);

    let report = app.state.pix_sweeper.sweep(false).await.unwrap();
    assert_eq!(report.checked, 2);
    assert_eq!(report.settled, 1);
    assert_eq!(report.still_pending, 1);
    assert_eq!(report.errors, 0);

    let settled = app.store.find_by_id(paid.id).await.unwrap().unwrap();
    assert_eq!(settled.payment_status, PaymentStatus::Paid);
    assert!(settled.registration_number.is_some());

    // Pagos saem da lista de pendentes.
    let next = app.state.pix_sweeper.sweep(false).await.unwrap();
    assert_eq!(next.checked, 1);
    assert_eq!(next.settled, 0);
    assert_eq!(app.mailer.sent_count(), 1);
}

#[tokio::test]
async fn sweep_counts_gateway_errors() {
    let app = spawn_app().await;
    let registration = app.store.insert(&fixtures::adult_registration()).await.unwrap();
    app.store
        .record_pix_charge(registration.id, "pix_err", Decimal::new(5000, 2))
        .await
        .unwrap();
    Mock::given(method("GET"))
        .and(path("/v1/pixQrCode/check"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"data": null, "error": "indisponível"})))
        .mount(&app.gateway)
        .await;

    let report = app.state.pix_sweeper.sweep(false).await.unwrap();

    assert_eq!(report.checked, 1);
    assert_eq!(report.errors, 1);
    assert_eq!(report.settled, 0);
}

#[tokio::test]
async fn simulate_only_outside_production() {
    let app = spawn_app().await;
    let registration = app.store.insert(&fixtures::adult_registration()).await.unwrap();
    app.store
        .record_pix_charge(registration.id, "pix_sim", Decimal::new(5000, 2))
        .await
        .unwrap();
    Mock::given(method("POST"))
        .and(path("/v1/pixQrCode/simulate-payment"))
        .and(query_param("id", "pix_sim"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status("PAID")))
        .expect(1)
        .mount(&app.gateway)
        .await;

    let response = app
        .call(Method::POST, "/api/payment/pix/simulate/", Some(json!({"pix_id": "pix_sim"})))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "PAID");
    assert_eq!(response.body["registration_id"], registration.id);
    assert_eq!(response.body["settled"], false);

    let production = spawn_app_with(|config| config.environment = AppEnvironment::Production).await;
    let forbidden = production
        .call(Method::POST, "/api/payment/pix/simulate/", Some(json!({"pix_id": "pix_sim"})))
        .await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);
}
