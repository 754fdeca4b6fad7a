// HTTP surface tests for the payment gateway service

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use gateway_core::providers::SimulatedProvider;
use gateway_core::{
    CircuitBreakerConfig, CircuitBreakerManager, DataFormat, GatewayPriority, GatewaySelector,
    LogNotifier, MemoryStore, ProviderId, RetryPolicy, TransactionOrchestrator, TransactionStatus,
    TransactionStore, User,
};
use payment_gateway::error::ErrorEnvelope;
use payment_gateway::handlers::CallbackAck;
use payment_gateway::server::{router, AppState};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

/// Sample data plus gateways that always accept and respond immediately
async fn test_app() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::with_sample_data());
    let selector = Arc::new(GatewaySelector::new(store.clone()));
    for (id, name, format) in [
        ("1", "PayPal", DataFormat::Json),
        ("2", "Stripe", DataFormat::Json),
        ("3", "Adyen", DataFormat::Xml),
    ] {
        selector
            .register(Arc::new(SimulatedProvider::new(
                id,
                name,
                format,
                1.0,
                Duration::ZERO,
            )))
            .await;
    }

    let orchestrator = TransactionOrchestrator::new(
        store.clone(),
        selector,
        Arc::new(CircuitBreakerManager::new(CircuitBreakerConfig::default())),
        Arc::new(LogNotifier),
        RetryPolicy::default(),
    );

    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        request_timeout: Duration::from_secs(5),
    };
    (router(state), store)
}

fn post(uri: &str, content_type: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn json_body(response: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

#[tokio::test]
async fn test_deposit_returns_processing_with_redirect() {
    let (app, store) = test_app().await;

    let response = app
        .oneshot(post(
            "/deposit",
            "application/json",
            r#"{"user_id": 1, "amount": "100.00", "currency": "USD"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    let body = json_body(response).await;
    assert_eq!(body["status"], "processing");
    assert_eq!(body["transaction_id"], 1);
    assert!(body["redirect_url"]
        .as_str()
        .unwrap()
        .starts_with("https://PayPal.example.com/payment/"));

    let stored = store.get_transaction(1).await.unwrap().unwrap();
    assert_eq!(stored.status, TransactionStatus::Processing);
    assert_eq!(stored.gateway_id, ProviderId::from("1"));
    assert_eq!(stored.reference_id.as_deref(), body["redirect_url"].as_str());
}

#[tokio::test]
async fn test_region_priority_routes_to_first_gateway() {
    let (app, store) = test_app().await;

    let response = app
        .oneshot(post(
            "/withdrawal",
            "application/json",
            r#"{"user_id": 3, "amount": "25", "currency": "EUR"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let stored = store.get_transaction(1).await.unwrap().unwrap();
    assert_eq!(stored.gateway_id, ProviderId::from("3"));
    assert!(stored.reference_id.is_some());
}

#[tokio::test]
async fn test_xml_request_gets_xml_response() {
    let (app, _store) = test_app().await;

    let response = app
        .oneshot(post(
            "/withdrawal",
            "application/xml",
            "<TransactionRequest><user_id>2</user_id><amount>50.00</amount><currency>GBP</currency></TransactionRequest>",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/xml");
    let body = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(body.contains("<transaction_id>1</transaction_id>"));
    assert!(body.contains("processing"));
}

#[tokio::test]
async fn test_accept_header_overrides_request_format() {
    let (app, _store) = test_app().await;

    let mut request = post(
        "/deposit",
        "application/json",
        r#"{"user_id": 1, "amount": "10", "currency": "USD"}"#,
    );
    request
        .headers_mut()
        .insert(header::ACCEPT, "application/xml".parse().unwrap());

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/xml");
}

#[tokio::test]
async fn test_invalid_request_is_rejected() {
    let (app, store) = test_app().await;

    let response = app
        .clone()
        .oneshot(post(
            "/deposit",
            "application/json",
            r#"{"user_id": 1, "amount": "0", "currency": "USD"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let envelope: ErrorEnvelope = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(envelope.status_code, 400);
    assert!(envelope.message.contains("Amount"));

    let response = app
        .clone()
        .oneshot(post("/deposit", "application/json", "{not json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(post("/deposit", "text/plain", "user_id=1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(store.transaction_count(), 0);
}

#[tokio::test]
async fn test_unknown_user_is_bad_request() {
    let (app, store) = test_app().await;

    let response = app
        .oneshot(post(
            "/deposit",
            "application/json",
            r#"{"user_id": 99, "amount": "10", "currency": "USD"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(store.transaction_count(), 0);
}

#[tokio::test]
async fn test_region_without_gateways_is_unavailable() {
    let (app, store) = test_app().await;
    store.add_user(User {
        id: 7,
        username: "user7".to_string(),
        region_id: 7,
    });

    let response = app
        .oneshot(post(
            "/deposit",
            "application/json",
            r#"{"user_id": 7, "amount": "10", "currency": "USD"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await;
    assert_eq!(body["status_code"], 503);
    assert_eq!(store.transaction_count(), 0);
}

#[tokio::test]
async fn test_unregistered_gateway_in_priority_list_is_skipped() {
    let (app, store) = test_app().await;
    store.add_user(User {
        id: 8,
        username: "user8".to_string(),
        region_id: 8,
    });
    store.add_gateway(
        8,
        GatewayPriority {
            gateway_id: ProviderId::from("42"),
            name: "Ghost".to_string(),
            priority: 1,
            format: DataFormat::Json,
        },
    );
    store.add_gateway(
        8,
        GatewayPriority {
            gateway_id: ProviderId::from("2"),
            name: "Stripe".to_string(),
            priority: 2,
            format: DataFormat::Json,
        },
    );

    let response = app
        .oneshot(post(
            "/deposit",
            "application/json",
            r#"{"user_id": 8, "amount": "10", "currency": "USD"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let stored = store.get_transaction(1).await.unwrap().unwrap();
    assert_eq!(stored.gateway_id, ProviderId::from("2"));
}

#[tokio::test]
async fn test_callback_completes_transaction() {
    let (app, store) = test_app().await;

    let response = app
        .clone()
        .oneshot(post(
            "/deposit",
            "application/json",
            r#"{"user_id": 1, "amount": "100.00", "currency": "USD"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(post(
            "/callback/1",
            "application/json",
            r#"{"transaction_id": 1, "status": "completed", "reference_id": "PP-REF-1"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let ack: CallbackAck = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(ack.status, "success");

    let stored = store.get_transaction(1).await.unwrap().unwrap();
    assert_eq!(stored.status, TransactionStatus::Completed);
    assert_eq!(stored.reference_id.as_deref(), Some("PP-REF-1"));
    assert!(stored.error_message.is_none());
}

#[tokio::test]
async fn test_failed_callback_records_message() {
    let (app, store) = test_app().await;

    app.clone()
        .oneshot(post(
            "/deposit",
            "application/json",
            r#"{"user_id": 1, "amount": "5", "currency": "USD"}"#,
        ))
        .await
        .unwrap();

    let response = app
        .oneshot(post(
            "/callback/1",
            "application/json",
            r#"{"transaction_id": 1, "status": "failed", "message": "card declined"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let stored = store.get_transaction(1).await.unwrap().unwrap();
    assert_eq!(stored.status, TransactionStatus::Failed);
    assert_eq!(stored.error_message.as_deref(), Some("card declined"));
}

#[tokio::test]
async fn test_callback_for_unknown_gateway_is_not_found() {
    let (app, _store) = test_app().await;

    let response = app
        .oneshot(post(
            "/callback/99",
            "application/json",
            r#"{"transaction_id": 1, "status": "completed"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["status_code"], 404);
}

#[tokio::test]
async fn test_callback_for_unknown_transaction_fails() {
    let (app, _store) = test_app().await;

    let response = app
        .oneshot(post(
            "/callback/2",
            "application/json",
            r#"{"transaction_id": 12345, "status": "completed"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_malformed_callback_is_bad_request() {
    let (app, _store) = test_app().await;

    let response = app
        .oneshot(post("/callback/1", "application/json", r#"{"status": 7}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_reports_gateways() {
    let (app, store) = test_app().await;

    let response = app.clone().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "payment-gateway");
    let gateways = body["gateways"].as_array().unwrap();
    assert_eq!(gateways.len(), 3);
    assert!(gateways.iter().all(|g| g["healthy"] == true));

    store.set_offline(true);
    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["message"], "Database connection failed");
}

#[tokio::test]
async fn test_metrics_exposes_gateway_counters() {
    let (app, _store) = test_app().await;

    app.clone()
        .oneshot(post(
            "/deposit",
            "application/json",
            r#"{"user_id": 2, "amount": "10", "currency": "GBP"}"#,
        ))
        .await
        .unwrap();

    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(body.contains("gateway_requests_total"));
    assert!(body.contains("gateway_health"));
}
