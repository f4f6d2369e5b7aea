//! End-to-end tests of the payment endpoints against the mock provider.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

use terminal_backend::api::{create_router, AppState};
use terminal_backend::config::Config;
use terminal_backend::stripe::{
    simulated_reader, CreatePaymentIntentParams, MockFailure, MockStripeClient, Operation,
    PaymentProvider,
};

struct Harness {
    mock: MockStripeClient,
    app: Router,
    _assets: tempfile::TempDir,
}

impl Harness {
    fn new() -> Self {
        let assets = tempfile::tempdir().unwrap();
        let mock = MockStripeClient::new();
        mock.add_reader(simulated_reader("tmr_1", "Counter"));
        let config = Config::new("sk_test_123", assets.path());
        let app = create_router(AppState::new(&config, Arc::new(mock.clone())));
        Self {
            mock,
            app,
            _assets: assets,
        }
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    async fn json(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let (status, bytes) = self.send(method, uri, body).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    /// Intent created directly on the mock, so HTTP calls under test stay one per request.
    async fn intent(&self, amount: i64) -> String {
        self.mock
            .create_payment_intent(&CreatePaymentIntentParams::card_present(amount))
            .await
            .unwrap()
            .id
    }
}

/// One request per operation, with a body or query that succeeds on a fresh harness.
async fn request_for(h: &Harness, operation: Operation) -> (Method, String, Option<Value>) {
    match operation {
        Operation::ListReaders => (Method::GET, "/list-readers".into(), None),
        Operation::CreatePaymentIntent => (
            Method::POST,
            "/create-payment-intent".into(),
            Some(json!({"amount": 1000})),
        ),
        Operation::RetrievePaymentIntent => {
            let id = h.intent(500).await;
            (
                Method::GET,
                format!("/retrieve-payment-intent?payment_intent_id={id}"),
                None,
            )
        }
        Operation::ProcessPaymentIntent => {
            let id = h.intent(500).await;
            (
                Method::POST,
                "/process-payment-intent".into(),
                Some(json!({"reader_id": "tmr_1", "payment_intent_id": id})),
            )
        }
        Operation::SimulatePayment => {
            let id = h.intent(500).await;
            h.mock.process_payment_intent("tmr_1", &id).await.unwrap();
            (
                Method::POST,
                "/simulate-payment".into(),
                Some(json!({"reader_id": "tmr_1"})),
            )
        }
        Operation::RetrieveReader => (Method::GET, "/retrieve-reader?reader_id=tmr_1".into(), None),
        Operation::CapturePaymentIntent => {
            let id = h.intent(500).await;
            h.mock.process_payment_intent("tmr_1", &id).await.unwrap();
            h.mock.present_payment_method("tmr_1").await.unwrap();
            (
                Method::POST,
                "/capture-payment-intent".into(),
                Some(json!({"payment_intent_id": id})),
            )
        }
        Operation::CancelReaderAction => {
            let id = h.intent(500).await;
            h.mock.process_payment_intent("tmr_1", &id).await.unwrap();
            (
                Method::POST,
                "/cancel-reader-action".into(),
                Some(json!({"reader_id": "tmr_1"})),
            )
        }
    }
}

fn expected_key(operation: Operation) -> &'static str {
    match operation {
        Operation::ListReaders => "readers",
        Operation::CreatePaymentIntent => "payment_intent_id",
        Operation::RetrievePaymentIntent | Operation::CapturePaymentIntent => "payment_intent",
        Operation::ProcessPaymentIntent
        | Operation::SimulatePayment
        | Operation::RetrieveReader
        | Operation::CancelReaderAction => "reader_state",
    }
}

const ALL: [Operation; 8] = [
    Operation::ListReaders,
    Operation::CreatePaymentIntent,
    Operation::RetrievePaymentIntent,
    Operation::ProcessPaymentIntent,
    Operation::SimulatePayment,
    Operation::RetrieveReader,
    Operation::CapturePaymentIntent,
    Operation::CancelReaderAction,
];

#[tokio::test]
async fn every_operation_succeeds_with_documented_shape() {
    for operation in ALL {
        let h = Harness::new();
        let (method, uri, body) = request_for(&h, operation).await;
        let calls_before = h.mock.calls().len();

        let (status, value) = h.json(method, &uri, body).await;

        assert_eq!(status, StatusCode::OK, "{operation}");
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 1, "{operation}: {value}");
        assert!(object.contains_key(expected_key(operation)), "{operation}: {value}");
        assert_eq!(h.mock.calls()[calls_before..], [operation], "{operation}");
    }
}

#[tokio::test]
async fn every_operation_maps_provider_errors_to_400() {
    for operation in ALL {
        let h = Harness::new();
        let (method, uri, body) = request_for(&h, operation).await;
        h.mock.fail(
            operation,
            MockFailure::Provider(format!("{operation} was declined")),
        );

        let (status, value) = h.json(method, &uri, body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "{operation}");
        assert_eq!(
            value,
            json!({"error": {"message": format!("{operation} was declined")}})
        );
    }
}

#[tokio::test]
async fn every_operation_maps_transport_errors_to_500() {
    for operation in ALL {
        let h = Harness::new();
        let (method, uri, body) = request_for(&h, operation).await;
        h.mock.fail(
            operation,
            MockFailure::Transport("tcp connect error: 10.0.0.1:443".into()),
        );

        let (status, value) = h.json(method, &uri, body).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{operation}");
        assert_eq!(value, json!({"error": {"message": "Unknown server error"}}));
    }
}

#[tokio::test]
async fn create_payment_intent_returns_upstream_id() {
    let h = Harness::new();
    h.mock.set_next_payment_intent_id("pi_123");

    let (status, value) = h
        .json(
            Method::POST,
            "/create-payment-intent",
            Some(json!({"amount": 1000})),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(value, json!({"payment_intent_id": "pi_123"}));

    let stored = h.mock.payment_intent("pi_123").unwrap();
    assert_eq!(stored.amount, Some(1000));
    assert_eq!(stored.currency.as_deref(), Some("usd"));
    assert_eq!(stored.capture_method.as_deref(), Some("manual"));
    assert_eq!(stored.payment_method_types, Some(vec!["card_present".to_string()]));
}

#[tokio::test]
async fn create_payment_intent_with_garbage_body_sends_zero_amount() {
    let h = Harness::new();

    let response = h
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/create-payment-intent")
                .body(Body::from("amount=1000"))
                .unwrap(),
        )
        .await
        .unwrap();

    // The mock rejects a zero amount the way Stripe does.
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(h.mock.calls(), vec![Operation::CreatePaymentIntent]);
}

#[tokio::test]
async fn mistyped_field_does_not_discard_the_rest_of_the_body() {
    let h = Harness::new();
    let id = h.intent(500).await;

    // The intent id still reaches upstream; only the numeric reader id is dropped.
    let (status, value) = h
        .json(
            Method::POST,
            "/process-payment-intent",
            Some(json!({"reader_id": 7, "payment_intent_id": id})),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        value,
        json!({"error": {"message": "No such terminal.reader: ''"}})
    );
}

#[tokio::test]
async fn null_fields_outside_the_request_are_ignored() {
    let h = Harness::new();
    let id = h.intent(500).await;

    let (status, value) = h
        .json(
            Method::POST,
            "/process-payment-intent",
            Some(json!({"reader_id": "tmr_1", "payment_intent_id": id, "amount": null})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["reader_state"]["id"], "tmr_1");

    let (status, value) = h
        .json(
            Method::POST,
            "/cancel-reader-action",
            Some(json!({"reader_id": "tmr_1", "payment_intent_id": null})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["reader_state"]["action"], Value::Null);
}

#[tokio::test]
async fn retrieve_reader_without_id_is_empty_200() {
    let h = Harness::new();

    let (status, body) = h.send(Method::GET, "/retrieve-reader", None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());
    assert!(h.mock.calls().is_empty());
}

#[tokio::test]
async fn retrieve_payment_intent_without_id_is_empty_200() {
    let h = Harness::new();

    let (status, body) = h
        .send(Method::GET, "/retrieve-payment-intent?other=1", None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());
    assert!(h.mock.calls().is_empty());
}

#[tokio::test]
async fn cancel_reader_action_without_action_is_400() {
    let h = Harness::new();

    let (status, body) = h
        .send(
            Method::POST,
            "/cancel-reader-action",
            Some(json!({"reader_id": "tmr_1"})),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        String::from_utf8(body).unwrap(),
        r#"{"error":{"message":"No action to cancel"}}"#
    );
}

#[tokio::test]
async fn retrieves_are_idempotent() {
    let h = Harness::new();
    let id = h.intent(700).await;

    let intent_uri = format!("/retrieve-payment-intent?payment_intent_id={id}");
    let first = h.send(Method::GET, &intent_uri, None).await;
    let second = h.send(Method::GET, &intent_uri, None).await;
    assert_eq!(first, second);

    let first = h.send(Method::GET, "/retrieve-reader?reader_id=tmr_1", None).await;
    let second = h.send(Method::GET, "/retrieve-reader?reader_id=tmr_1", None).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn unknown_reader_is_400_with_stripe_message() {
    let h = Harness::new();

    let (status, value) = h
        .json(Method::GET, "/retrieve-reader?reader_id=tmr_nope", None)
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        value,
        json!({"error": {"message": "No such terminal.reader: 'tmr_nope'"}})
    );
}

#[tokio::test]
async fn full_checkout_flow_over_http() {
    let h = Harness::new();

    let (_, created) = h
        .json(
            Method::POST,
            "/create-payment-intent",
            Some(json!({"amount": 999})),
        )
        .await;
    let id = created["payment_intent_id"].as_str().unwrap().to_string();

    let (status, processed) = h
        .json(
            Method::POST,
            "/process-payment-intent",
            Some(json!({"reader_id": "tmr_1", "payment_intent_id": id})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(processed["reader_state"]["id"], "tmr_1");
    assert_eq!(processed["reader_state"]["action"]["status"], "in_progress");

    let (status, simulated) = h
        .json(
            Method::POST,
            "/simulate-payment",
            Some(json!({"reader_id": "tmr_1"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(simulated["reader_state"]["action"]["status"], "succeeded");

    let (status, captured) = h
        .json(
            Method::POST,
            "/capture-payment-intent",
            Some(json!({"payment_intent_id": id})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(captured["payment_intent"]["status"], "succeeded");
    assert_eq!(captured["payment_intent"]["amount_received"], 999);
}

#[tokio::test]
async fn cancel_returns_reader_with_null_action() {
    let h = Harness::new();
    let id = h.intent(999).await;
    h.mock.process_payment_intent("tmr_1", &id).await.unwrap();

    let (status, value) = h
        .json(
            Method::POST,
            "/cancel-reader-action",
            Some(json!({"reader_id": "tmr_1"})),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["reader_state"]["action"], Value::Null);
    assert!(value["reader_state"]
        .as_object()
        .unwrap()
        .contains_key("action"));
}

#[tokio::test]
async fn success_responses_are_json() {
    let h = Harness::new();

    let response = h
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/list-readers")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
}
