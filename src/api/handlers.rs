//! HTTP API handlers.
//!
//! Every payment endpoint extracts its parameters, makes exactly one upstream
//! call through the [`PaymentProvider`], and relays the result as JSON. Upstream
//! failures are converted by [`ApiError`].

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{RawQuery, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::error::UpstreamError;
use crate::metrics;
use crate::stripe::{CreatePaymentIntentParams, Operation, PaymentIntent, PaymentProvider, Reader};

use super::error::ApiError;

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Upstream payment provider.
    pub provider: Arc<dyn PaymentProvider>,
    /// Directory the client assets are served from.
    pub static_dir: PathBuf,
    /// Prometheus handle, when metrics are enabled.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create app state from config and a provider.
    pub fn new(config: &Config, provider: Arc<dyn PaymentProvider>) -> Self {
        Self {
            provider,
            static_dir: config.static_dir.clone(),
            metrics: None,
        }
    }

    /// Attach a Prometheus handle so /metrics renders.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

// === Request bodies ===

/// A request body decoded one field at a time.
///
/// A field that is missing, `null`, or of the wrong type keeps its default
/// while the other fields are still read.
trait FromFields: Default {
    fn from_fields(fields: &Map<String, Value>) -> Self;
}

fn string_field(fields: &Map<String, Value>, name: &str) -> String {
    fields
        .get(name)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn int_field(fields: &Map<String, Value>, name: &str) -> i64 {
    fields.get(name).and_then(Value::as_i64).unwrap_or_default()
}

/// Body of `POST /create-payment-intent`.
#[derive(Debug, Default)]
pub struct CreatePaymentIntentRequest {
    /// Amount in minor currency units.
    pub amount: i64,
}

impl FromFields for CreatePaymentIntentRequest {
    fn from_fields(fields: &Map<String, Value>) -> Self {
        Self {
            amount: int_field(fields, "amount"),
        }
    }
}

/// Body of `POST /process-payment-intent`.
#[derive(Debug, Default)]
pub struct ProcessPaymentIntentRequest {
    /// Reader to hand the intent to.
    pub reader_id: String,
    /// Intent to collect.
    pub payment_intent_id: String,
}

impl FromFields for ProcessPaymentIntentRequest {
    fn from_fields(fields: &Map<String, Value>) -> Self {
        Self {
            reader_id: string_field(fields, "reader_id"),
            payment_intent_id: string_field(fields, "payment_intent_id"),
        }
    }
}

/// Body of `POST /simulate-payment` and `POST /cancel-reader-action`.
#[derive(Debug, Default)]
pub struct ReaderRequest {
    /// Target reader.
    pub reader_id: String,
}

impl FromFields for ReaderRequest {
    fn from_fields(fields: &Map<String, Value>) -> Self {
        Self {
            reader_id: string_field(fields, "reader_id"),
        }
    }
}

/// Body of `POST /capture-payment-intent`.
#[derive(Debug, Default)]
pub struct CapturePaymentIntentRequest {
    /// Intent to capture.
    pub payment_intent_id: String,
}

impl FromFields for CapturePaymentIntentRequest {
    fn from_fields(fields: &Map<String, Value>) -> Self {
        Self {
            payment_intent_id: string_field(fields, "payment_intent_id"),
        }
    }
}

// === Response bodies ===

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// `{readers: [...]}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ListReadersResponse {
    /// Readers on the account.
    pub readers: Vec<Reader>,
}

/// `{payment_intent_id}`
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatePaymentIntentResponse {
    /// ID of the created intent.
    pub payment_intent_id: String,
}

/// `{payment_intent}`
#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentIntentResponse {
    /// The intent as returned upstream.
    pub payment_intent: PaymentIntent,
}

/// `{reader_state}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ReaderStateResponse {
    /// The reader as returned upstream.
    pub reader_state: Reader,
}

// === Helpers ===

/// Await one upstream call, record it, and classify any failure.
async fn dispatch<T, F>(operation: Operation, call: F) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, UpstreamError>>,
{
    let start = Instant::now();
    let result = call.await;
    metrics::record_upstream(operation, start, &result);
    result.map_err(|err| ApiError::from_upstream(operation, err))
}

/// Serialize a success body. An encoding failure is logged and answered with
/// a bare 500.
fn write_json<T: Serialize>(value: &T) -> Response {
    match serde_json::to_vec(value) {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(err) => {
            error!("json encode failed: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Decode a request body, falling back to defaults for anything malformed.
fn decode_lenient<T: FromFields>(body: &Bytes) -> T {
    if body.is_empty() {
        return T::default();
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(fields)) => T::from_fields(&fields),
        Ok(other) => {
            debug!("request body is not an object, using defaults: {}", other);
            T::default()
        }
        Err(err) => {
            debug!("request body not decodable, using defaults: {}", err);
            T::default()
        }
    }
}

/// First value of a query parameter, if present at all.
fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Answer for a missing required query parameter: logged, then an empty 200.
fn missing_param(name: &str) -> Response {
    warn!("Url Param '{}' is missing", name);
    StatusCode::OK.into_response()
}

// === Handlers ===

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Prometheus exposition, 404 when metrics are disabled.
pub async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// `GET /list-readers`
pub async fn list_readers(State(state): State<AppState>) -> Result<Response, ApiError> {
    let readers = dispatch(Operation::ListReaders, state.provider.list_readers()).await?;
    Ok(write_json(&ListReadersResponse { readers }))
}

/// `POST /create-payment-intent`
pub async fn create_payment_intent(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let req: CreatePaymentIntentRequest = decode_lenient(&body);
    let params = CreatePaymentIntentParams::card_present(req.amount);

    let intent = dispatch(
        Operation::CreatePaymentIntent,
        state.provider.create_payment_intent(&params),
    )
    .await?;

    Ok(write_json(&CreatePaymentIntentResponse {
        payment_intent_id: intent.id,
    }))
}

/// `GET /retrieve-payment-intent?payment_intent_id=...`
pub async fn retrieve_payment_intent(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Response, ApiError> {
    let Some(id) = query_param(query.as_deref(), "payment_intent_id") else {
        return Ok(missing_param("payment_intent_id"));
    };

    let payment_intent = dispatch(
        Operation::RetrievePaymentIntent,
        state.provider.retrieve_payment_intent(&id),
    )
    .await?;

    Ok(write_json(&PaymentIntentResponse { payment_intent }))
}

/// `POST /process-payment-intent`
pub async fn process_payment_intent(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let req: ProcessPaymentIntentRequest = decode_lenient(&body);

    let reader_state = dispatch(
        Operation::ProcessPaymentIntent,
        state
            .provider
            .process_payment_intent(&req.reader_id, &req.payment_intent_id),
    )
    .await?;

    Ok(write_json(&ReaderStateResponse { reader_state }))
}

/// `POST /simulate-payment`
pub async fn simulate_payment(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let req: ReaderRequest = decode_lenient(&body);

    let reader_state = dispatch(
        Operation::SimulatePayment,
        state.provider.present_payment_method(&req.reader_id),
    )
    .await?;

    Ok(write_json(&ReaderStateResponse { reader_state }))
}

/// `GET /retrieve-reader?reader_id=...`
pub async fn retrieve_reader(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Response, ApiError> {
    let Some(reader_id) = query_param(query.as_deref(), "reader_id") else {
        return Ok(missing_param("reader_id"));
    };

    let reader_state = dispatch(
        Operation::RetrieveReader,
        state.provider.retrieve_reader(&reader_id),
    )
    .await?;

    Ok(write_json(&ReaderStateResponse { reader_state }))
}

/// `POST /capture-payment-intent`
pub async fn capture_payment_intent(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let req: CapturePaymentIntentRequest = decode_lenient(&body);

    let payment_intent = dispatch(
        Operation::CapturePaymentIntent,
        state.provider.capture_payment_intent(&req.payment_intent_id),
    )
    .await?;

    Ok(write_json(&PaymentIntentResponse { payment_intent }))
}

/// `POST /cancel-reader-action`
pub async fn cancel_reader_action(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let req: ReaderRequest = decode_lenient(&body);

    let reader_state = dispatch(
        Operation::CancelReaderAction,
        state.provider.cancel_reader_action(&req.reader_id),
    )
    .await?;

    Ok(write_json(&ReaderStateResponse { reader_state }))
}
