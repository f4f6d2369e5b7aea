//! HTTP API route definitions.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use super::handlers::{
    cancel_reader_action, capture_payment_intent, create_payment_intent, health, list_readers,
    metrics_handler, process_payment_intent, retrieve_payment_intent, retrieve_reader,
    simulate_payment, AppState,
};

/// Create the API router.
///
/// Paths not matched by an endpoint fall through to the static asset
/// directory, so `/` serves `index.html`.
pub fn create_router(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.static_dir);
    let reader_page = ServeFile::new(state.static_dir.join("reader.html"));

    Router::new()
        // Payment endpoints
        .route("/list-readers", get(list_readers))
        .route("/create-payment-intent", post(create_payment_intent))
        .route("/retrieve-payment-intent", get(retrieve_payment_intent))
        .route("/process-payment-intent", post(process_payment_intent))
        .route("/simulate-payment", post(simulate_payment))
        .route("/retrieve-reader", get(retrieve_reader))
        .route("/capture-payment-intent", post(capture_payment_intent))
        .route("/cancel-reader-action", post(cancel_reader_action))
        // Client pages
        .route_service("/reader", reader_page)
        .fallback_service(static_files)
        // Operational endpoints
        .route("/health", get(health))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
