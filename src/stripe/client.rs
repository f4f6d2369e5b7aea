//! Stripe REST API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::Config;
use crate::error::{ServiceError, UpstreamError};

use super::types::{
    CreatePaymentIntentParams, List, PaymentIntent, Reader, StripeErrorBody,
};
use super::PaymentProvider;

/// API version the request and response shapes are written against.
pub const STRIPE_API_VERSION: &str = "2020-08-27";

const USER_AGENT: &str = concat!("terminal-backend/", env!("CARGO_PKG_VERSION"));

/// Stripe API client.
#[derive(Debug, Clone)]
pub struct StripeClient {
    /// HTTP client with auth headers preset.
    http: reqwest::Client,
    /// API base URL.
    base_url: Url,
}

impl StripeClient {
    /// Create a new Stripe client from config.
    pub fn new(config: &Config) -> Result<Self, ServiceError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.stripe_secret_key))
            .map_err(|_| {
                ServiceError::InvalidConfig("STRIPE_SECRET_KEY is not a valid header value".into())
            })?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert("stripe-version", HeaderValue::from_static(STRIPE_API_VERSION));

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.http_timeout_ms))
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;

        let base_url = Url::parse(&config.stripe_api_url)?;

        Ok(Self { http, base_url })
    }

    /// Build an endpoint URL, percent-encoding each path segment.
    ///
    /// An empty segment means an empty object ID. It is refused before any
    /// request is made, since `/v1/payment_intents/` would hit the list endpoint.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, UpstreamError> {
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(UpstreamError::Provider {
                message: format!(
                    "Could not determine which URL to request: empty ID in /v1/{}",
                    segments.join("/")
                ),
                code: None,
                kind: Some("invalid_request_error".to_string()),
                status: 400,
            });
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| UpstreamError::transport(format!("cannot-be-a-base URL: {}", self.base_url)))?
            .pop_if_empty()
            .push("v1")
            .extend(segments);
        Ok(url)
    }

    /// Make a GET request.
    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, UpstreamError> {
        let url = self.endpoint(segments)?;
        debug!("GET {}", url);

        let response = self.http.get(url).send().await?;
        self.handle_response(response).await
    }

    /// Make a form-encoded POST request.
    async fn post<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        form: &[(String, String)],
    ) -> Result<T, UpstreamError> {
        let url = self.endpoint(segments)?;
        debug!("POST {}", url);

        let response = self.http.post(url).form(form).send().await?;
        self.handle_response(response).await
    }

    /// Decode a success body, or classify the failure.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, UpstreamError> {
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            return serde_json::from_str(&text).map_err(|e| {
                UpstreamError::transport(format!("failed to decode Stripe response: {e}"))
            });
        }

        warn!(status = %status, "Stripe API error response");
        match serde_json::from_str::<StripeErrorBody>(&text) {
            Ok(body) => Err(body.into_upstream(status.as_u16())),
            Err(_) => Err(UpstreamError::transport(format!("HTTP {status}: {text}"))),
        }
    }
}

#[async_trait]
impl PaymentProvider for StripeClient {
    #[instrument(skip(self))]
    async fn list_readers(&self) -> Result<Vec<Reader>, UpstreamError> {
        let page: List<Reader> = self.get(&["terminal", "readers"]).await?;
        debug!(count = page.data.len(), has_more = page.has_more, "Listed readers");
        Ok(page.data)
    }

    #[instrument(skip(self), fields(amount = params.amount))]
    async fn create_payment_intent(
        &self,
        params: &CreatePaymentIntentParams,
    ) -> Result<PaymentIntent, UpstreamError> {
        self.post(&["payment_intents"], &params.to_form()).await
    }

    #[instrument(skip(self))]
    async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, UpstreamError> {
        self.get(&["payment_intents", id]).await
    }

    #[instrument(skip(self))]
    async fn process_payment_intent(
        &self,
        reader_id: &str,
        payment_intent_id: &str,
    ) -> Result<Reader, UpstreamError> {
        let form = [("payment_intent".to_string(), payment_intent_id.to_string())];
        self.post(
            &["terminal", "readers", reader_id, "process_payment_intent"],
            &form,
        )
        .await
    }

    #[instrument(skip(self))]
    async fn present_payment_method(&self, reader_id: &str) -> Result<Reader, UpstreamError> {
        self.post(
            &[
                "test_helpers",
                "terminal",
                "readers",
                reader_id,
                "present_payment_method",
            ],
            &[],
        )
        .await
    }

    #[instrument(skip(self))]
    async fn retrieve_reader(&self, reader_id: &str) -> Result<Reader, UpstreamError> {
        self.get(&["terminal", "readers", reader_id]).await
    }

    #[instrument(skip(self))]
    async fn capture_payment_intent(&self, id: &str) -> Result<PaymentIntent, UpstreamError> {
        self.post(&["payment_intents", id, "capture"], &[]).await
    }

    #[instrument(skip(self))]
    async fn cancel_reader_action(&self, reader_id: &str) -> Result<Reader, UpstreamError> {
        self.post(&["terminal", "readers", reader_id, "cancel_action"], &[])
            .await
    }
}
