//! Upstream payment provider: the Stripe Terminal REST API.
//!
//! This module handles:
//! - The [`PaymentProvider`] seam the HTTP handlers call through
//! - Stripe object types
//! - The reqwest-backed Stripe client
//! - A mock provider for testing

use async_trait::async_trait;
use strum::{Display, EnumIter, EnumString};

use crate::error::UpstreamError;

pub mod client;
pub mod mock;
pub mod types;

pub use client::StripeClient;
pub use mock::{simulated_reader, MockFailure, MockStripeClient};
pub use types::{CreatePaymentIntentParams, PaymentIntent, Reader, ReaderAction};

/// The upstream operations the backend dispatches, one per endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum Operation {
    /// List all readers.
    ListReaders,
    /// Create a card-present payment intent.
    CreatePaymentIntent,
    /// Fetch a payment intent by ID.
    RetrievePaymentIntent,
    /// Hand a payment intent to a reader.
    ProcessPaymentIntent,
    /// Present a test card on a simulated reader.
    SimulatePayment,
    /// Fetch a reader by ID.
    RetrieveReader,
    /// Capture an authorized payment intent.
    CapturePaymentIntent,
    /// Cancel the reader's current action.
    CancelReaderAction,
}

/// Operations offered by the upstream payment provider.
///
/// Each method maps to exactly one API call.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// List readers registered on the account.
    async fn list_readers(&self) -> Result<Vec<Reader>, UpstreamError>;

    /// Create a payment intent.
    async fn create_payment_intent(
        &self,
        params: &CreatePaymentIntentParams,
    ) -> Result<PaymentIntent, UpstreamError>;

    /// Retrieve a payment intent.
    async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, UpstreamError>;

    /// Instruct a reader to collect payment for an intent.
    async fn process_payment_intent(
        &self,
        reader_id: &str,
        payment_intent_id: &str,
    ) -> Result<Reader, UpstreamError>;

    /// Simulate presenting a card on a simulated reader.
    async fn present_payment_method(&self, reader_id: &str) -> Result<Reader, UpstreamError>;

    /// Retrieve a reader.
    async fn retrieve_reader(&self, reader_id: &str) -> Result<Reader, UpstreamError>;

    /// Capture a previously authorized payment intent.
    async fn capture_payment_intent(&self, id: &str) -> Result<PaymentIntent, UpstreamError>;

    /// Cancel whatever the reader is currently doing.
    async fn cancel_reader_action(&self, reader_id: &str) -> Result<Reader, UpstreamError>;
}
