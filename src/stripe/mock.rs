//! Mock Stripe provider for unit testing.
//!
//! Keeps readers and payment intents in memory and walks them through the
//! same states the Stripe test mode does for a simulated reader, without
//! making real network requests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::error::UpstreamError;

use super::types::{CreatePaymentIntentParams, PaymentIntent, Reader, ReaderAction};
use super::{Operation, PaymentProvider};

/// Failure to inject for an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockFailure {
    /// Answer with a structured provider error carrying this message.
    Provider(String),
    /// Answer with a transport error carrying this cause.
    Transport(String),
}

impl MockFailure {
    fn to_error(&self) -> UpstreamError {
        match self {
            MockFailure::Provider(message) => UpstreamError::provider(message.clone()),
            MockFailure::Transport(cause) => UpstreamError::transport(cause),
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    readers: BTreeMap<String, Reader>,
    payment_intents: HashMap<String, PaymentIntent>,
    failures: HashMap<Operation, MockFailure>,
    calls: Vec<Operation>,
    next_payment_intent_id: Option<String>,
    intent_counter: u64,
}

/// Mock Stripe provider for testing.
#[derive(Debug, Clone, Default)]
pub struct MockStripeClient {
    state: Arc<Mutex<MockState>>,
}

/// Build an idle simulated WisePOS E reader.
pub fn simulated_reader(id: impl Into<String>, label: impl Into<String>) -> Reader {
    let mut extra = Map::new();
    extra.insert("object".to_string(), json!("terminal.reader"));
    extra.insert("livemode".to_string(), json!(false));
    Reader {
        id: id.into(),
        label: Some(label.into()),
        device_type: Some("simulated_wisepos_e".to_string()),
        status: Some("online".to_string()),
        action: None,
        extra,
    }
}

fn no_such(kind: &str, id: &str) -> UpstreamError {
    UpstreamError::Provider {
        message: format!("No such {kind}: '{id}'"),
        code: Some("resource_missing".to_string()),
        kind: Some("invalid_request_error".to_string()),
        status: 404,
    }
}

fn action(kind: &str, status: &str, detail: Value) -> ReaderAction {
    let mut extra = Map::new();
    extra.insert(kind.to_string(), detail);
    ReaderAction {
        kind: kind.to_string(),
        status: status.to_string(),
        failure_code: None,
        failure_message: None,
        extra,
    }
}

impl MockStripeClient {
    /// Create an empty mock provider.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a reader.
    pub fn add_reader(&self, reader: Reader) {
        self.state().readers.insert(reader.id.clone(), reader);
    }

    /// Register a payment intent.
    pub fn add_payment_intent(&self, intent: PaymentIntent) {
        self.state()
            .payment_intents
            .insert(intent.id.clone(), intent);
    }

    /// Use this ID for the next created payment intent.
    pub fn set_next_payment_intent_id(&self, id: impl Into<String>) {
        self.state().next_payment_intent_id = Some(id.into());
    }

    /// Make every call to `operation` fail until cleared.
    pub fn fail(&self, operation: Operation, failure: MockFailure) {
        self.state().failures.insert(operation, failure);
    }

    /// Remove an injected failure.
    pub fn clear_failure(&self, operation: Operation) {
        self.state().failures.remove(&operation);
    }

    /// Operations called so far, in order.
    pub fn calls(&self) -> Vec<Operation> {
        self.state().calls.clone()
    }

    /// Current stored copy of a payment intent.
    pub fn payment_intent(&self, id: &str) -> Option<PaymentIntent> {
        self.state().payment_intents.get(id).cloned()
    }

    /// Record the call and return the injected failure, if any.
    fn begin(&self, operation: Operation) -> Result<MutexGuard<'_, MockState>, UpstreamError> {
        let mut state = self.state();
        state.calls.push(operation);
        let failure = state.failures.get(&operation).cloned();
        match failure {
            Some(failure) => Err(failure.to_error()),
            None => Ok(state),
        }
    }
}

impl MockState {
    fn reader_mut(&mut self, id: &str) -> Result<&mut Reader, UpstreamError> {
        self.readers
            .get_mut(id)
            .ok_or_else(|| no_such("terminal.reader", id))
    }

    fn intent_mut(&mut self, id: &str) -> Result<&mut PaymentIntent, UpstreamError> {
        self.payment_intents
            .get_mut(id)
            .ok_or_else(|| no_such("payment_intent", id))
    }

    fn processing_intent_of(reader: &Reader) -> Option<String> {
        reader
            .action
            .as_ref()
            .and_then(|a| a.extra.get("process_payment_intent"))
            .and_then(|detail| detail.get("payment_intent"))
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

#[async_trait]
impl PaymentProvider for MockStripeClient {
    async fn list_readers(&self) -> Result<Vec<Reader>, UpstreamError> {
        let state = self.begin(Operation::ListReaders)?;
        Ok(state.readers.values().cloned().collect())
    }

    async fn create_payment_intent(
        &self,
        params: &CreatePaymentIntentParams,
    ) -> Result<PaymentIntent, UpstreamError> {
        let mut state = self.begin(Operation::CreatePaymentIntent)?;

        if params.amount < 1 {
            return Err(UpstreamError::Provider {
                message: "This value must be greater than or equal to 1.".to_string(),
                code: Some("parameter_invalid_integer".to_string()),
                kind: Some("invalid_request_error".to_string()),
                status: 400,
            });
        }

        state.intent_counter += 1;
        let id = match state.next_payment_intent_id.take() {
            Some(id) => id,
            None => format!("pi_mock_{}", state.intent_counter),
        };

        let mut extra = Map::new();
        extra.insert("object".to_string(), json!("payment_intent"));
        extra.insert("amount_received".to_string(), json!(0));
        let intent = PaymentIntent {
            id: id.clone(),
            amount: Some(params.amount),
            currency: Some(params.currency.clone()),
            status: Some("requires_payment_method".to_string()),
            capture_method: Some(params.capture_method.clone()),
            payment_method_types: Some(params.payment_method_types.clone()),
            extra,
        };
        state.payment_intents.insert(id, intent.clone());
        Ok(intent)
    }

    async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, UpstreamError> {
        let mut state = self.begin(Operation::RetrievePaymentIntent)?;
        state.intent_mut(id).map(|intent| intent.clone())
    }

    async fn process_payment_intent(
        &self,
        reader_id: &str,
        payment_intent_id: &str,
    ) -> Result<Reader, UpstreamError> {
        let mut state = self.begin(Operation::ProcessPaymentIntent)?;

        let intent = state.intent_mut(payment_intent_id)?;
        if !intent.has_status("requires_payment_method") {
            let status = intent.status.clone().unwrap_or_default();
            return Err(UpstreamError::provider(format!(
                "This PaymentIntent's status is {status}, but must be requires_payment_method to be processed."
            )));
        }

        let reader = state.reader_mut(reader_id)?;
        if reader.has_action_in_progress() {
            return Err(UpstreamError::provider(
                "Reader is currently busy processing another request.",
            ));
        }
        reader.action = Some(action(
            "process_payment_intent",
            "in_progress",
            json!({"payment_intent": payment_intent_id}),
        ));
        Ok(reader.clone())
    }

    async fn present_payment_method(&self, reader_id: &str) -> Result<Reader, UpstreamError> {
        let mut state = self.begin(Operation::SimulatePayment)?;

        let reader = state.reader_mut(reader_id)?;
        if !reader.is_simulated() {
            return Err(UpstreamError::provider(
                "This endpoint is only available for simulated readers.",
            ));
        }
        let intent_id = match MockState::processing_intent_of(reader) {
            Some(id) if reader.has_action_in_progress() => id,
            _ => {
                return Err(UpstreamError::provider(
                    "Reader has no action in progress to present a payment method to.",
                ))
            }
        };
        if let Some(action) = reader.action.as_mut() {
            action.status = "succeeded".to_string();
        }
        let reader = reader.clone();

        state.intent_mut(&intent_id)?.status = Some("requires_capture".to_string());
        Ok(reader)
    }

    async fn retrieve_reader(&self, reader_id: &str) -> Result<Reader, UpstreamError> {
        let mut state = self.begin(Operation::RetrieveReader)?;
        state.reader_mut(reader_id).map(|reader| reader.clone())
    }

    async fn capture_payment_intent(&self, id: &str) -> Result<PaymentIntent, UpstreamError> {
        let mut state = self.begin(Operation::CapturePaymentIntent)?;

        let intent = state.intent_mut(id)?;
        if !intent.has_status("requires_capture") {
            return Err(UpstreamError::provider(format!(
                "This PaymentIntent could not be captured because it has a status of {}.",
                intent.status.as_deref().unwrap_or_default()
            )));
        }
        intent.status = Some("succeeded".to_string());
        let amount_received = intent.amount.unwrap_or_default();
        intent
            .extra
            .insert("amount_received".to_string(), json!(amount_received));
        Ok(intent.clone())
    }

    async fn cancel_reader_action(&self, reader_id: &str) -> Result<Reader, UpstreamError> {
        let mut state = self.begin(Operation::CancelReaderAction)?;

        let reader = state.reader_mut(reader_id)?;
        if !reader.has_action_in_progress() {
            return Err(UpstreamError::provider("No action to cancel"));
        }
        reader.action = None;
        Ok(reader.clone())
    }
}
