//! Stripe object shapes relayed by the backend.
//!
//! Only the fields the service reads are typed; everything else the API
//! returns is kept in `extra` so relayed payloads are not truncated.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::UpstreamError;

/// Currency every payment intent is created in.
pub const CURRENCY: &str = "usd";
/// Payment method type for in-person card payments.
pub const CARD_PRESENT: &str = "card_present";
/// In-person payments are authorized first and captured later.
pub const CAPTURE_MANUAL: &str = "manual";

/// A Stripe PaymentIntent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// Intent ID (`pi_...`).
    pub id: String,
    /// Amount in minor currency units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
    /// Three-letter lowercase currency code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    /// Lifecycle status (`requires_payment_method`, `requires_capture`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// `automatic` or `manual`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capture_method: Option<String>,
    /// Allowed payment method types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method_types: Option<Vec<String>>,
    /// Remaining fields, relayed untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A Terminal reader and its current action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reader {
    /// Reader ID (`tmr_...`).
    pub id: String,
    /// Human-readable label.
    #[serde(default)]
    pub label: Option<String>,
    /// Device type, e.g. `bbpos_wisepos_e` or `simulated_wisepos_e`.
    #[serde(default)]
    pub device_type: Option<String>,
    /// `online` or `offline`.
    #[serde(default)]
    pub status: Option<String>,
    /// In-flight or last action; `null` when the reader is idle.
    #[serde(default)]
    pub action: Option<ReaderAction>,
    /// Remaining fields, relayed untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PaymentIntent {
    /// Whether the intent is currently in `status`.
    pub fn has_status(&self, status: &str) -> bool {
        self.status.as_deref() == Some(status)
    }
}

impl Reader {
    /// Whether this is a simulated reader that accepts test helper calls.
    pub fn is_simulated(&self) -> bool {
        self.device_type
            .as_deref()
            .is_some_and(|t| t.starts_with("simulated_"))
    }

    /// Whether the reader is busy with an action.
    pub fn has_action_in_progress(&self) -> bool {
        self.action
            .as_ref()
            .is_some_and(|a| a.status == "in_progress")
    }
}

/// Action a reader is performing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReaderAction {
    /// Action type, e.g. `process_payment_intent`.
    #[serde(rename = "type")]
    pub kind: String,
    /// `in_progress`, `succeeded` or `failed`.
    pub status: String,
    /// Failure code when the action failed.
    #[serde(default)]
    pub failure_code: Option<String>,
    /// Failure message when the action failed.
    #[serde(default)]
    pub failure_message: Option<String>,
    /// Remaining fields, relayed untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Stripe list envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct List<T> {
    /// Items on this page.
    pub data: Vec<T>,
    /// Whether more pages exist.
    #[serde(default)]
    pub has_more: bool,
}

/// Parameters for creating an in-person payment intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePaymentIntentParams {
    /// Amount in minor currency units.
    pub amount: i64,
    /// Currency code.
    pub currency: String,
    /// Allowed payment method types.
    pub payment_method_types: Vec<String>,
    /// Capture method.
    pub capture_method: String,
}

impl CreatePaymentIntentParams {
    /// Card-present, manually captured USD intent for the given amount.
    pub fn card_present(amount: i64) -> Self {
        Self {
            amount,
            currency: CURRENCY.to_string(),
            payment_method_types: vec![CARD_PRESENT.to_string()],
            capture_method: CAPTURE_MANUAL.to_string(),
        }
    }

    /// Form-encoded body in Stripe's bracketed array notation.
    pub fn to_form(&self) -> Vec<(String, String)> {
        let mut form = vec![
            ("amount".to_string(), self.amount.to_string()),
            ("currency".to_string(), self.currency.clone()),
            ("capture_method".to_string(), self.capture_method.clone()),
        ];
        form.extend(
            self.payment_method_types
                .iter()
                .enumerate()
                .map(|(i, t)| (format!("payment_method_types[{i}]"), t.clone())),
        );
        form
    }
}

/// Error body returned by the Stripe API on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorBody {
    /// The error object.
    pub error: StripeErrorObject,
}

/// Inner Stripe error object.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorObject {
    /// Human-readable message.
    #[serde(default)]
    pub message: Option<String>,
    /// Short error code, e.g. `resource_missing`.
    #[serde(default)]
    pub code: Option<String>,
    /// Error category, e.g. `invalid_request_error`.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl StripeErrorBody {
    /// Convert into the provider variant of [`UpstreamError`].
    pub fn into_upstream(self, status: u16) -> UpstreamError {
        let StripeErrorObject {
            message,
            code,
            kind,
        } = self.error;
        let message = message
            .or_else(|| code.clone())
            .unwrap_or_else(|| format!("Stripe API error (HTTP {status})"));

        UpstreamError::Provider {
            message,
            code,
            kind,
            status,
        }
    }
}
