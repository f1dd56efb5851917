//! Boundary to the hosted card widget.
//!
//! Card numbers are entered into the widget and confirmed directly with the
//! payment network; this crate only ever sees the client secret and the
//! resulting intent.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::IntentStatus;

/// `type` reported by the processor for card failures.
pub const CARD_ERROR_TYPE: &str = "card_error";

/// Billing details forwarded with the confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingDetails {
    pub email: String,
    pub name: String,
}

/// Intent as returned by the widget after confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedIntent {
    pub id: String,
    pub status: IntentStatus,
}

/// Error raised by the widget or the processor behind it.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct CardError {
    pub code: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub message: String,
}

impl CardError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            kind: None,
            message: message.into(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Fixed wording for the failures donors can act on.
    pub fn user_message(&self) -> Option<&'static str> {
        match self.code.as_deref() {
            Some("payment_intent_authentication_failure") => {
                return Some("Payment authentication failed. Please try again.")
            }
            Some("card_declined") => {
                return Some("Your card was declined. Please try another payment method.")
            }
            Some("expired_card") => return Some("Card expired. Please use a different card."),
            _ => {}
        }
        if self.kind.as_deref() == Some(CARD_ERROR_TYPE) {
            return Some("Card error. Please check your details and try again.");
        }
        None
    }
}

/// Hosted tokenization widget handle.
#[async_trait]
pub trait CardWidget: Send + Sync {
    /// Prepare an elements group for a fresh card input.
    async fn create_elements(&self) -> Result<(), CardError>;

    /// Mount the card input into the element with id `container`.
    async fn mount_card(&self, container: &str) -> Result<(), CardError>;

    /// Remove any mounted card input.
    fn clear_card(&self);

    /// Collect the card from the mounted input and confirm the intent.
    async fn confirm_card_payment(
        &self,
        client_secret: &str,
        billing: &BillingDetails,
    ) -> Result<ConfirmedIntent, CardError>;
}
