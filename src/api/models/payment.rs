//! Payment intent models.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::lenient_id;

/// Which donate button opened the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DonationSource {
    #[default]
    MainButton,
    FormFooter,
}

impl DonationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MainButton => "main_button",
            Self::FormFooter => "form_footer",
        }
    }
}

impl fmt::Display for DonationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata attached to every intent the site creates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentMetadata {
    pub source: String,
    pub donation_source: DonationSource,
    pub browser: String,
    pub screen_resolution: String,
}

/// Body of `POST /api/payments/intents`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateIntentRequest {
    /// Minor currency units.
    pub amount: u64,
    pub currency: String,
    pub email: String,
    pub name: String,
    pub receipt_email: String,
    pub metadata: IntentMetadata,
}

/// Response of `POST /api/payments/intents`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedIntent {
    pub client_secret: String,
    #[serde(default, deserialize_with = "lenient_id")]
    pub contribution_id: Option<String>,
}

/// Body of `POST /api/payments/capture`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRequest {
    pub payment_intent_id: String,
}

/// Status of an intent after client-side confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum IntentStatus {
    Succeeded,
    RequiresCapture,
    Processing,
    RequiresAction,
    RequiresPaymentMethod,
    Canceled,
    Other(String),
}

impl IntentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Succeeded => "succeeded",
            Self::RequiresCapture => "requires_capture",
            Self::Processing => "processing",
            Self::RequiresAction => "requires_action",
            Self::RequiresPaymentMethod => "requires_payment_method",
            Self::Canceled => "canceled",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for IntentStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "succeeded" => Self::Succeeded,
            "requires_capture" => Self::RequiresCapture,
            "processing" => Self::Processing,
            "requires_action" => Self::RequiresAction,
            "requires_payment_method" => Self::RequiresPaymentMethod,
            "canceled" => Self::Canceled,
            _ => Self::Other(raw),
        }
    }
}

impl From<&str> for IntentStatus {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_string())
    }
}

impl From<IntentStatus> for String {
    fn from(status: IntentStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for IntentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
