//! Donation payment flow.
//!
//! A submission runs through four steps:
//! 1. validate the form locally (no network on failure)
//! 2. create an intent on the backend under a fresh idempotency key
//! 3. confirm the charge through the hosted [`CardWidget`]
//! 4. redirect on `succeeded`, or capture first on `requires_capture`
//!
//! At most one submission is in flight per controller. Clicks landing inside
//! the debounce window replace each other, and only the last one runs.

pub mod validation;
pub mod widget;

pub use validation::{validate, DonationForm, DonationLimits, ValidDonation, ValidationError};
pub use widget::{BillingDetails, CardError, CardWidget, ConfirmedIntent, CARD_ERROR_TYPE};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use url::Url;
use uuid::Uuid;

use crate::api::{
    ApiClient, ApiError, CreateIntentRequest, DonationSource, IntentMetadata, IntentStatus,
    PaymentsClient,
};
use crate::config::{PaymentsConfig, SiteConfig};
use crate::error::{SiteError, SiteResult};
use crate::page::{FormId, Notification, Page};

const FALLBACK_FAILURE: &str = "Payment failed. Please try again.";
const METADATA_SOURCE: &str = "website";

/// How a call to [`PaymentController::submit`] ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// A later click inside the debounce window took over.
    Superseded,
    /// Another submission was still in flight.
    AlreadyInProgress,
    /// The payment system failed to initialize.
    Unavailable,
    /// Rejected locally; nothing was sent.
    Invalid(ValidationError),
    /// Charge completed and the page was sent to the success URL.
    Redirected(Url),
    /// Confirmation ended in a status that needs no action from the page.
    Pending(IntentStatus),
    /// Authorized but the capture call failed.
    CaptureFailed(String),
    /// Backend or card failure, with the message shown to the donor.
    Failed(String),
}

#[derive(Debug, Error)]
enum PaymentError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Card(#[from] CardError),
}

impl PaymentError {
    fn user_message(&self) -> String {
        match self {
            Self::Api(err) if err.is_network() => {
                "Network error. Please check your connection.".to_string()
            }
            Self::Api(err) => match err.status() {
                Some(400) => err
                    .server_message()
                    .unwrap_or("Invalid payment details")
                    .to_string(),
                Some(404) => "Payment endpoint not found. Please contact support.".to_string(),
                _ => err
                    .server_message()
                    .unwrap_or("Payment processing failed")
                    .to_string(),
            },
            Self::Card(err) => match err.user_message() {
                Some(msg) => msg.to_string(),
                None if !err.message.trim().is_empty() => err.message.clone(),
                None => FALLBACK_FAILURE.to_string(),
            },
        }
    }
}

/// Wording for a failed capture, keyed on what the backend said.
fn capture_failure_message(raw: &str) -> &'static str {
    let raw = raw.to_lowercase();
    if raw.contains("already captured") {
        "Payment was already processed"
    } else if raw.contains("expired") {
        "Payment authorization expired"
    } else {
        "Payment processing failed"
    }
}

/// Per-session state. Never persisted.
#[derive(Debug, Default)]
struct PaymentState {
    in_flight: bool,
    idempotency_key: Option<Uuid>,
    client_secret: Option<String>,
    contribution_id: Option<String>,
    source: DonationSource,
    card_mounted: bool,
    initialization_error: Option<String>,
}

pub struct PaymentController {
    api: PaymentsClient,
    widget: Arc<dyn CardWidget>,
    page: Arc<dyn Page>,
    config: PaymentsConfig,
    success_base: Url,
    state: Mutex<PaymentState>,
    debounce_ticket: AtomicU64,
}

impl PaymentController {
    /// Build a controller. Missing configuration is fatal: the banner is shown
    /// and no controller is returned.
    pub fn new(
        api: &ApiClient,
        widget: Arc<dyn CardWidget>,
        page: Arc<dyn Page>,
        site: &SiteConfig,
        config: PaymentsConfig,
    ) -> SiteResult<Self> {
        let key_missing = config
            .publishable_key
            .as_deref()
            .map_or(true, |key| key.trim().is_empty());
        if key_missing {
            error!("payments.publishable_key is not set");
            page.show_fatal_banner("Payment configuration incomplete");
            return Err(SiteError::ConfigError(
                "missing payments.publishable_key".to_string(),
            ));
        }

        let success_base = Url::parse(&site.origin)
            .and_then(|origin| origin.join(&site.success_path))
            .map_err(|err| {
                error!(origin = %site.origin, path = %site.success_path, "bad success page: {err}");
                page.show_fatal_banner("Payment configuration incomplete");
                SiteError::ConfigError(format!("invalid success page url: {err}"))
            })?;

        Ok(Self {
            api: api.payments(),
            widget,
            page,
            config,
            success_base,
            state: Mutex::new(PaymentState::default()),
            debounce_ticket: AtomicU64::new(0),
        })
    }

    /// Bring up the widget. On failure the banner stays and every later
    /// attempt to open the form reports the system as unavailable.
    pub async fn initialize(&self) -> SiteResult<()> {
        if let Err(err) = self.widget.create_elements().await {
            error!("card widget failed to initialize: {err}");
            self.page.show_fatal_banner("Payment processor unavailable");
            self.state.lock().await.initialization_error = Some(err.message.clone());
            return Err(SiteError::Internal(format!(
                "payment processor unavailable: {err}"
            )));
        }
        Ok(())
    }

    pub fn limits(&self) -> DonationLimits {
        DonationLimits::from(&self.config)
    }

    /// Show the donation form for the given button and mount a fresh card input.
    pub async fn open_form(&self, source: DonationSource) -> bool {
        {
            let mut state = self.state.lock().await;
            if state.initialization_error.is_some() {
                drop(state);
                self.page.notify(Notification::error("Payment system unavailable"));
                return false;
            }
            state.source = source;
        }

        self.page.set_donation_form_visible(true);
        self.clear_card().await;

        if let Err(err) = self.ensure_card_mounted().await {
            warn!("card element initialization failed: {err}");
            self.page
                .notify(Notification::error("Payment form error. Please refresh the page."));
            return false;
        }
        true
    }

    pub async fn close_form(&self) {
        self.page.set_donation_form_visible(false);
        self.clear_card().await;
    }

    /// Handle a click on the pay button.
    pub async fn submit(&self, form: DonationForm) -> SubmitOutcome {
        if let Some(outcome) = self.refuse_early().await {
            return outcome;
        }

        let ticket = self.debounce_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.config.debounce()).await;
        if self.debounce_ticket.load(Ordering::SeqCst) != ticket {
            debug!(ticket, "donation click superseded");
            return SubmitOutcome::Superseded;
        }

        {
            let mut state = self.state.lock().await;
            if state.in_flight {
                drop(state);
                self.info("Payment already in progress");
                return SubmitOutcome::AlreadyInProgress;
            }
            state.in_flight = true;
        }
        self.page.set_submit_enabled(FormId::Donation, false);

        let outcome = match self.process(form).await {
            Ok(outcome) => outcome,
            Err(err) => {
                let message = err.user_message();
                warn!("payment submission failed: {err}");
                self.page.notify(Notification::error(message.clone()));
                SubmitOutcome::Failed(message)
            }
        };

        self.page.set_submit_enabled(FormId::Donation, true);
        self.state.lock().await.in_flight = false;
        outcome
    }

    pub async fn in_flight(&self) -> bool {
        self.state.lock().await.in_flight
    }

    /// Key used for the most recent intent creation.
    pub async fn idempotency_key(&self) -> Option<Uuid> {
        self.state.lock().await.idempotency_key
    }

    pub async fn contribution_id(&self) -> Option<String> {
        self.state.lock().await.contribution_id.clone()
    }

    async fn refuse_early(&self) -> Option<SubmitOutcome> {
        let state = self.state.lock().await;
        if state.in_flight {
            drop(state);
            self.info("Payment already in progress");
            return Some(SubmitOutcome::AlreadyInProgress);
        }
        if state.initialization_error.is_some() {
            drop(state);
            self.page.notify(Notification::error("Payment system unavailable"));
            return Some(SubmitOutcome::Unavailable);
        }
        None
    }

    async fn process(&self, form: DonationForm) -> Result<SubmitOutcome, PaymentError> {
        let donation = match validate(&form, self.limits()) {
            Ok(donation) => donation,
            Err(err) => {
                debug!("donation rejected: {err}");
                self.page.notify(Notification::error(err.to_string()));
                return Ok(SubmitOutcome::Invalid(err));
            }
        };

        let key = Uuid::new_v4();
        let source = {
            let mut state = self.state.lock().await;
            state.idempotency_key = Some(key);
            state.source
        };
        self.info("Processing payment...");

        let client = self.page.client_info();
        let req = CreateIntentRequest {
            amount: donation.amount_minor,
            currency: self.config.currency.clone(),
            email: donation.email.clone(),
            name: donation.name.clone(),
            receipt_email: donation.email.clone(),
            metadata: IntentMetadata {
                source: METADATA_SOURCE.to_string(),
                donation_source: source,
                browser: client.user_agent.clone(),
                screen_resolution: client.screen_resolution(),
            },
        };

        let created = self.api.create_intent(&req, &key.to_string()).await?;
        {
            let mut state = self.state.lock().await;
            state.client_secret = Some(created.client_secret.clone());
            state.contribution_id = created.contribution_id.clone();
        }
        info!(%key, amount = donation.amount_minor, "payment intent created");

        self.ensure_card_mounted().await?;
        let billing = BillingDetails {
            email: donation.email,
            name: donation.name,
        };
        let intent = self
            .widget
            .confirm_card_payment(&created.client_secret, &billing)
            .await?;
        info!(intent = %intent.id, status = %intent.status, "payment confirmed");

        let contribution = created.contribution_id.as_deref();
        let outcome = match intent.status {
            IntentStatus::Succeeded => {
                self.page.notify(Notification::success("Payment succeeded!"));
                self.redirect(self.success_url(&intent.id, contribution)).await
            }
            IntentStatus::RequiresCapture => {
                self.info("Payment authorized! Capturing funds...");
                self.capture(&intent.id, contribution).await
            }
            other => {
                self.info(&format!("Payment status: {other}"));
                SubmitOutcome::Pending(other)
            }
        };
        Ok(outcome)
    }

    async fn capture(&self, intent_id: &str, contribution: Option<&str>) -> SubmitOutcome {
        self.info("Finalizing payment...");
        match self.api.capture(intent_id).await {
            Ok(_) => {
                self.page
                    .notify(Notification::success("Payment completed successfully!"));
                self.redirect(self.success_url(intent_id, contribution)).await
            }
            Err(err) => {
                let raw = err
                    .server_message()
                    .map(str::to_owned)
                    .unwrap_or_else(|| err.to_string());
                let message = capture_failure_message(&raw);
                warn!(intent = %intent_id, "capture failed: {raw}");
                self.page.notify(Notification::error(message));
                SubmitOutcome::CaptureFailed(message.to_string())
            }
        }
    }

    async fn redirect(&self, url: Url) -> SubmitOutcome {
        tokio::time::sleep(self.config.redirect_delay()).await;
        self.page.redirect(&url);
        SubmitOutcome::Redirected(url)
    }

    /// `<origin>/<success-path>?payment_intent=<id>&contribution_id=<id>`
    pub fn success_url(&self, intent_id: &str, contribution_id: Option<&str>) -> Url {
        let mut url = self.success_base.clone();
        url.query_pairs_mut()
            .clear()
            .append_pair("payment_intent", intent_id)
            .append_pair("contribution_id", contribution_id.unwrap_or(""));
        url
    }

    /// The state lock is not held across widget calls, so status checks and
    /// refusals stay responsive while a mount is slow.
    async fn ensure_card_mounted(&self) -> Result<(), CardError> {
        if self.state.lock().await.card_mounted {
            return Ok(());
        }
        self.widget.clear_card();
        self.widget.create_elements().await?;
        self.widget.mount_card(&self.config.card_container).await?;
        self.state.lock().await.card_mounted = true;
        Ok(())
    }

    async fn clear_card(&self) {
        self.widget.clear_card();
        self.state.lock().await.card_mounted = false;
    }

    fn info(&self, message: &str) {
        self.page.notify(
            Notification::info(message).dismiss_after(self.config.notification_timeout()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn backend_errors_map_to_donor_messages() {
        let bad = PaymentError::Api(ApiError::Status {
            status: 400,
            message: "x".into(),
            body: json!({"error": "Amount below minimum"}),
        });
        assert_eq!(bad.user_message(), "Amount below minimum");

        let bad_plain = PaymentError::Api(ApiError::Status {
            status: 400,
            message: "x".into(),
            body: json!({}),
        });
        assert_eq!(bad_plain.user_message(), "Invalid payment details");

        let missing = PaymentError::Api(ApiError::Status {
            status: 404,
            message: "x".into(),
            body: json!({"error": "no route"}),
        });
        assert_eq!(
            missing.user_message(),
            "Payment endpoint not found. Please contact support."
        );

        let server = PaymentError::Api(ApiError::Status {
            status: 502,
            message: "x".into(),
            body: serde_json::Value::Null,
        });
        assert_eq!(server.user_message(), "Payment processing failed");

        let timeout = PaymentError::Api(ApiError::Timeout(std::time::Duration::from_secs(8)));
        assert_eq!(
            timeout.user_message(),
            "Network error. Please check your connection."
        );
    }

    #[test]
    fn card_errors_fall_back_to_raw_then_generic() {
        let raw = PaymentError::Card(CardError::new("Widget not ready"));
        assert_eq!(raw.user_message(), "Widget not ready");

        let empty = PaymentError::Card(CardError::new(""));
        assert_eq!(empty.user_message(), FALLBACK_FAILURE);
    }

    #[test]
    fn capture_messages() {
        assert_eq!(
            capture_failure_message("PaymentIntent has already captured funds"),
            "Payment was already processed"
        );
        assert_eq!(
            capture_failure_message("authorization expired"),
            "Payment authorization expired"
        );
        assert_eq!(capture_failure_message("boom"), "Payment processing failed");
    }
}
