use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::api::{ApiClient, ContactSubmission, FormsClient};
use crate::page::{FormId, Notification, Page};
use crate::sanitize::is_valid_email;

use super::FormOutcome;

const MIN_NAME_LENGTH: usize = 2;
const MAX_NAME_LENGTH: usize = 100;
const MIN_MESSAGE_LENGTH: usize = 10;
const MAX_MESSAGE_LENGTH: usize = 1000;

const THANK_YOU: &str = "Thank you for reaching out!  Your message is important to us. Please allow a few days for a response while we prepare personalized support for you.";

pub fn validate_contact(form: &ContactSubmission) -> Result<(), String> {
    let name_len = form.name.trim().chars().count();
    if name_len < MIN_NAME_LENGTH {
        return Err(format!("Name must be at least {MIN_NAME_LENGTH} characters"));
    }
    if form.name.chars().count() > MAX_NAME_LENGTH {
        return Err(format!("Name must be less than {MAX_NAME_LENGTH} characters"));
    }
    if !is_valid_email(&form.email) {
        return Err("Please enter a valid email address".to_string());
    }
    if form.subject.trim().is_empty() {
        return Err("Please select a subject".to_string());
    }
    if form.message.trim().chars().count() < MIN_MESSAGE_LENGTH {
        return Err(format!(
            "Message must be at least {MIN_MESSAGE_LENGTH} characters"
        ));
    }
    if form.message.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(format!(
            "Message must be less than {MAX_MESSAGE_LENGTH} characters"
        ));
    }
    Ok(())
}

#[derive(Debug, Default)]
struct ContactState {
    submitting: bool,
    last_submission: Option<Instant>,
}

pub struct ContactController {
    api: FormsClient,
    page: Arc<dyn Page>,
    min_interval: Duration,
    state: Mutex<ContactState>,
}

impl ContactController {
    pub fn new(api: &ApiClient, page: Arc<dyn Page>, min_interval: Duration) -> Self {
        Self {
            api: api.forms(),
            page,
            min_interval,
            state: Mutex::new(ContactState::default()),
        }
    }

    /// Submissions are dropped while one runs or within the minimum interval
    /// of the previous attempt, valid or not.
    pub async fn submit(&self, form: ContactSubmission) -> FormOutcome {
        {
            let mut state = self.state.lock().await;
            let now = Instant::now();
            let too_soon = state
                .last_submission
                .is_some_and(|last| now.duration_since(last) < self.min_interval);
            if state.submitting || too_soon {
                return FormOutcome::Dropped;
            }
            state.submitting = true;
            state.last_submission = Some(now);
        }

        self.page.set_submit_enabled(FormId::Contact, false);
        let outcome = self.send(trimmed(form)).await;
        self.page.set_submit_enabled(FormId::Contact, true);
        self.state.lock().await.submitting = false;
        outcome
    }

    async fn send(&self, form: ContactSubmission) -> FormOutcome {
        if let Err(message) = validate_contact(&form) {
            self.page.notify(Notification::error(message.clone()));
            return FormOutcome::Invalid(message);
        }

        match self.api.submit_contact(&form).await {
            Ok(_) => {
                info!(subject = %form.subject, "contact message sent");
                self.page.notify(Notification::success(THANK_YOU));
                self.page.reset_form(FormId::Contact);
                FormOutcome::Submitted(THANK_YOU.to_string())
            }
            Err(err) => {
                warn!("contact submission failed: {err}");
                let message = if err.is_network() {
                    "Network error. Please check your connection and try again."
                } else {
                    "Failed to send message. Please try again later."
                };
                self.page.notify(Notification::error(message));
                FormOutcome::Failed(message.to_string())
            }
        }
    }
}

fn trimmed(form: ContactSubmission) -> ContactSubmission {
    ContactSubmission {
        name: form.name.trim().to_string(),
        email: form.email.trim().to_string(),
        subject: form.subject,
        message: form.message.trim().to_string(),
    }
}
