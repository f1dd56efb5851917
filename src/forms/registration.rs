use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::api::{ApiClient, ChildRegistration, FormsClient};
use crate::page::{FormId, Notification, Page};
use crate::sanitize::is_valid_email;

use super::FormOutcome;

pub fn validate_registration(form: &ChildRegistration) -> Result<(), String> {
    let required = [
        ("child_name", &form.child_name),
        ("father_name", &form.father_name),
        ("mother_name", &form.mother_name),
        ("country", &form.country),
        ("class_date", &form.class_date),
        ("time_slot", &form.time_slot),
        ("email", &form.email),
        ("phone", &form.phone),
    ];
    if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
        return Err(format!("Please fill in the {} field", field.replacen('_', " ", 1)));
    }
    if !is_valid_email(&form.email) {
        return Err("Please enter a valid email address".to_string());
    }
    Ok(())
}

pub struct RegistrationController {
    api: FormsClient,
    page: Arc<dyn Page>,
    reset_delay: Duration,
    submitting: Mutex<bool>,
}

impl RegistrationController {
    pub fn new(api: &ApiClient, page: Arc<dyn Page>, reset_delay: Duration) -> Self {
        Self {
            api: api.forms(),
            page,
            reset_delay,
            submitting: Mutex::new(false),
        }
    }

    pub async fn submit(&self, form: ChildRegistration) -> FormOutcome {
        {
            let mut submitting = self.submitting.lock().await;
            if *submitting {
                return FormOutcome::Dropped;
            }
            *submitting = true;
        }

        let outcome = self.send(trimmed(form)).await;
        *self.submitting.lock().await = false;
        outcome
    }

    async fn send(&self, form: ChildRegistration) -> FormOutcome {
        if let Err(message) = validate_registration(&form) {
            self.page.notify(Notification::error(message.clone()));
            return FormOutcome::Invalid(message);
        }

        self.page.set_submit_enabled(FormId::Registration, false);
        let outcome = match self.api.register_child(&form).await {
            Ok(ack) => {
                let message = ack
                    .message
                    .unwrap_or_else(|| "Registration successful!".to_string());
                info!(class_date = %form.class_date, slot = %form.time_slot, "child registered");
                self.page.notify(Notification::success(message.clone()));
                tokio::time::sleep(self.reset_delay).await;
                self.page.reset_form(FormId::Registration);
                FormOutcome::Submitted(message)
            }
            Err(err) => {
                warn!("registration failed: {err}");
                let message = err
                    .server_message()
                    .unwrap_or("Registration failed. Please try again later.")
                    .to_string();
                self.page.notify(Notification::error(message.clone()));
                FormOutcome::Failed(message)
            }
        };
        self.page.set_submit_enabled(FormId::Registration, true);
        outcome
    }
}

fn trimmed(form: ChildRegistration) -> ChildRegistration {
    let optional = |value: Option<String>| {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };
    ChildRegistration {
        child_name: form.child_name.trim().to_string(),
        father_name: form.father_name.trim().to_string(),
        mother_name: form.mother_name.trim().to_string(),
        country: form.country,
        state: optional(form.state),
        class_date: form.class_date,
        time_slot: form.time_slot,
        start_time_utc: optional(form.start_time_utc),
        email: form.email.trim().to_string(),
        phone: form.phone.trim().to_string(),
        church: optional(form.church),
    }
}
