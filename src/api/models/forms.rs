//! Contact and registration submissions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::error::body_message;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChildRegistration {
    pub child_name: String,
    pub father_name: String,
    pub mother_name: String,
    pub country: String,
    pub state: Option<String>,
    pub class_date: String,
    pub time_slot: String,
    pub start_time_utc: Option<String>,
    pub email: String,
    pub phone: String,
    pub church: Option<String>,
}

/// What the backend said after accepting a submission.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubmissionAck {
    pub message: Option<String>,
}

impl SubmissionAck {
    pub fn from_body(body: &Value) -> Self {
        Self {
            message: body_message(body).map(str::to_owned),
        }
    }
}
