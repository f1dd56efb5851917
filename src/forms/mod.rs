//! Contact and children's registration forms.

pub mod contact;
pub mod registration;

pub use contact::{validate_contact, ContactController};
pub use registration::{validate_registration, RegistrationController};

/// How a form submission ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormOutcome {
    /// Ignored: another submission is running or one just went out.
    Dropped,
    /// Rejected locally with the message shown.
    Invalid(String),
    /// Accepted by the backend, with the message shown.
    Submitted(String),
    /// Backend or network failure, with the message shown.
    Failed(String),
}
