//! Donation form validation.
//!
//! Runs before any network call; a failed check never reaches the backend.

use thiserror::Error;

use crate::config::PaymentsConfig;
use crate::sanitize::{escape_html, is_valid_email};

/// Raw values as typed into the donation form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DonationForm {
    pub email: String,
    pub amount: String,
    pub name: String,
}

impl DonationForm {
    pub fn new(email: impl Into<String>, amount: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            amount: amount.into(),
            name: name.into(),
        }
    }
}

/// A donation that passed every check.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidDonation {
    pub email: String,
    pub name: String,
    /// Major units as entered.
    pub amount: f64,
    /// Minor units sent to the backend.
    pub amount_minor: u64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Name must be {0} characters or less")]
    NameTooLong(usize),

    #[error("Email address is required")]
    EmailMissing,

    #[error("Please enter a valid email address")]
    EmailMalformed,

    #[error("Please enter a valid number")]
    AmountNotNumeric,

    #[error("Amount must be greater than zero")]
    AmountNotPositive,

    #[error("Maximum donation amount is ${0}")]
    AmountAboveCeiling(f64),
}

/// Limits applied to a donation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DonationLimits {
    pub max_amount: f64,
    pub max_name_length: usize,
}

impl From<&PaymentsConfig> for DonationLimits {
    fn from(cfg: &PaymentsConfig) -> Self {
        Self {
            max_amount: cfg.max_amount,
            max_name_length: cfg.max_name_length,
        }
    }
}

impl Default for DonationLimits {
    fn default() -> Self {
        Self::from(&PaymentsConfig::default())
    }
}

pub fn validate(form: &DonationForm, limits: DonationLimits) -> Result<ValidDonation, ValidationError> {
    let email = escape_html(&form.email);
    let name = match escape_html(&form.name) {
        name if name.is_empty() => "Anonymous".to_string(),
        name => name,
    };

    if name.chars().count() > limits.max_name_length {
        return Err(ValidationError::NameTooLong(limits.max_name_length));
    }

    if email.is_empty() {
        return Err(ValidationError::EmailMissing);
    }
    if !is_valid_email(&email) {
        return Err(ValidationError::EmailMalformed);
    }

    let amount = parse_amount(&form.amount)?;
    if amount <= 0.0 {
        return Err(ValidationError::AmountNotPositive);
    }
    if amount > limits.max_amount {
        return Err(ValidationError::AmountAboveCeiling(limits.max_amount));
    }

    // Sub-cent amounts round to nothing in minor units.
    let amount_minor = (amount * 100.0).round() as u64;
    if amount_minor == 0 {
        return Err(ValidationError::AmountNotPositive);
    }

    Ok(ValidDonation {
        email,
        name,
        amount,
        amount_minor,
    })
}

/// An empty field counts as zero.
fn parse_amount(raw: &str) -> Result<f64, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0.0);
    }
    match raw.parse::<f64>() {
        Ok(value) if !value.is_nan() => Ok(value),
        _ => Err(ValidationError::AmountNotNumeric),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(email: &str, amount: &str, name: &str) -> Result<ValidDonation, ValidationError> {
        validate(&DonationForm::new(email, amount, name), DonationLimits::default())
    }

    #[test]
    fn accepts_and_converts_to_minor_units() {
        let ok = check(" donor@example.org ", "19.99", "Abebe").unwrap();
        assert_eq!(ok.email, "donor@example.org");
        assert_eq!(ok.amount_minor, 1999);
        assert_eq!(ok.name, "Abebe");
    }

    #[test]
    fn blank_name_becomes_anonymous() {
        assert_eq!(check("a@b.co", "5", "   ").unwrap().name, "Anonymous");
    }

    #[test]
    fn amount_bounds() {
        assert_eq!(check("a@b.co", "0", "x"), Err(ValidationError::AmountNotPositive));
        assert_eq!(check("a@b.co", "-3", "x"), Err(ValidationError::AmountNotPositive));
        assert_eq!(check("a@b.co", "", "x"), Err(ValidationError::AmountNotPositive));
        assert_eq!(check("a@b.co", "abc", "x"), Err(ValidationError::AmountNotNumeric));
        assert_eq!(check("a@b.co", "NaN", "x"), Err(ValidationError::AmountNotNumeric));
        assert_eq!(
            check("a@b.co", "10000.01", "x"),
            Err(ValidationError::AmountAboveCeiling(10_000.0))
        );
        assert!(check("a@b.co", "10000", "x").is_ok());
    }

    #[test]
    fn amount_rounding_to_zero_cents_is_not_positive() {
        assert_eq!(check("a@b.co", "0.004", "x"), Err(ValidationError::AmountNotPositive));
        assert_eq!(check("a@b.co", "0.005", "x").unwrap().amount_minor, 1);
        assert_eq!(check("a@b.co", "0.01", "x").unwrap().amount_minor, 1);
    }

    #[test]
    fn email_checked_before_amount() {
        assert_eq!(check("", "abc", "x"), Err(ValidationError::EmailMissing));
        assert_eq!(check("nope", "0", "x"), Err(ValidationError::EmailMalformed));
    }

    #[test]
    fn long_name_is_rejected_first() {
        let name = "n".repeat(256);
        assert_eq!(check("", "", &name), Err(ValidationError::NameTooLong(255)));
    }

    #[test]
    fn messages_read_like_the_form() {
        assert_eq!(
            ValidationError::AmountAboveCeiling(10_000.0).to_string(),
            "Maximum donation amount is $10000"
        );
        assert_eq!(
            ValidationError::NameTooLong(255).to_string(),
            "Name must be 255 characters or less"
        );
    }
}
