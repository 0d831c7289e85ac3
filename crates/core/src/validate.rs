//! Form validation shared by the API and the console.

use std::fmt;

use crate::records::{NewCustodyTransfer, NewMessage, NewUser};
use crate::types::Email;

/// Minimum password length for user accounts.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum length of free-text single-line fields.
pub const MAX_LINE_LENGTH: usize = 255;

/// A problem with one form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// All problems found in a submitted form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    /// Whether `field` has at least one error.
    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    /// Record an error when `value` is blank.
    pub fn require(&mut self, field: &'static str, label: &str, value: &str) {
        if value.trim().is_empty() {
            self.push(field, format!("{label} is required"));
        } else if value.trim().chars().count() > MAX_LINE_LENGTH && field != "description" {
            self.push(field, format!("{label} must be at most {MAX_LINE_LENGTH} characters"));
        }
    }

    /// `Ok(value)` when no errors were recorded.
    ///
    /// # Errors
    ///
    /// Returns `self` when any error was recorded.
    pub fn finish<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.0.iter().map(|e| e.message.as_str()).collect();
        f.write_str(&messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Trim a free-text field, mapping blank input to `None`.
#[must_use]
pub fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

/// Validate a new account (registration or admin creation).
///
/// # Errors
///
/// Returns every problem found: invalid email, blank name, short password.
pub fn validate_new_user(user: &NewUser) -> Result<Email, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let email = match Email::parse(&user.email) {
        Ok(email) => Some(email),
        Err(e) => {
            errors.push("email", e.to_string());
            None
        }
    };
    errors.require("full_name", "Full name", &user.full_name);
    if user.password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.push(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LENGTH} characters"),
        );
    }
    match email {
        Some(email) => errors.finish(email),
        None => Err(errors),
    }
}

/// Validate an outgoing message.
///
/// # Errors
///
/// Returns an error for a blank subject or blank content.
pub fn validate_message(message: &NewMessage) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    errors.require("subject", "Subject", &message.subject);
    if message.content.trim().is_empty() {
        errors.push("content", "Message content is required");
    }
    errors.finish(())
}

/// Validate a custody transfer.
///
/// # Errors
///
/// Returns an error for a blank reason or blank location.
pub fn validate_transfer(transfer: &NewCustodyTransfer) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    errors.require("transfer_reason", "Transfer reason", &transfer.transfer_reason);
    errors.require("location", "Location", &transfer.location);
    errors.finish(())
}

/// Whether a transfer reason sends the item towards destruction.
#[must_use]
pub fn is_destruction_transfer(reason: &str) -> bool {
    reason.to_lowercase().contains("destruction")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{ContrabandId, UserId};

    fn new_user(email: &str, name: &str, password: &str) -> NewUser {
        NewUser {
            email: email.into(),
            password: password.into(),
            full_name: name.into(),
            role: None,
            badge_number: None,
            department: None,
            phone: None,
        }
    }

    #[test]
    fn test_valid_user_returns_normalized_email() {
        let email = validate_new_user(&new_user("Hanna@Police.ET", "Hanna Girma", "s3cure-pass")).unwrap();
        assert_eq!(email.as_str(), "hanna@police.et");
    }

    #[test]
    fn test_invalid_user_reports_every_field() {
        let errors = validate_new_user(&new_user("nope", "  ", "short")).unwrap_err();
        assert!(errors.has("email"));
        assert!(errors.has("full_name"));
        assert!(errors.has("password"));
        assert_eq!(errors.errors().len(), 3);
    }

    #[test]
    fn test_transfer_requires_reason_and_location() {
        let transfer = NewCustodyTransfer {
            contraband_id: ContrabandId::generate(),
            to_user_id: UserId::generate(),
            transfer_reason: String::new(),
            location: " ".into(),
            notes: None,
        };
        let errors = validate_transfer(&transfer).unwrap_err();
        assert_eq!(
            errors.to_string(),
            "Transfer reason is required; Location is required"
        );
    }

    #[test]
    fn test_destruction_reason_detection() {
        assert!(is_destruction_transfer("Sent for DESTRUCTION"));
        assert!(is_destruction_transfer("pending destruction order"));
        assert!(!is_destruction_transfer("Court hearing"));
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank("  A-12 "), Some("A-12".into()));
        assert_eq!(non_blank("   "), None);
    }
}
