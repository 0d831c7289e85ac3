//! Types stored in the server-side session.
//!
//! The browser only holds the session cookie. The API bearer token, the
//! signed-in officer and pending flash toasts live here.

use serde::{Deserialize, Serialize};

use cms_core::records::UserProfile;
use cms_core::{Email, Role, UserId};

/// Session-stored officer identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentOfficer {
    pub id: UserId,
    pub email: Email,
    pub full_name: String,
    pub role: Role,
    pub badge_number: Option<String>,
}

impl From<&UserProfile> for CurrentOfficer {
    fn from(user: &UserProfile) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            role: user.role,
            badge_number: user.badge_number.clone(),
        }
    }
}

/// Toast severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashKind {
    Success,
    Error,
    Info,
}

impl FlashKind {
    /// CSS modifier class for the toast.
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Success => "toast-success",
            Self::Error => "toast-error",
            Self::Info => "toast-info",
        }
    }
}

/// A one-shot notification shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Info,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn css_class(&self) -> &'static str {
        self.kind.css_class()
    }
}

/// Session keys.
pub mod keys {
    /// The signed-in officer ([`super::CurrentOfficer`]).
    pub const CURRENT_OFFICER: &str = "current_officer";

    /// The API bearer token.
    pub const API_TOKEN: &str = "api_token";

    /// Pending flash toasts.
    pub const FLASH: &str = "flash";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn test_current_officer_from_profile() {
        let profile = UserProfile {
            id: UserId::generate(),
            email: Email::parse("abebe@police.et").unwrap(),
            full_name: "Abebe Kebede".into(),
            badge_number: Some("FO-1021".into()),
            role: Role::FieldOfficer,
            department: Some("Border Unit".into()),
            phone: None,
            is_active: true,
            created_at: Utc::now(),
        };
        let officer = CurrentOfficer::from(&profile);
        assert_eq!(officer.id, profile.id);
        assert_eq!(officer.role, Role::FieldOfficer);
        assert_eq!(officer.badge_number.as_deref(), Some("FO-1021"));
    }

    #[test]
    fn test_flash_serializes_for_the_session_store() {
        let flash = Flash::error("Could not load messages");
        let json = serde_json::to_value(&flash).unwrap();
        assert_eq!(json["kind"], "error");
        assert_eq!(flash.css_class(), "toast-error");
        let back: Flash = serde_json::from_value(json).unwrap();
        assert_eq!(back, flash);
    }
}
