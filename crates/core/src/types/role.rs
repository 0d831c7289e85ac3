//! Officer roles.

use serde::{Deserialize, Serialize};

/// Error returned when a string does not name a known enum variant.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct ParseEnumError {
    /// Which enum was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

/// Normalize free-form input (`"Field Officer"`, `"field-officer"`) to the
/// snake_case wire form.
pub(crate) fn normalize_variant(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

/// Role of a user account. Determines which pages and operations are available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "cms.user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full access, including user management and the audit trail.
    Admin,
    /// Oversees officers; sees reports.
    Supervisor,
    /// Registers seizures in the field.
    #[default]
    FieldOfficer,
    /// Manages evidence storage.
    WarehouseManager,
    /// Read-only compliance review.
    Auditor,
}

impl Role {
    /// Every role, in display order.
    pub const ALL: [Self; 5] = [
        Self::Admin,
        Self::Supervisor,
        Self::FieldOfficer,
        Self::WarehouseManager,
        Self::Auditor,
    ];

    /// Wire name, e.g. `field_officer`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Supervisor => "supervisor",
            Self::FieldOfficer => "field_officer",
            Self::WarehouseManager => "warehouse_manager",
            Self::Auditor => "auditor",
        }
    }

    /// Human label, e.g. `Field Officer`.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::Supervisor => "Supervisor",
            Self::FieldOfficer => "Field Officer",
            Self::WarehouseManager => "Warehouse Manager",
            Self::Auditor => "Auditor",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_variant(s).as_str() {
            "admin" => Ok(Self::Admin),
            "supervisor" => Ok(Self::Supervisor),
            "field_officer" => Ok(Self::FieldOfficer),
            "warehouse_manager" => Ok(Self::WarehouseManager),
            "auditor" => Ok(Self::Auditor),
            _ => Err(ParseEnumError::new("role", s)),
        }
    }
}
