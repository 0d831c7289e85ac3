//! Status and classification enums for contraband items and messages.

use serde::{Deserialize, Serialize};

use super::role::{ParseEnumError, normalize_variant};

/// Lifecycle status of a seized item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "cms.item_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[default]
    Seized,
    InCustody,
    UnderInvestigation,
    PendingDestruction,
    Destroyed,
    Released,
}

/// Why a status change was refused.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    /// The item already left the system.
    #[error("item is {0} and can no longer change status")]
    Terminal(ItemStatus),
    /// The requested status equals the current one.
    #[error("item is already {0}")]
    Unchanged(ItemStatus),
}

impl ItemStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::Seized,
        Self::InCustody,
        Self::UnderInvestigation,
        Self::PendingDestruction,
        Self::Destroyed,
        Self::Released,
    ];

    /// Wire name, e.g. `pending_destruction`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Seized => "seized",
            Self::InCustody => "in_custody",
            Self::UnderInvestigation => "under_investigation",
            Self::PendingDestruction => "pending_destruction",
            Self::Destroyed => "destroyed",
            Self::Released => "released",
        }
    }

    /// Human label, e.g. `Pending Destruction`.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Seized => "Seized",
            Self::InCustody => "In Custody",
            Self::UnderInvestigation => "Under Investigation",
            Self::PendingDestruction => "Pending Destruction",
            Self::Destroyed => "Destroyed",
            Self::Released => "Released",
        }
    }

    /// Label used on report charts, e.g. `PENDING DESTRUCTION`.
    #[must_use]
    pub fn chart_label(self) -> String {
        self.as_str().replace('_', " ").to_uppercase()
    }

    /// Destroyed and released items are closed records.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Destroyed | Self::Released)
    }

    /// Check whether an item in this status may move to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::Terminal`] when `self` is terminal and
    /// [`TransitionError::Unchanged`] when `next == self`.
    pub const fn check_transition(self, next: Self) -> Result<(), TransitionError> {
        if self.is_terminal() {
            return Err(TransitionError::Terminal(self));
        }
        if self as u8 == next as u8 {
            return Err(TransitionError::Unchanged(self));
        }
        Ok(())
    }
}

/// Priority of an internal message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "cms.message_priority", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Self; 4] = [Self::Low, Self::Normal, Self::High, Self::Urgent];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Normal => "Normal",
            Self::High => "High",
            Self::Urgent => "Urgent",
        }
    }
}

/// Kind of an internal message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "cms.message_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    #[default]
    General,
    ApprovalRequest,
    StatusUpdate,
    Alert,
}

impl MessageType {
    pub const ALL: [Self; 4] = [
        Self::General,
        Self::ApprovalRequest,
        Self::StatusUpdate,
        Self::Alert,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::ApprovalRequest => "approval_request",
            Self::StatusUpdate => "status_update",
            Self::Alert => "alert",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::General => "General",
            Self::ApprovalRequest => "Approval Request",
            Self::StatusUpdate => "Status Update",
            Self::Alert => "Alert",
        }
    }
}

/// Risk classification of a contraband category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "cms.risk_level", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub const ALL: [Self; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }
}

macro_rules! impl_wire_str {
    ($ty:ty, $kind:literal) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = normalize_variant(s);
                Self::ALL
                    .into_iter()
                    .find(|v| v.as_str() == wanted)
                    .ok_or_else(|| ParseEnumError::new($kind, s))
            }
        }
    };
}

impl_wire_str!(ItemStatus, "status");
impl_wire_str!(Priority, "priority");
impl_wire_str!(MessageType, "message type");
impl_wire_str!(RiskLevel, "risk level");

/// Measurement unit offered on the seizure form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Kg,
    G,
    Pieces,
    Liters,
    Boxes,
}

impl Unit {
    pub const ALL: [Self; 5] = [Self::Kg, Self::G, Self::Pieces, Self::Liters, Self::Boxes];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Kg => "kg",
            Self::G => "g",
            Self::Pieces => "pieces",
            Self::Liters => "liters",
            Self::Boxes => "boxes",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Kg => "Kilograms",
            Self::G => "Grams",
            Self::Pieces => "Pieces",
            Self::Liters => "Liters",
            Self::Boxes => "Boxes",
        }
    }
}

impl_wire_str!(Unit, "unit");

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses_are_frozen() {
        for next in ItemStatus::ALL {
            assert_eq!(
                ItemStatus::Destroyed.check_transition(next),
                Err(TransitionError::Terminal(ItemStatus::Destroyed))
            );
            assert!(ItemStatus::Released.check_transition(next).is_err());
        }
    }

    #[test]
    fn test_open_statuses_move_anywhere_else() {
        assert!(ItemStatus::Seized.check_transition(ItemStatus::InCustody).is_ok());
        assert!(
            ItemStatus::UnderInvestigation
                .check_transition(ItemStatus::Released)
                .is_ok()
        );
        assert!(
            ItemStatus::PendingDestruction
                .check_transition(ItemStatus::Destroyed)
                .is_ok()
        );
        assert_eq!(
            ItemStatus::InCustody.check_transition(ItemStatus::InCustody),
            Err(TransitionError::Unchanged(ItemStatus::InCustody))
        );
    }

    #[test]
    fn test_chart_label() {
        assert_eq!(ItemStatus::InCustody.chart_label(), "IN CUSTODY");
        assert_eq!(ItemStatus::Seized.chart_label(), "SEIZED");
    }

    #[test]
    fn test_parse_wire_and_label_forms() {
        assert_eq!(
            "pending_destruction".parse::<ItemStatus>().unwrap(),
            ItemStatus::PendingDestruction
        );
        assert_eq!(
            "Approval Request".parse::<MessageType>().unwrap(),
            MessageType::ApprovalRequest
        );
        assert_eq!("URGENT".parse::<Priority>().unwrap(), Priority::Urgent);
        assert_eq!("kg".parse::<Unit>().unwrap(), Unit::Kg);
        assert!("lost".parse::<ItemStatus>().is_err());
    }

    #[test]
    fn test_defaults() {
        assert_eq!(ItemStatus::default(), ItemStatus::Seized);
        assert_eq!(Priority::default(), Priority::Normal);
        assert_eq!(MessageType::default(), MessageType::General);
    }
}
