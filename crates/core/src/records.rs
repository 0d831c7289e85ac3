//! Records exchanged over the REST API.
//!
//! The API serializes these and the web console deserializes them, so both
//! sides agree on one definition of every payload.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{
    AuditLogId, CategoryId, ContrabandId, CustodyRecordId, Email, EvidenceFileId, ItemStatus,
    MessageId, MessageType, Priority, RiskLevel, Role, UserId,
};

// =============================================================================
// Users
// =============================================================================

/// A user account as visible to other officers. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: Email,
    pub full_name: String,
    pub badge_number: Option<String>,
    pub role: Role,
    pub department: Option<String>,
    pub phone: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Officer name and badge embedded in item and custody payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfficerRef {
    pub full_name: String,
    pub badge_number: Option<String>,
}

/// Officer summary embedded in messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrespondentRef {
    pub full_name: String,
    pub role: Role,
    pub badge_number: Option<String>,
}

/// Payload for `POST /auth/register` and `POST /users`.
#[derive(Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub full_name: String,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub badge_number: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("full_name", &self.full_name)
            .field("role", &self.role)
            .field("badge_number", &self.badge_number)
            .field("department", &self.department)
            .field("phone", &self.phone)
            .finish()
    }
}

/// Partial update for `PUT /users/{id}`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl UserUpdate {
    /// Whether the update would change nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.badge_number.is_none()
            && self.role.is_none()
            && self.department.is_none()
            && self.phone.is_none()
            && self.is_active.is_none()
    }
}

// =============================================================================
// Auth
// =============================================================================

/// Payload for `POST /auth/login`.
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Response of `POST /auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

/// Response of endpoints that only report the new record's id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedId {
    pub id: Uuid,
}

/// JSON error body returned by the API on every failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

// =============================================================================
// Contraband
// =============================================================================

/// Contraband category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub risk_level: RiskLevel,
}

/// Category name and risk embedded in item payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub name: String,
    pub risk_level: RiskLevel,
}

/// A seized item with its category and seizing officer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContrabandItem {
    pub id: ContrabandId,
    pub seizure_number: String,
    pub category_id: Option<CategoryId>,
    pub item_name: String,
    pub description: Option<String>,
    pub quantity: Decimal,
    pub unit: Option<String>,
    pub estimated_value: Option<Decimal>,
    pub weight_kg: Option<Decimal>,
    pub status: ItemStatus,
    pub seizure_date: DateTime<Utc>,
    pub seizure_location: String,
    pub gps_latitude: Option<f64>,
    pub gps_longitude: Option<f64>,
    pub seized_by: Option<UserId>,
    pub case_number: Option<String>,
    pub court_case_number: Option<String>,
    pub barcode: Option<String>,
    pub rfid_tag: Option<String>,
    pub storage_location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub category: Option<CategoryRef>,
    pub seized_by_user: Option<OfficerRef>,
}

impl ContrabandItem {
    /// Name of the seizing officer, or an empty string when unknown.
    #[must_use]
    pub fn seized_by_name(&self) -> &str {
        self.seized_by_user
            .as_ref()
            .map_or("", |officer| officer.full_name.as_str())
    }
}

/// Payload for `POST /contraband-items`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NewContrabandItem {
    #[serde(default)]
    pub seizure_number: Option<String>,
    pub category_id: Option<CategoryId>,
    pub item_name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub quantity: Decimal,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub estimated_value: Option<Decimal>,
    #[serde(default)]
    pub weight_kg: Option<Decimal>,
    pub seizure_location: String,
    #[serde(default)]
    pub seizure_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub gps_latitude: Option<f64>,
    #[serde(default)]
    pub gps_longitude: Option<f64>,
    #[serde(default)]
    pub case_number: Option<String>,
    #[serde(default)]
    pub court_case_number: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub rfid_tag: Option<String>,
    #[serde(default)]
    pub storage_location: Option<String>,
}

/// Payload for `PUT /contraband-items/{id}/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: ItemStatus,
}

/// Seizure number and item name embedded in message payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContrabandRef {
    pub seizure_number: String,
    pub item_name: String,
}

// =============================================================================
// Custody
// =============================================================================

/// One link in an item's chain of custody.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustodyRecord {
    pub id: CustodyRecordId,
    pub contraband_id: ContrabandId,
    pub from_user_id: Option<UserId>,
    pub to_user_id: UserId,
    pub transfer_reason: String,
    pub transfer_date: DateTime<Utc>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub from_user: Option<OfficerRef>,
    pub to_user: Option<OfficerRef>,
}

/// Payload for `POST /custody/transfers`. The sender is always the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustodyTransfer {
    pub contraband_id: ContrabandId,
    pub to_user_id: UserId,
    pub transfer_reason: String,
    pub location: String,
    #[serde(default)]
    pub notes: Option<String>,
}

// =============================================================================
// Messages
// =============================================================================

/// An internal message with both correspondents and the referenced item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub from_user_id: UserId,
    pub to_user_id: UserId,
    pub subject: String,
    pub content: String,
    pub priority: Priority,
    pub message_type: MessageType,
    pub contraband_id: Option<ContrabandId>,
    pub parent_message_id: Option<MessageId>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub requires_response: bool,
    pub created_at: DateTime<Utc>,
    pub from_user: Option<CorrespondentRef>,
    pub to_user: Option<CorrespondentRef>,
    pub contraband: Option<ContrabandRef>,
}

impl Message {
    /// Sender name, or an empty string when unknown.
    #[must_use]
    pub fn sender_name(&self) -> &str {
        self.from_user.as_ref().map_or("", |u| u.full_name.as_str())
    }

    /// Recipient name, or an empty string when unknown.
    #[must_use]
    pub fn recipient_name(&self) -> &str {
        self.to_user.as_ref().map_or("", |u| u.full_name.as_str())
    }
}

/// Payload for `POST /messages`. The sender is always the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    pub to_user_id: UserId,
    pub subject: String,
    pub content: String,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub message_type: Option<MessageType>,
    #[serde(default)]
    pub contraband_id: Option<ContrabandId>,
    #[serde(default)]
    pub parent_message_id: Option<MessageId>,
    #[serde(default)]
    pub requires_response: Option<bool>,
}

// =============================================================================
// Audit
// =============================================================================

/// An audit trail entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: AuditLogId,
    pub user_id: Option<UserId>,
    pub action: String,
    pub table_name: String,
    pub record_id: Option<String>,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub user: Option<OfficerRef>,
}

impl AuditLog {
    /// Name of the acting user, or `System` for rows without one.
    #[must_use]
    pub fn actor_name(&self) -> &str {
        self.user.as_ref().map_or("System", |u| u.full_name.as_str())
    }
}

// =============================================================================
// Evidence files
// =============================================================================

/// Metadata of an uploaded evidence file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceFile {
    pub id: EvidenceFileId,
    pub contraband_id: ContrabandId,
    pub file_name: String,
    pub file_type: Option<String>,
    pub file_size: Option<i64>,
    pub file_url: String,
    pub uploaded_by: Option<UserId>,
    pub description: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

/// Response of `POST /files/upload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub file_url: String,
    pub file_name: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_debug_redacts_password() {
        let user = NewUser {
            email: "officer@police.et".into(),
            password: "hunter2hunter2".into(),
            full_name: "Tadesse Bekele".into(),
            role: None,
            badge_number: None,
            department: None,
            phone: None,
        };
        let debug = format!("{user:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_user_update_skips_absent_fields() {
        let update = UserUpdate {
            is_active: Some(false),
            ..UserUpdate::default()
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            serde_json::json!({ "is_active": false })
        );
        assert!(!update.is_empty());
        assert!(UserUpdate::default().is_empty());
    }

    #[test]
    fn test_new_message_defaults_are_optional() {
        let json = serde_json::json!({
            "to_user_id": "6f1c1b0e-8d8a-4f5e-9b43-2a7c4d1e9f00",
            "subject": "Transfer",
            "content": "Please confirm",
        });
        let message: NewMessage = serde_json::from_value(json).unwrap();
        assert_eq!(message.priority, None);
        assert_eq!(message.requires_response, None);
    }

    #[test]
    fn test_audit_actor_falls_back_to_system() {
        let log = AuditLog {
            id: AuditLogId::generate(),
            user_id: None,
            action: "CREATE_SEIZURE".into(),
            table_name: "contraband_items".into(),
            record_id: None,
            old_values: None,
            new_values: None,
            ip_address: None,
            created_at: Utc::now(),
            user: None,
        };
        assert_eq!(log.actor_name(), "System");
    }
}
