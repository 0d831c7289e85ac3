//! Record builders for unit tests.

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;

use cms_core::records::{
    AuditLog, CategoryRef, ContrabandItem, CorrespondentRef, Message, OfficerRef, UserProfile,
};
use cms_core::{
    AuditLogId, ContrabandId, Email, ItemStatus, MessageId, MessageType, Priority, RiskLevel, Role,
    UserId,
};

pub fn officer(name: &str, role: Role) -> UserProfile {
    let email = format!("{}@police.et", name.to_lowercase().replace(' ', "."));
    UserProfile {
        id: UserId::generate(),
        email: Email::parse(&email).unwrap_or_else(|e| panic!("{e}")),
        full_name: name.to_owned(),
        badge_number: Some(format!("B-{}", name.len())),
        role,
        department: None,
        phone: None,
        is_active: true,
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    }
}

pub fn item(number: &str, name: &str, seized_by: &UserProfile) -> ContrabandItem {
    let at = Utc.with_ymd_and_hms(2024, 6, 15, 10, 30, 0).unwrap();
    ContrabandItem {
        id: ContrabandId::generate(),
        seizure_number: number.to_owned(),
        category_id: None,
        item_name: name.to_owned(),
        description: None,
        quantity: Decimal::new(25, 1),
        unit: Some("kg".into()),
        estimated_value: Some(Decimal::new(1_250_000, 2)),
        weight_kg: None,
        status: ItemStatus::Seized,
        seizure_date: at,
        seizure_location: "Moyale checkpoint".into(),
        gps_latitude: None,
        gps_longitude: None,
        seized_by: Some(seized_by.id),
        case_number: None,
        court_case_number: None,
        barcode: None,
        rfid_tag: None,
        storage_location: None,
        created_at: at,
        updated_at: at,
        category: Some(CategoryRef {
            name: "Narcotics".into(),
            risk_level: RiskLevel::High,
        }),
        seized_by_user: Some(OfficerRef {
            full_name: seized_by.full_name.clone(),
            badge_number: seized_by.badge_number.clone(),
        }),
    }
}

pub fn message(from: &UserProfile, to: &UserProfile, subject: &str) -> Message {
    Message {
        id: MessageId::generate(),
        from_user_id: from.id,
        to_user_id: to.id,
        subject: subject.to_owned(),
        content: format!("{subject} details"),
        priority: Priority::Normal,
        message_type: MessageType::General,
        contraband_id: None,
        parent_message_id: None,
        is_read: false,
        read_at: None,
        requires_response: false,
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
        from_user: Some(CorrespondentRef {
            full_name: from.full_name.clone(),
            role: from.role,
            badge_number: from.badge_number.clone(),
        }),
        to_user: Some(CorrespondentRef {
            full_name: to.full_name.clone(),
            role: to.role,
            badge_number: to.badge_number.clone(),
        }),
        contraband: None,
    }
}

pub fn audit(actor: Option<&UserProfile>, action: &str, record: &str) -> AuditLog {
    AuditLog {
        id: AuditLogId::generate(),
        user_id: actor.map(|a| a.id),
        action: action.to_owned(),
        table_name: "contraband_items".to_owned(),
        record_id: Some(record.to_owned()),
        old_values: None,
        new_values: None,
        ip_address: Some("10.0.0.7".into()),
        created_at: Utc.with_ymd_and_hms(2024, 5, 2, 14, 30, 0).unwrap(),
        user: actor.map(|a| OfficerRef {
            full_name: a.full_name.clone(),
            badge_number: a.badge_number.clone(),
        }),
    }
}
