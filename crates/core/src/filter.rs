//! Search and filtering over already-fetched lists.
//!
//! The console fetches whole lists from the API and narrows them locally.
//! All searches are case-insensitive substring matches; an empty search term
//! matches everything.

use std::collections::BTreeSet;

use crate::records::{AuditLog, ContrabandItem, Message, UserProfile};
use crate::types::{ItemStatus, Role, UserId};

/// A normalized search term.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchTerm(String);

impl SearchTerm {
    #[must_use]
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_lowercase())
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when any of `fields` contains the term.
    #[must_use]
    pub fn matches_any<'a>(&self, fields: impl IntoIterator<Item = &'a str>) -> bool {
        self.is_empty()
            || fields
                .into_iter()
                .any(|field| field.to_lowercase().contains(&self.0))
    }
}

/// Parse a select box value where `all` (or nothing) means "no filter".
#[must_use]
pub fn optional_choice<T: std::str::FromStr>(raw: Option<&str>) -> Option<T> {
    raw.map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
        .and_then(|v| v.parse().ok())
}

// =============================================================================
// Contraband
// =============================================================================

/// Filter for the contraband list.
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub search: SearchTerm,
    pub status: Option<ItemStatus>,
    /// Restrict to items seized by this officer ("My Seizures").
    pub seized_by: Option<UserId>,
}

impl ItemFilter {
    #[must_use]
    pub fn matches(&self, item: &ContrabandItem) -> bool {
        if self.status.is_some_and(|status| item.status != status) {
            return false;
        }
        if self.seized_by.is_some() && item.seized_by != self.seized_by {
            return false;
        }
        self.search.matches_any([
            item.seizure_number.as_str(),
            item.item_name.as_str(),
            item.seized_by_name(),
        ])
    }

    #[must_use]
    pub fn apply<'a>(&self, items: &'a [ContrabandItem]) -> Vec<&'a ContrabandItem> {
        items.iter().filter(|item| self.matches(item)).collect()
    }
}

// =============================================================================
// Users
// =============================================================================

/// Filter for the user management table.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub search: SearchTerm,
    pub role: Option<Role>,
}

impl UserFilter {
    #[must_use]
    pub fn matches(&self, user: &UserProfile) -> bool {
        if self.role.is_some_and(|role| user.role != role) {
            return false;
        }
        self.search.matches_any([
            user.full_name.as_str(),
            user.email.as_str(),
            user.badge_number.as_deref().unwrap_or_default(),
        ])
    }

    #[must_use]
    pub fn apply<'a>(&self, users: &'a [UserProfile]) -> Vec<&'a UserProfile> {
        users.iter().filter(|user| self.matches(user)).collect()
    }
}

// =============================================================================
// Messages
// =============================================================================

/// Message center tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mailbox {
    #[default]
    Inbox,
    Sent,
}

impl Mailbox {
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some(tab) if tab.eq_ignore_ascii_case("sent") => Self::Sent,
            _ => Self::Inbox,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inbox => "inbox",
            Self::Sent => "sent",
        }
    }
}

/// Filter for one message center tab.
#[derive(Debug, Clone)]
pub struct MessageFilter {
    pub owner: UserId,
    pub mailbox: Mailbox,
    pub search: SearchTerm,
}

impl MessageFilter {
    #[must_use]
    pub fn matches(&self, message: &Message) -> bool {
        let in_box = match self.mailbox {
            Mailbox::Inbox => message.to_user_id == self.owner,
            Mailbox::Sent => message.from_user_id == self.owner,
        };
        in_box
            && self.search.matches_any([
                message.subject.as_str(),
                message.content.as_str(),
                message.sender_name(),
            ])
    }

    #[must_use]
    pub fn apply<'a>(&self, messages: &'a [Message]) -> Vec<&'a Message> {
        messages.iter().filter(|m| self.matches(m)).collect()
    }
}

/// Messages addressed to `owner` that have not been read.
#[must_use]
pub fn unread_count(messages: &[Message], owner: UserId) -> usize {
    messages
        .iter()
        .filter(|m| m.to_user_id == owner && !m.is_read)
        .count()
}

// =============================================================================
// Audit
// =============================================================================

/// Filter for the audit trail.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub search: SearchTerm,
    pub action: Option<String>,
    pub table: Option<String>,
}

impl AuditFilter {
    #[must_use]
    pub fn matches(&self, log: &AuditLog) -> bool {
        if self.action.as_ref().is_some_and(|a| *a != log.action) {
            return false;
        }
        if self.table.as_ref().is_some_and(|t| *t != log.table_name) {
            return false;
        }
        self.search.matches_any([
            log.actor_name(),
            log.action.as_str(),
            log.table_name.as_str(),
            log.record_id.as_deref().unwrap_or_default(),
        ])
    }

    #[must_use]
    pub fn apply<'a>(&self, logs: &'a [AuditLog]) -> Vec<&'a AuditLog> {
        logs.iter().filter(|log| self.matches(log)).collect()
    }
}

/// Sorted distinct actions, for the action select box.
#[must_use]
pub fn distinct_actions(logs: &[AuditLog]) -> Vec<String> {
    logs.iter()
        .map(|log| log.action.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Sorted distinct table names, for the table select box.
#[must_use]
pub fn distinct_tables(logs: &[AuditLog]) -> Vec<String> {
    logs.iter()
        .map(|log| log.table_name.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod fixtures {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use crate::records::{
        AuditLog, CategoryRef, ContrabandItem, CorrespondentRef, Message, OfficerRef,
        UserProfile,
    };
    use crate::types::{
        AuditLogId, CategoryId, ContrabandId, Email, ItemStatus, MessageId, MessageType, Priority,
        RiskLevel, Role, UserId,
    };

    pub fn officer(name: &str, role: Role, badge: &str) -> UserProfile {
        let email = format!("{}@police.et", name.to_lowercase().replace(' ', "."));
        UserProfile {
            id: UserId::generate(),
            email: Email::parse(&email).unwrap_or_else(|e| panic!("{e}")),
            full_name: name.to_owned(),
            badge_number: Some(badge.to_owned()),
            role,
            department: None,
            phone: None,
            is_active: true,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    pub fn item(
        number: &str,
        name: &str,
        status: ItemStatus,
        seized_by: &UserProfile,
        category: Option<(&str, CategoryId)>,
        value: Decimal,
        month: u32,
    ) -> ContrabandItem {
        let at = Utc.with_ymd_and_hms(2024, month, 15, 10, 0, 0).unwrap();
        ContrabandItem {
            id: ContrabandId::generate(),
            seizure_number: number.to_owned(),
            category_id: category.map(|(_, id)| id),
            item_name: name.to_owned(),
            description: None,
            quantity: Decimal::ONE,
            unit: Some("kg".into()),
            estimated_value: Some(value),
            weight_kg: None,
            status,
            seizure_date: at,
            seizure_location: "Bole".into(),
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
            category: category.map(|(name, _)| CategoryRef {
                name: name.to_owned(),
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

    pub fn audit(actor: Option<&UserProfile>, action: &str, table: &str, record: &str) -> AuditLog {
        AuditLog {
            id: AuditLogId::generate(),
            user_id: actor.map(|a| a.id),
            action: action.to_owned(),
            table_name: table.to_owned(),
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
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_item_search_covers_number_name_and_officer() {
        let abebe = officer("Abebe Kebede", Role::FieldOfficer, "FO-101");
        let sara = officer("Sara Tesfaye", Role::FieldOfficer, "FO-102");
        let items = vec![
            item("CMS-2024-000001", "Cocaine", ItemStatus::Seized, &abebe, None, Decimal::TEN, 1),
            item("CMS-2024-000002", "AK-47", ItemStatus::InCustody, &sara, None, Decimal::TEN, 2),
        ];

        let by_number = ItemFilter { search: SearchTerm::new("000002"), ..ItemFilter::default() };
        assert_eq!(by_number.apply(&items).len(), 1);

        let by_name = ItemFilter { search: SearchTerm::new("cocaINE"), ..ItemFilter::default() };
        assert_eq!(by_name.apply(&items)[0].item_name, "Cocaine");

        let by_officer = ItemFilter { search: SearchTerm::new("sara"), ..ItemFilter::default() };
        assert_eq!(by_officer.apply(&items)[0].item_name, "AK-47");

        assert_eq!(ItemFilter::default().apply(&items).len(), 2);
    }

    #[test]
    fn test_item_status_and_owner_filters() {
        let abebe = officer("Abebe Kebede", Role::FieldOfficer, "FO-101");
        let sara = officer("Sara Tesfaye", Role::FieldOfficer, "FO-102");
        let items = vec![
            item("CMS-1", "Khat", ItemStatus::Seized, &abebe, None, Decimal::ONE, 1),
            item("CMS-2", "Khat", ItemStatus::Destroyed, &abebe, None, Decimal::ONE, 1),
            item("CMS-3", "Khat", ItemStatus::Seized, &sara, None, Decimal::ONE, 1),
        ];

        let seized = ItemFilter { status: Some(ItemStatus::Seized), ..ItemFilter::default() };
        assert_eq!(seized.apply(&items).len(), 2);

        let mine = ItemFilter {
            status: Some(ItemStatus::Seized),
            seized_by: Some(abebe.id),
            ..ItemFilter::default()
        };
        let hits = mine.apply(&items);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].seizure_number, "CMS-1");
    }

    #[test]
    fn test_optional_choice_treats_all_as_none() {
        assert_eq!(optional_choice::<ItemStatus>(Some("all")), None);
        assert_eq!(optional_choice::<ItemStatus>(Some("")), None);
        assert_eq!(optional_choice::<ItemStatus>(None), None);
        assert_eq!(
            optional_choice::<ItemStatus>(Some("released")),
            Some(ItemStatus::Released)
        );
        assert_eq!(optional_choice::<Role>(Some("bogus")), None);
    }

    #[test]
    fn test_user_filter() {
        let users = vec![
            officer("Abebe Kebede", Role::FieldOfficer, "FO-101"),
            officer("Hanna Girma", Role::Auditor, "AU-7"),
        ];
        let by_badge = UserFilter { search: SearchTerm::new("au-7"), role: None };
        assert_eq!(by_badge.apply(&users)[0].full_name, "Hanna Girma");

        let by_email = UserFilter { search: SearchTerm::new("abebe.kebede@"), role: None };
        assert_eq!(by_email.apply(&users).len(), 1);

        let by_role = UserFilter { search: SearchTerm::default(), role: Some(Role::Admin) };
        assert!(by_role.apply(&users).is_empty());
    }

    #[test]
    fn test_mailboxes_and_unread_count() {
        let me = officer("Abebe Kebede", Role::FieldOfficer, "FO-101");
        let boss = officer("Mulu Alemu", Role::Supervisor, "SV-1");
        let mut read = message(&boss, &me, "Weekly briefing");
        read.is_read = true;
        let messages = vec![
            message(&boss, &me, "Transfer approval"),
            read,
            message(&me, &boss, "Status update"),
        ];

        let inbox = MessageFilter {
            owner: me.id,
            mailbox: Mailbox::Inbox,
            search: SearchTerm::default(),
        };
        assert_eq!(inbox.apply(&messages).len(), 2);

        let sent = MessageFilter { mailbox: Mailbox::Sent, ..inbox.clone() };
        assert_eq!(sent.apply(&messages)[0].subject, "Status update");

        let by_sender = MessageFilter { search: SearchTerm::new("mulu"), ..inbox };
        assert_eq!(by_sender.apply(&messages).len(), 2);

        assert_eq!(unread_count(&messages, me.id), 1);
        assert_eq!(unread_count(&messages, boss.id), 1);
    }

    #[test]
    fn test_mailbox_parse() {
        assert_eq!(Mailbox::parse(Some("Sent")), Mailbox::Sent);
        assert_eq!(Mailbox::parse(Some("compose")), Mailbox::Inbox);
        assert_eq!(Mailbox::parse(None), Mailbox::Inbox);
    }

    #[test]
    fn test_audit_filter_and_option_lists() {
        let admin = officer("Admin User", Role::Admin, "AD-1");
        let logs = vec![
            audit(Some(&admin), "CREATE_SEIZURE", "contraband_items", "abc-1"),
            audit(Some(&admin), "UPDATE_STATUS", "contraband_items", "abc-2"),
            audit(None, "CREATE_USER", "users", "u-9"),
        ];

        let by_action = AuditFilter {
            action: Some("UPDATE_STATUS".into()),
            ..AuditFilter::default()
        };
        assert_eq!(by_action.apply(&logs).len(), 1);

        let by_table = AuditFilter { table: Some("users".into()), ..AuditFilter::default() };
        assert_eq!(by_table.apply(&logs)[0].action, "CREATE_USER");

        let by_actor = AuditFilter { search: SearchTerm::new("system"), ..AuditFilter::default() };
        assert_eq!(by_actor.apply(&logs).len(), 1);

        let by_record = AuditFilter { search: SearchTerm::new("ABC-"), ..AuditFilter::default() };
        assert_eq!(by_record.apply(&logs).len(), 2);

        assert_eq!(
            distinct_actions(&logs),
            vec!["CREATE_SEIZURE", "CREATE_USER", "UPDATE_STATUS"]
        );
        assert_eq!(distinct_tables(&logs), vec!["contraband_items", "users"]);
    }
}
