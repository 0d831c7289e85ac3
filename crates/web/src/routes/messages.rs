//! Message center: inbox, sent items, compose, and approval responses.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::Redirect,
};
use serde::Deserialize;
use tracing::instrument;

use cms_core::filter::{Mailbox, MessageFilter, SearchTerm, unread_count};
use cms_core::format::truncate;
use cms_core::records::{ContrabandItem, Message, NewMessage, UserProfile};
use cms_core::validate::{non_blank, validate_message};
use cms_core::{ContrabandId, MessageId, MessageType, Priority, UserId};

use super::contraband::SelectOption;
use super::{Shell, action_failed, datetime, redirect_with};
use crate::error::AppError;
use crate::filters;
use crate::middleware::Officer;
use crate::models::Flash;
use crate::state::AppState;

/// Characters of content shown in the list.
const PREVIEW_LENGTH: usize = 90;

/// Which tab of the message center is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Inbox,
    Sent,
    Compose,
}

impl Tab {
    fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some(tab) if tab.eq_ignore_ascii_case("compose") => Self::Compose,
            other => match Mailbox::parse(other) {
                Mailbox::Inbox => Self::Inbox,
                Mailbox::Sent => Self::Sent,
            },
        }
    }

    const fn mailbox(self) -> Mailbox {
        match self {
            Self::Sent => Mailbox::Sent,
            Self::Inbox | Self::Compose => Mailbox::Inbox,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inbox => "inbox",
            Self::Sent => "sent",
            Self::Compose => "compose",
        }
    }
}

/// Subject shown for a message, falling back to its type in capitals.
fn display_subject(message: &Message) -> String {
    if message.subject.trim().is_empty() {
        message.message_type.as_str().replace('_', " ").to_uppercase()
    } else {
        message.subject.clone()
    }
}

/// One row of the inbox or sent list.
#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: MessageId,
    /// The sender in the inbox, the recipient in sent items.
    pub correspondent: String,
    pub correspondent_role: &'static str,
    pub subject: String,
    pub preview: String,
    pub priority: &'static str,
    pub priority_class: String,
    pub kind: &'static str,
    pub when: String,
    pub unread: bool,
    pub requires_response: bool,
}

impl MessageRow {
    fn new(message: &Message, mailbox: Mailbox) -> Self {
        let correspondent = match mailbox {
            Mailbox::Inbox => message.from_user.as_ref(),
            Mailbox::Sent => message.to_user.as_ref(),
        };
        Self {
            id: message.id,
            correspondent: correspondent.map_or_else(String::new, |u| u.full_name.clone()),
            correspondent_role: correspondent.map_or("", |u| u.role.label()),
            subject: display_subject(message),
            preview: truncate(&message.content, PREVIEW_LENGTH),
            priority: message.priority.label(),
            priority_class: format!("priority-{}", message.priority.as_str()),
            kind: message.message_type.label(),
            when: datetime(message.created_at),
            unread: mailbox == Mailbox::Inbox && !message.is_read,
            requires_response: message.requires_response,
        }
    }
}

/// Compose form values, pre-filled for replies.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ComposeForm {
    pub to_user_id: String,
    pub subject: String,
    pub content: String,
    pub priority: String,
    pub message_type: String,
    pub contraband_id: String,
    pub parent_message_id: String,
    pub requires_response: Option<String>,
}

impl ComposeForm {
    fn reply_to(original: &Message) -> Self {
        let subject = display_subject(original);
        Self {
            to_user_id: original.from_user_id.to_string(),
            subject: if subject.starts_with("Re: ") {
                subject
            } else {
                format!("Re: {subject}")
            },
            priority: Priority::Normal.as_str().to_string(),
            message_type: MessageType::General.as_str().to_string(),
            contraband_id: original
                .contraband_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
            parent_message_id: original.id.to_string(),
            ..Self::default()
        }
    }

    fn to_message(&self) -> Result<NewMessage, String> {
        let to_user_id: UserId = self
            .to_user_id
            .parse()
            .map_err(|_| "Select a recipient".to_string())?;
        let optional_id = |raw: &str| non_blank(raw).filter(|v| v != "none");
        let contraband_id = optional_id(&self.contraband_id)
            .map(|raw| raw.parse::<ContrabandId>())
            .transpose()
            .map_err(|_| "Unknown contraband item".to_string())?;
        let parent_message_id = optional_id(&self.parent_message_id)
            .map(|raw| raw.parse::<MessageId>())
            .transpose()
            .map_err(|_| "Unknown message being replied to".to_string())?;

        let message = NewMessage {
            to_user_id,
            subject: self.subject.trim().to_string(),
            content: self.content.trim().to_string(),
            priority: self.priority.parse().ok(),
            message_type: self.message_type.parse().ok(),
            contraband_id,
            parent_message_id,
            requires_response: Some(self.requires_response.is_some()),
        };
        validate_message(&message).map_err(|e| e.to_string())?;
        Ok(message)
    }
}

// =============================================================================
// Pages
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct MessagesQuery {
    tab: Option<String>,
    q: Option<String>,
    reply: Option<MessageId>,
}

/// Message center template.
#[derive(Template, WebTemplate)]
#[template(path = "messages/index.html")]
pub struct MessagesTemplate {
    pub shell: Shell,
    pub tab: &'static str,
    pub search: String,
    pub rows: Vec<MessageRow>,
    pub unread: usize,
    pub compose: ComposeForm,
    pub recipients: Vec<SelectOption>,
    pub priorities: Vec<SelectOption>,
    pub kinds: Vec<SelectOption>,
    pub items: Vec<SelectOption>,
}

fn recipient_options(users: &[UserProfile], me: UserId, selected: &str) -> Vec<SelectOption> {
    users
        .iter()
        .filter(|u| u.id != me)
        .map(|u| {
            let id = u.id.to_string();
            let selected = id == selected;
            SelectOption::new(id, format!("{} ({})", u.full_name, u.role.label()), selected)
        })
        .collect()
}

fn item_options(items: &[ContrabandItem], selected: &str) -> Vec<SelectOption> {
    items
        .iter()
        .map(|i| {
            let id = i.id.to_string();
            let selected = id == selected;
            SelectOption::new(id, format!("{} - {}", i.seizure_number, i.item_name), selected)
        })
        .collect()
}

/// Message center page handler.
#[instrument(skip(officer, state), fields(user_id = %officer.id()))]
pub async fn index(
    officer: Officer,
    State(state): State<AppState>,
    Query(query): Query<MessagesQuery>,
) -> Result<MessagesTemplate, AppError> {
    let mut shell = Shell::new(&officer, "messages").await;
    let caller = officer.caller();
    let api = state.api();
    let tab = Tab::parse(query.tab.as_deref());

    let (messages, users, items) = tokio::join!(
        api.messages(&caller),
        async {
            if tab == Tab::Compose {
                api.users(&caller, true).await
            } else {
                Ok(Vec::new())
            }
        },
        async {
            if tab == Tab::Compose {
                api.items(&caller, None).await
            } else {
                Ok(Vec::new())
            }
        }
    );
    let messages = shell.or_toast(messages, "messages")?;
    let users = shell.or_toast(users, "recipients")?;
    let items = shell.or_toast(items, "contraband records")?;

    let filter = MessageFilter {
        owner: officer.id(),
        mailbox: tab.mailbox(),
        search: SearchTerm::new(query.q.as_deref().unwrap_or_default()),
    };
    let rows = if tab == Tab::Compose {
        Vec::new()
    } else {
        filter
            .apply(&messages)
            .into_iter()
            .map(|m| MessageRow::new(m, filter.mailbox))
            .collect()
    };

    let compose = query
        .reply
        .and_then(|id| messages.iter().find(|m| m.id == id))
        .map_or_else(
            || ComposeForm {
                priority: Priority::Normal.as_str().to_string(),
                message_type: MessageType::General.as_str().to_string(),
                ..ComposeForm::default()
            },
            ComposeForm::reply_to,
        );

    Ok(MessagesTemplate {
        tab: tab.as_str(),
        search: query.q.unwrap_or_default(),
        rows,
        unread: unread_count(&messages, officer.id()),
        recipients: recipient_options(&users, officer.id(), &compose.to_user_id),
        priorities: Priority::ALL
            .iter()
            .map(|p| SelectOption::new(p.as_str(), p.label(), p.as_str() == compose.priority))
            .collect(),
        kinds: MessageType::ALL
            .iter()
            .map(|k| SelectOption::new(k.as_str(), k.label(), k.as_str() == compose.message_type))
            .collect(),
        items: item_options(&items, &compose.contraband_id),
        compose,
        shell,
    })
}

/// Message detail template.
#[derive(Template, WebTemplate)]
#[template(path = "messages/show.html")]
pub struct MessageTemplate {
    pub shell: Shell,
    pub id: MessageId,
    pub subject: String,
    pub content: String,
    pub from: String,
    pub to: String,
    pub when: String,
    pub priority: &'static str,
    pub priority_class: String,
    pub kind: &'static str,
    pub contraband: Option<(ContrabandId, String)>,
    pub is_incoming: bool,
    /// Approve / reject buttons are shown.
    pub awaiting_decision: bool,
}

/// Read a message. Opening an unread inbox message marks it read.
#[instrument(skip(officer, state), fields(user_id = %officer.id()))]
pub async fn show(
    officer: Officer,
    State(state): State<AppState>,
    Path(id): Path<MessageId>,
) -> Result<MessageTemplate, AppError> {
    let mut shell = Shell::new(&officer, "messages").await;
    let caller = officer.caller();

    let messages = state.api().messages(&caller).await?;
    let message = messages
        .into_iter()
        .find(|m| m.id == id)
        .ok_or_else(|| AppError::NotFound("Message".to_string()))?;

    let is_incoming = message.to_user_id == officer.id();
    if is_incoming && !message.is_read {
        shell.or_toast(state.api().mark_read(&caller, id).await, "read receipt")?;
    }

    let contraband = message.contraband_id.map(|item| {
        let label = message.contraband.as_ref().map_or_else(
            || item.to_string(),
            |c| format!("{} - {}", c.seizure_number, c.item_name),
        );
        (item, label)
    });

    Ok(MessageTemplate {
        id,
        subject: display_subject(&message),
        from: message.sender_name().to_string(),
        to: message.recipient_name().to_string(),
        when: datetime(message.created_at),
        priority: message.priority.label(),
        priority_class: format!("priority-{}", message.priority.as_str()),
        kind: message.message_type.label(),
        contraband,
        is_incoming,
        awaiting_decision: is_incoming
            && message.message_type == MessageType::ApprovalRequest
            && message.requires_response,
        content: message.content,
        shell,
    })
}

// =============================================================================
// Actions
// =============================================================================

/// Send a message.
///
/// POST /messages
#[instrument(skip(officer, state, form), fields(user_id = %officer.id()))]
pub async fn send(
    officer: Officer,
    State(state): State<AppState>,
    Form(form): Form<ComposeForm>,
) -> Result<Redirect, AppError> {
    let message = match form.to_message() {
        Ok(message) => message,
        Err(problem) => {
            return Ok(redirect_with(
                &officer.session,
                Flash::error(problem),
                "/messages?tab=compose",
            )
            .await);
        }
    };

    match state.api().send_message(&officer.caller(), &message).await {
        Ok(created) => {
            tracing::info!(message_id = %created.id, to = %message.to_user_id, "Message sent");
            Ok(redirect_with(
                &officer.session,
                Flash::success("Message sent"),
                "/messages?tab=sent",
            )
            .await)
        }
        Err(e) => action_failed(&officer.session, e, "send message", "/messages?tab=compose").await,
    }
}

#[derive(Debug, Deserialize)]
pub struct DecisionForm {
    decision: String,
}

/// The reply sent when an approval request is decided.
fn decision_reply(request: &Message, approved: bool) -> NewMessage {
    NewMessage {
        to_user_id: request.from_user_id,
        subject: format!("Re: {}", display_subject(request)),
        content: if approved {
            "Your request has been approved."
        } else {
            "Your request has been rejected."
        }
        .to_string(),
        priority: Some(Priority::High),
        message_type: Some(MessageType::StatusUpdate),
        contraband_id: request.contraband_id,
        parent_message_id: Some(request.id),
        requires_response: Some(false),
    }
}

/// Approve or reject an approval request.
///
/// POST /messages/{id}/respond
#[instrument(skip(officer, state, form), fields(user_id = %officer.id()))]
pub async fn respond(
    officer: Officer,
    State(state): State<AppState>,
    Path(id): Path<MessageId>,
    Form(form): Form<DecisionForm>,
) -> Result<Redirect, AppError> {
    let back = format!("/messages/{id}");
    let approved = match form.decision.as_str() {
        "approve" => true,
        "reject" => false,
        _ => {
            return Ok(redirect_with(&officer.session, Flash::error("Unknown decision"), &back).await);
        }
    };

    let caller = officer.caller();
    let messages = state.api().messages(&caller).await?;
    let request = messages
        .iter()
        .find(|m| m.id == id && m.to_user_id == officer.id())
        .ok_or_else(|| AppError::NotFound("Approval request".to_string()))?;

    match state
        .api()
        .send_message(&caller, &decision_reply(request, approved))
        .await
    {
        Ok(_) => {
            tracing::info!(message_id = %id, approved, "Approval request decided");
            let title = if approved {
                "Request approved"
            } else {
                "Request rejected"
            };
            Ok(redirect_with(
                &officer.session,
                Flash::success(format!("{title}. Response has been sent to the requester.")),
                &back,
            )
            .await)
        }
        Err(e) => action_failed(&officer.session, e, "send response", &back).await,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cms_core::Role;

    use super::*;
    use crate::test_support as fixtures;

    #[test]
    fn test_tab_parse() {
        assert_eq!(Tab::parse(None), Tab::Inbox);
        assert_eq!(Tab::parse(Some("sent")), Tab::Sent);
        assert_eq!(Tab::parse(Some("Compose")), Tab::Compose);
        assert_eq!(Tab::parse(Some("bogus")), Tab::Inbox);
    }

    #[test]
    fn test_row_shows_the_other_party() {
        let me = fixtures::officer("Hana Girma", Role::Supervisor);
        let them = fixtures::officer("Abebe Kebede", Role::FieldOfficer);
        let incoming = fixtures::message(&them, &me, "Transfer request");

        let inbox = MessageRow::new(&incoming, Mailbox::Inbox);
        assert_eq!(inbox.correspondent, "Abebe Kebede");
        assert_eq!(inbox.correspondent_role, "Field Officer");
        assert!(inbox.unread);

        let sent = MessageRow::new(&incoming, Mailbox::Sent);
        assert_eq!(sent.correspondent, "Hana Girma");
        assert!(!sent.unread);
    }

    #[test]
    fn test_blank_subject_falls_back_to_type() {
        let a = fixtures::officer("Hana Girma", Role::Supervisor);
        let mut message = fixtures::message(&a, &a, "");
        message.message_type = MessageType::ApprovalRequest;
        assert_eq!(display_subject(&message), "APPROVAL REQUEST");
    }

    #[test]
    fn test_reply_prefills_recipient_and_subject() {
        let me = fixtures::officer("Hana Girma", Role::Supervisor);
        let them = fixtures::officer("Abebe Kebede", Role::FieldOfficer);
        let original = fixtures::message(&them, &me, "Lab results");

        let reply = ComposeForm::reply_to(&original);
        assert_eq!(reply.to_user_id, them.id.to_string());
        assert_eq!(reply.subject, "Re: Lab results");
        assert_eq!(reply.parent_message_id, original.id.to_string());

        let mut answered = original.clone();
        answered.subject = "Re: Lab results".into();
        assert_eq!(ComposeForm::reply_to(&answered).subject, "Re: Lab results");
    }

    #[test]
    fn test_compose_form_to_message() {
        let to = UserId::generate();
        let form = ComposeForm {
            to_user_id: to.to_string(),
            subject: " Destruction approval ".into(),
            content: "Please approve destruction of SZ-12".into(),
            priority: "urgent".into(),
            message_type: "approval_request".into(),
            contraband_id: "none".into(),
            parent_message_id: String::new(),
            requires_response: Some("on".into()),
        };
        let message = form.to_message().unwrap();
        assert_eq!(message.to_user_id, to);
        assert_eq!(message.subject, "Destruction approval");
        assert_eq!(message.priority, Some(Priority::Urgent));
        assert_eq!(message.message_type, Some(MessageType::ApprovalRequest));
        assert_eq!(message.contraband_id, None);
        assert_eq!(message.requires_response, Some(true));

        let missing = ComposeForm {
            to_user_id: String::new(),
            ..form
        };
        assert_eq!(missing.to_message().unwrap_err(), "Select a recipient");
    }

    #[test]
    fn test_decision_reply() {
        let me = fixtures::officer("Hana Girma", Role::Supervisor);
        let them = fixtures::officer("Abebe Kebede", Role::FieldOfficer);
        let request = fixtures::message(&them, &me, "Release request");

        let reply = decision_reply(&request, false);
        assert_eq!(reply.to_user_id, them.id);
        assert_eq!(reply.subject, "Re: Release request");
        assert_eq!(reply.content, "Your request has been rejected.");
        assert_eq!(reply.message_type, Some(MessageType::StatusUpdate));
        assert_eq!(reply.parent_message_id, Some(request.id));
    }
}
