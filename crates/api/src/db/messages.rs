//! Internal message repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use cms_core::records::{ContrabandRef, CorrespondentRef, Message, NewMessage};
use cms_core::{ContrabandId, MessageId, MessageType, Priority, Role, UserId};

use super::RepositoryError;

const MESSAGE_SELECT: &str = "SELECT m.id, m.from_user_id, m.to_user_id, m.subject, m.content, \
         m.priority, m.message_type, m.contraband_id, m.parent_message_id, m.is_read, \
         m.read_at, m.requires_response, m.created_at, \
         f.full_name AS from_full_name, f.role AS from_role, f.badge_number AS from_badge_number, \
         t.full_name AS to_full_name, t.role AS to_role, t.badge_number AS to_badge_number, \
         i.seizure_number AS contraband_seizure_number, i.item_name AS contraband_item_name \
     FROM cms.messages m \
     LEFT JOIN cms.users f ON f.id = m.from_user_id \
     LEFT JOIN cms.users t ON t.id = m.to_user_id \
     LEFT JOIN cms.contraband_items i ON i.id = m.contraband_id";

#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: MessageId,
    from_user_id: UserId,
    to_user_id: UserId,
    subject: String,
    content: String,
    priority: Priority,
    message_type: MessageType,
    contraband_id: Option<ContrabandId>,
    parent_message_id: Option<MessageId>,
    is_read: bool,
    read_at: Option<DateTime<Utc>>,
    requires_response: bool,
    created_at: DateTime<Utc>,
    from_full_name: Option<String>,
    from_role: Option<Role>,
    from_badge_number: Option<String>,
    to_full_name: Option<String>,
    to_role: Option<Role>,
    to_badge_number: Option<String>,
    contraband_seizure_number: Option<String>,
    contraband_item_name: Option<String>,
}

fn correspondent(
    full_name: Option<String>,
    role: Option<Role>,
    badge_number: Option<String>,
) -> Option<CorrespondentRef> {
    Some(CorrespondentRef {
        full_name: full_name?,
        role: role?,
        badge_number,
    })
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        let contraband = match (row.contraband_seizure_number, row.contraband_item_name) {
            (Some(seizure_number), Some(item_name)) => Some(ContrabandRef {
                seizure_number,
                item_name,
            }),
            _ => None,
        };
        Self {
            id: row.id,
            from_user_id: row.from_user_id,
            to_user_id: row.to_user_id,
            subject: row.subject,
            content: row.content,
            priority: row.priority,
            message_type: row.message_type,
            contraband_id: row.contraband_id,
            parent_message_id: row.parent_message_id,
            is_read: row.is_read,
            read_at: row.read_at,
            requires_response: row.requires_response,
            created_at: row.created_at,
            from_user: correspondent(row.from_full_name, row.from_role, row.from_badge_number),
            to_user: correspondent(row.to_full_name, row.to_role, row.to_badge_number),
            contraband,
        }
    }
}

/// What happened when marking a message read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkRead {
    Marked,
    /// The message exists but belongs to someone else's inbox.
    NotRecipient,
}

/// Repository for internal messages.
pub struct MessageRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> MessageRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Messages sent by or addressed to `user`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user: UserId) -> Result<Vec<Message>, RepositoryError> {
        let sql = format!(
            "{MESSAGE_SELECT} \
             WHERE m.from_user_id = $1 OR m.to_user_id = $1 \
             ORDER BY m.created_at DESC"
        );
        let rows = sqlx::query_as::<_, MessageRow>(&sql)
            .bind(user)
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(Message::from).collect())
    }

    /// Approval requests across the organisation still awaiting a response.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn pending_approvals(&self) -> Result<Vec<Message>, RepositoryError> {
        let sql = format!(
            "{MESSAGE_SELECT} \
             WHERE m.message_type = 'approval_request' AND m.requires_response \
             ORDER BY m.created_at DESC"
        );
        let rows = sqlx::query_as::<_, MessageRow>(&sql)
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(Message::from).collect())
    }

    /// Send a message from `from_user`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidReference` if the recipient, item or
    /// parent message does not exist.
    pub async fn create(
        &self,
        from_user: UserId,
        message: &NewMessage,
    ) -> Result<MessageId, RepositoryError> {
        let id = sqlx::query_scalar::<_, MessageId>(
            "INSERT INTO cms.messages \
               (from_user_id, to_user_id, subject, content, priority, message_type, \
                contraband_id, parent_message_id, requires_response) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING id",
        )
        .bind(from_user)
        .bind(message.to_user_id)
        .bind(message.subject.trim())
        .bind(message.content.trim())
        .bind(message.priority.unwrap_or_default())
        .bind(message.message_type.unwrap_or_default())
        .bind(message.contraband_id)
        .bind(message.parent_message_id)
        .bind(message.requires_response.unwrap_or(false))
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "duplicate message"))?;
        Ok(id)
    }

    /// Mark a message read on behalf of its recipient. Already-read messages
    /// keep their original `read_at`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the message does not exist.
    pub async fn mark_read(&self, id: MessageId, reader: UserId) -> Result<MarkRead, RepositoryError> {
        let recipient = sqlx::query_scalar::<_, UserId>(
            "UPDATE cms.messages \
             SET is_read = TRUE, read_at = COALESCE(read_at, now()) \
             WHERE id = $1 AND to_user_id = $2 \
             RETURNING to_user_id",
        )
        .bind(id)
        .bind(reader)
        .fetch_optional(self.pool)
        .await?;
        if recipient.is_some() {
            return Ok(MarkRead::Marked);
        }

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM cms.messages WHERE id = $1)",
        )
        .bind(id)
        .fetch_one(self.pool)
        .await?;
        if exists {
            Ok(MarkRead::NotRecipient)
        } else {
            Err(RepositoryError::NotFound)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correspondent_requires_name_and_role() {
        assert!(correspondent(None, Some(Role::Admin), None).is_none());
        assert!(correspondent(Some("Abebe".into()), None, None).is_none());
        let found = correspondent(Some("Abebe".into()), Some(Role::Supervisor), Some("B-12".into()));
        assert_eq!(found.map(|c| c.role), Some(Role::Supervisor));
    }
}
