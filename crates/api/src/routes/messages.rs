//! Internal messaging.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;

use cms_core::records::{CreatedId, Message, NewMessage};
use cms_core::validate::validate_message;
use cms_core::{Capability, MessageId};

use crate::db::MessageRepository;
use crate::db::messages::MarkRead;
use crate::error::{ApiError, Result};
use crate::middleware::AuthUser;
use crate::state::AppState;

/// `GET /messages`
#[instrument(skip(caller, state), fields(user_id = %caller.id()))]
pub async fn index(caller: AuthUser, State(state): State<AppState>) -> Result<Json<Vec<Message>>> {
    let messages = MessageRepository::new(state.pool())
        .list_for_user(caller.id())
        .await?;
    Ok(Json(messages))
}

/// `GET /messages/approvals`
#[instrument(skip(caller, state), fields(user_id = %caller.id()))]
pub async fn approvals(
    caller: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Message>>> {
    caller.require(Capability::ViewReports)?;
    let messages = MessageRepository::new(state.pool())
        .pending_approvals()
        .await?;
    Ok(Json(messages))
}

/// `POST /messages`
#[instrument(skip(caller, state, message), fields(user_id = %caller.id(), to_user_id = %message.to_user_id))]
pub async fn create(
    caller: AuthUser,
    State(state): State<AppState>,
    Json(message): Json<NewMessage>,
) -> Result<(StatusCode, Json<CreatedId>)> {
    validate_message(&message)?;

    let id = MessageRepository::new(state.pool())
        .create(caller.id(), &message)
        .await?;
    tracing::info!(message_id = %id, "Message sent");
    Ok((StatusCode::CREATED, Json(CreatedId { id: id.as_uuid() })))
}

/// `PATCH /messages/{id}/read`
#[instrument(skip(caller, state), fields(user_id = %caller.id()))]
pub async fn mark_read(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<MessageId>,
) -> Result<StatusCode> {
    match MessageRepository::new(state.pool())
        .mark_read(id, caller.id())
        .await?
    {
        MarkRead::Marked => Ok(StatusCode::NO_CONTENT),
        MarkRead::NotRecipient => Err(ApiError::Forbidden(
            "Only the recipient can mark a message read".to_string(),
        )),
    }
}
