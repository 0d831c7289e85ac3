//! Audit trail (read only).

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use cms_core::Capability;
use cms_core::records::AuditLog;

use crate::db::AuditRepository;
use crate::error::Result;
use crate::middleware::AuthUser;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AuditQuery {
    #[serde(default)]
    pub limit: Option<i64>,
}

/// `GET /audit-logs`
#[instrument(skip(caller, state), fields(user_id = %caller.id()))]
pub async fn index(
    caller: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<AuditLog>>> {
    caller.require(Capability::ViewAudit)?;
    let limit = query.limit.unwrap_or(AuditRepository::DEFAULT_LIMIT);
    let logs = AuditRepository::new(state.pool()).list(limit).await?;
    Ok(Json(logs))
}
