//! Chain of custody.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;

use cms_core::records::{CreatedId, CustodyRecord, NewCustodyTransfer};
use cms_core::validate::validate_transfer;
use cms_core::{Capability, ContrabandId};

use crate::db::CustodyRepository;
use crate::error::Result;
use crate::middleware::{AuthUser, ClientIp};
use crate::state::AppState;

/// `GET /custody/{contraband_id}`
#[instrument(skip(_caller, state))]
pub async fn chain(
    _caller: AuthUser,
    State(state): State<AppState>,
    Path(contraband_id): Path<ContrabandId>,
) -> Result<Json<Vec<CustodyRecord>>> {
    let records = CustodyRepository::new(state.pool())
        .list_for_item(contraband_id)
        .await?;
    Ok(Json(records))
}

/// `POST /custody/transfers`
#[instrument(
    skip(caller, state, ip, transfer),
    fields(user_id = %caller.id(), contraband_id = %transfer.contraband_id)
)]
pub async fn transfer(
    caller: AuthUser,
    State(state): State<AppState>,
    ip: ClientIp,
    Json(transfer): Json<NewCustodyTransfer>,
) -> Result<(StatusCode, Json<CreatedId>)> {
    caller.require(Capability::TransferCustody)?;
    validate_transfer(&transfer)?;

    let outcome = CustodyRepository::new(state.pool())
        .transfer(&transfer, caller.id(), ip.as_deref())
        .await?;

    if let Some(status) = outcome.new_status {
        tracing::info!(%status, "Transfer moved item towards destruction");
    }
    tracing::info!(custody_id = %outcome.id, to_user_id = %transfer.to_user_id, "Custody transferred");
    Ok((
        StatusCode::CREATED,
        Json(CreatedId {
            id: outcome.id.as_uuid(),
        }),
    ))
}
