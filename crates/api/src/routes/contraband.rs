//! Categories, seizures and status changes.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;

use cms_core::records::{Category, ContrabandItem, EvidenceFile, NewContrabandItem, StatusChange};
use cms_core::seizure::{SeizureNumber, validate_item};
use cms_core::validate::non_blank;
use cms_core::{Capability, ContrabandId, UserId};

use crate::db::{CategoryRepository, ContrabandRepository, EvidenceFileRepository};
use crate::error::{ApiError, Result};
use crate::middleware::{AuthUser, ClientIp};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Only items seized by this officer.
    #[serde(default)]
    pub seized_by: Option<UserId>,
}

/// `GET /categories`
#[instrument(skip(_caller, state))]
pub async fn categories(
    _caller: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>> {
    let categories = CategoryRepository::new(state.pool()).list().await?;
    Ok(Json(categories))
}

/// `GET /contraband-items`
#[instrument(skip(_caller, state))]
pub async fn index(
    _caller: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ContrabandItem>>> {
    let items = ContrabandRepository::new(state.pool())
        .list(query.seized_by)
        .await?;
    Ok(Json(items))
}

/// `GET /contraband-items/{id}`
#[instrument(skip(_caller, state))]
pub async fn show(
    _caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<ContrabandId>,
) -> Result<Json<ContrabandItem>> {
    ContrabandRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Contraband item not found".to_string()))
}

/// The client's seizure number if it sent one, otherwise a fresh one.
fn seizure_number_for(item: &NewContrabandItem) -> Result<SeizureNumber> {
    match item.seizure_number.as_deref().and_then(non_blank) {
        Some(raw) => SeizureNumber::parse(&raw).map_err(|e| ApiError::BadRequest(e.to_string())),
        None => Ok(SeizureNumber::generate(Utc::now())),
    }
}

/// `POST /contraband-items`
#[instrument(skip(caller, state, ip, item), fields(user_id = %caller.id()))]
pub async fn create(
    caller: AuthUser,
    State(state): State<AppState>,
    ip: ClientIp,
    Json(item): Json<NewContrabandItem>,
) -> Result<(StatusCode, Json<ContrabandItem>)> {
    caller.require(Capability::RegisterSeizure)?;
    validate_item(&item)?;
    let seizure_number = seizure_number_for(&item)?;

    let created = ContrabandRepository::new(state.pool())
        .create(&item, seizure_number.as_str(), caller.id(), ip.as_deref())
        .await?;

    tracing::info!(
        contraband_id = %created.id,
        seizure_number = %created.seizure_number,
        "Seizure registered"
    );
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PUT /contraband-items/{id}/status`
#[instrument(skip(caller, state, ip), fields(user_id = %caller.id()))]
pub async fn update_status(
    caller: AuthUser,
    State(state): State<AppState>,
    ip: ClientIp,
    Path(id): Path<ContrabandId>,
    Json(change): Json<StatusChange>,
) -> Result<Json<ContrabandItem>> {
    caller.require(Capability::ChangeStatus)?;

    let item = ContrabandRepository::new(state.pool())
        .update_status(id, change.status, caller.id(), ip.as_deref())
        .await?;
    tracing::info!(contraband_id = %id, status = %item.status, "Status changed");
    Ok(Json(item))
}

/// `GET /contraband-items/{id}/files`
#[instrument(skip(_caller, state))]
pub async fn files(
    _caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<ContrabandId>,
) -> Result<Json<Vec<EvidenceFile>>> {
    let files = EvidenceFileRepository::new(state.pool())
        .list_for_item(id)
        .await?;
    Ok(Json(files))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seizure_number_kept_when_supplied() {
        let item = NewContrabandItem {
            seizure_number: Some("CMS-2024-123456".into()),
            ..NewContrabandItem::default()
        };
        let number = seizure_number_for(&item).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(number.as_str(), "CMS-2024-123456");
    }

    #[test]
    fn test_seizure_number_generated_when_blank() {
        let item = NewContrabandItem {
            seizure_number: Some("   ".into()),
            ..NewContrabandItem::default()
        };
        let number = seizure_number_for(&item).unwrap_or_else(|e| panic!("{e}"));
        assert!(number.as_str().starts_with("CMS-"));
    }
}
