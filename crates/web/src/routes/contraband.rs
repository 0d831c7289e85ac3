//! Contraband list and detail pages, status changes, custody transfers and
//! evidence uploads.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Multipart, Path, Query, State},
    response::Redirect,
};
use serde::Deserialize;
use tracing::instrument;

use cms_core::filter::{ItemFilter, SearchTerm, optional_choice};
use cms_core::records::{
    ContrabandItem, CustodyRecord, EvidenceFile, NewCustodyTransfer, UserProfile,
};
use cms_core::report::format_etb;
use cms_core::validate::{is_destruction_transfer, non_blank, validate_transfer};
use cms_core::{Capability, ContrabandId, ItemStatus, UserId};

use super::evidence::{PHOTO_FIELD, read_photo, upload_all};
use super::{Shell, action_failed, date, datetime, redirect_with};
use crate::client::{ApiClient, EvidenceUpload};
use crate::error::AppError;
use crate::filters;
use crate::middleware::Officer;
use crate::middleware::session::push_flash;
use crate::models::Flash;
use crate::state::AppState;

/// Suggested transfer reasons (free text is accepted too).
pub const TRANSFER_REASONS: [&str; 6] = [
    "Storage",
    "Investigation",
    "Laboratory Analysis",
    "Court Presentation",
    "Destruction",
    "Release",
];

// =============================================================================
// Views
// =============================================================================

/// One row of an item table.
#[derive(Debug, Clone)]
pub struct ItemRow {
    pub id: ContrabandId,
    pub seizure_number: String,
    pub item_name: String,
    pub category: String,
    pub quantity: String,
    pub status_label: &'static str,
    pub status_class: String,
    pub seized_by: String,
    pub seized_on: String,
    pub location: String,
}

impl From<&ContrabandItem> for ItemRow {
    fn from(item: &ContrabandItem) -> Self {
        Self {
            id: item.id,
            seizure_number: item.seizure_number.clone(),
            item_name: item.item_name.clone(),
            category: item
                .category
                .as_ref()
                .map_or_else(|| "Uncategorized".to_string(), |c| c.name.clone()),
            quantity: quantity_of(item),
            status_label: item.status.label(),
            status_class: status_class(item.status),
            seized_by: item.seized_by_name().to_string(),
            seized_on: date(item.seizure_date),
            location: item.seizure_location.clone(),
        }
    }
}

fn quantity_of(item: &ContrabandItem) -> String {
    let amount = item.quantity.normalize();
    match item.unit.as_deref() {
        Some(unit) => format!("{amount} {unit}"),
        None => amount.to_string(),
    }
}

/// CSS class of a status badge, e.g. `status-in_custody`.
#[must_use]
pub fn status_class(status: ItemStatus) -> String {
    format!("status-{}", status.as_str())
}

/// A select box option.
#[derive(Debug, Clone)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>, selected: bool) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            selected,
        }
    }
}

/// Status filter options, "All Statuses" first.
fn status_options(selected: Option<ItemStatus>) -> Vec<SelectOption> {
    std::iter::once(SelectOption::new("all", "All Statuses", selected.is_none()))
        .chain(
            ItemStatus::ALL
                .iter()
                .map(|s| SelectOption::new(s.as_str(), s.label(), selected == Some(*s))),
        )
        .collect()
}

/// A labelled value on the detail page.
#[derive(Debug, Clone)]
pub struct Fact {
    pub label: &'static str,
    pub value: String,
}

fn facts(item: &ContrabandItem) -> Vec<Fact> {
    let mut facts = vec![
        Fact {
            label: "Category",
            value: item
                .category
                .as_ref()
                .map_or_else(|| "Uncategorized".to_string(), |c| {
                    format!("{} ({} risk)", c.name, c.risk_level.label())
                }),
        },
        Fact {
            label: "Quantity",
            value: quantity_of(item),
        },
        Fact {
            label: "Seized",
            value: datetime(item.seizure_date),
        },
        Fact {
            label: "Seized By",
            value: item.seized_by_user.as_ref().map_or_else(String::new, |o| {
                o.badge_number
                    .as_ref()
                    .map_or_else(|| o.full_name.clone(), |b| format!("{} ({b})", o.full_name))
            }),
        },
        Fact {
            label: "Seizure Location",
            value: item.seizure_location.clone(),
        },
    ];

    let optional = [
        ("Estimated Value", item.estimated_value.map(format_etb)),
        ("Weight", item.weight_kg.map(|w| format!("{} kg", w.normalize()))),
        ("GPS", gps_of(item)),
        ("Case Number", item.case_number.clone()),
        ("Court Case Number", item.court_case_number.clone()),
        ("Barcode", item.barcode.clone()),
        ("RFID Tag", item.rfid_tag.clone()),
        ("Storage Location", item.storage_location.clone()),
    ];
    facts.extend(
        optional
            .into_iter()
            .filter_map(|(label, value)| value.map(|value| Fact { label, value })),
    );
    facts
}

fn gps_of(item: &ContrabandItem) -> Option<String> {
    item.gps_latitude
        .zip(item.gps_longitude)
        .map(|(lat, lon)| format!("{lat:.6}, {lon:.6}"))
}

/// One hand-over in the custody chain.
#[derive(Debug, Clone)]
pub struct CustodyRow {
    /// 1 for the first hand-over; the API lists the chain newest first.
    pub step: usize,
    pub when: String,
    pub reason: String,
    pub from: Option<String>,
    pub to: String,
    pub location: String,
    pub notes: Option<String>,
}

fn officer_label(name: &str, badge: Option<&str>) -> String {
    badge.map_or_else(|| name.to_string(), |b| format!("{name} ({b})"))
}

fn custody_rows(chain: &[CustodyRecord]) -> Vec<CustodyRow> {
    let total = chain.len();
    chain
        .iter()
        .enumerate()
        .map(|(index, record)| CustodyRow {
            step: total - index,
            when: datetime(record.transfer_date),
            reason: record.transfer_reason.clone(),
            from: record
                .from_user
                .as_ref()
                .map(|u| officer_label(&u.full_name, u.badge_number.as_deref())),
            to: record.to_user.as_ref().map_or_else(
                || record.to_user_id.to_string(),
                |u| officer_label(&u.full_name, u.badge_number.as_deref()),
            ),
            location: record.location.clone().unwrap_or_default(),
            notes: record.notes.clone(),
        })
        .collect()
}

/// An evidence file link.
#[derive(Debug, Clone)]
pub struct FileRow {
    pub name: String,
    pub url: String,
    pub is_image: bool,
    pub size: String,
    pub uploaded: String,
    pub description: Option<String>,
}

fn file_rows(api: &ApiClient, files: &[EvidenceFile]) -> Vec<FileRow> {
    files
        .iter()
        .map(|file| FileRow {
            name: file.file_name.clone(),
            url: api.public_file_url(&file.file_url),
            is_image: file
                .file_type
                .as_deref()
                .is_some_and(|t| t.starts_with("image/")),
            size: file.file_size.map_or_else(String::new, human_size),
            uploaded: datetime(file.uploaded_at),
            description: file.description.clone(),
        })
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn human_size(bytes: i64) -> String {
    const KIB: f64 = 1024.0;
    let bytes = bytes.max(0) as f64;
    if bytes < KIB {
        format!("{bytes} B")
    } else if bytes < KIB * KIB {
        format!("{:.1} KB", bytes / KIB)
    } else {
        format!("{:.1} MB", bytes / (KIB * KIB))
    }
}

/// Recipient option of the transfer form.
fn recipient_options(users: &[UserProfile], exclude: UserId) -> Vec<SelectOption> {
    users
        .iter()
        .filter(|u| u.is_active && u.id != exclude)
        .map(|u| {
            let label = format!(
                "{} - {}",
                officer_label(&u.full_name, u.badge_number.as_deref()),
                u.role.label()
            );
            SelectOption::new(u.id.to_string(), label, false)
        })
        .collect()
}

// =============================================================================
// List
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    q: Option<String>,
    status: Option<String>,
    mine: Option<bool>,
}

/// Contraband list template.
#[derive(Template, WebTemplate)]
#[template(path = "contraband/index.html")]
pub struct ContrabandIndexTemplate {
    pub shell: Shell,
    pub title: &'static str,
    pub rows: Vec<ItemRow>,
    pub total: usize,
    pub search: String,
    pub statuses: Vec<SelectOption>,
    pub mine: bool,
    pub can_register: bool,
}

/// Contraband list page handler.
#[instrument(skip(officer, state), fields(user_id = %officer.id()))]
pub async fn index(
    officer: Officer,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<ContrabandIndexTemplate, AppError> {
    let mut shell = Shell::new(&officer, "contraband").await;
    let mine = query.mine.unwrap_or(false);
    let seized_by = mine.then(|| officer.id());

    let items = shell.or_toast(
        state.api().items(&officer.caller(), seized_by).await,
        "contraband records",
    )?;

    let filter = ItemFilter {
        search: SearchTerm::new(query.q.as_deref().unwrap_or_default()),
        status: optional_choice(query.status.as_deref()),
        seized_by,
    };
    let rows: Vec<ItemRow> = filter.apply(&items).into_iter().map(ItemRow::from).collect();

    Ok(ContrabandIndexTemplate {
        title: if mine { "My Seizures" } else { "Contraband Records" },
        total: items.len(),
        rows,
        search: query.q.unwrap_or_default(),
        statuses: status_options(filter.status),
        mine,
        can_register: officer.can(Capability::RegisterSeizure),
        shell,
    })
}

// =============================================================================
// Detail
// =============================================================================

/// Contraband detail template.
#[derive(Template, WebTemplate)]
#[template(path = "contraband/show.html")]
pub struct ContrabandShowTemplate {
    pub shell: Shell,
    pub id: ContrabandId,
    pub seizure_number: String,
    pub item_name: String,
    pub description: Option<String>,
    pub status_label: &'static str,
    pub status_class: String,
    pub facts: Vec<Fact>,
    pub custody: Vec<CustodyRow>,
    pub files: Vec<FileRow>,
    /// Statuses the item may move to; empty when the form is hidden.
    pub next_statuses: Vec<SelectOption>,
    /// Transfer recipients; empty when the form is hidden.
    pub recipients: Vec<SelectOption>,
    pub reasons: [&'static str; 6],
    pub can_upload: bool,
    pub is_closed: bool,
}

/// Contraband detail page handler.
#[instrument(skip(officer, state), fields(user_id = %officer.id()))]
pub async fn show(
    officer: Officer,
    State(state): State<AppState>,
    Path(id): Path<ContrabandId>,
) -> Result<ContrabandShowTemplate, AppError> {
    let mut shell = Shell::new(&officer, "contraband").await;
    let caller = officer.caller();
    let api = state.api();
    let can_transfer = officer.can(Capability::TransferCustody);

    let (item, chain, files, users) = tokio::join!(
        api.item(&caller, id),
        api.custody_chain(&caller, id),
        api.evidence_files(&caller, id),
        async {
            if can_transfer {
                api.users(&caller, true).await
            } else {
                Ok(Vec::new())
            }
        }
    );
    let item = item?;
    let chain = shell.or_toast(chain, "custody chain")?;
    let files = shell.or_toast(files, "evidence files")?;
    let users = shell.or_toast(users, "officers")?;

    let is_closed = item.status.is_terminal();
    let next_statuses = if officer.can(Capability::ChangeStatus) && !is_closed {
        ItemStatus::ALL
            .iter()
            .filter(|s| item.status.check_transition(**s).is_ok())
            .map(|s| SelectOption::new(s.as_str(), s.label(), false))
            .collect()
    } else {
        Vec::new()
    };
    let recipients = if can_transfer && !is_closed {
        recipient_options(&users, officer.id())
    } else {
        Vec::new()
    };

    Ok(ContrabandShowTemplate {
        id,
        seizure_number: item.seizure_number.clone(),
        item_name: item.item_name.clone(),
        description: item.description.clone(),
        status_label: item.status.label(),
        status_class: status_class(item.status),
        facts: facts(&item),
        custody: custody_rows(&chain),
        files: file_rows(api, &files),
        next_statuses,
        recipients,
        reasons: TRANSFER_REASONS,
        can_upload: officer.can(Capability::ChangeStatus),
        is_closed,
        shell,
    })
}

// =============================================================================
// Actions
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    status: String,
}

/// Change an item's status.
///
/// POST /contraband/{id}/status
#[instrument(skip(officer, state, form), fields(user_id = %officer.id()))]
pub async fn update_status(
    officer: Officer,
    State(state): State<AppState>,
    Path(id): Path<ContrabandId>,
    Form(form): Form<StatusForm>,
) -> Result<Redirect, AppError> {
    officer.require(Capability::ChangeStatus)?;
    let back = format!("/contraband/{id}");

    let Ok(status) = form.status.parse::<ItemStatus>() else {
        return Ok(redirect_with(
            &officer.session,
            Flash::error("Choose a valid status"),
            &back,
        )
        .await);
    };

    match state.api().set_status(&officer.caller(), id, status).await {
        Ok(item) => {
            tracing::info!(seizure = %item.seizure_number, %status, "Item status changed");
            Ok(redirect_with(
                &officer.session,
                Flash::success(format!("Status updated to {}", status.label())),
                &back,
            )
            .await)
        }
        Err(e) => action_failed(&officer.session, e, "update status", &back).await,
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TransferForm {
    to_user_id: String,
    transfer_reason: String,
    location: String,
    notes: String,
}

impl TransferForm {
    fn to_transfer(&self, item: ContrabandId) -> Result<NewCustodyTransfer, String> {
        let to_user_id: UserId = self
            .to_user_id
            .parse()
            .map_err(|_| "Select the officer receiving custody".to_string())?;
        let transfer = NewCustodyTransfer {
            contraband_id: item,
            to_user_id,
            transfer_reason: self.transfer_reason.trim().to_string(),
            location: self.location.trim().to_string(),
            notes: non_blank(&self.notes),
        };
        validate_transfer(&transfer).map_err(|e| e.to_string())?;
        Ok(transfer)
    }
}

/// Record a custody transfer.
///
/// POST /contraband/{id}/transfer
#[instrument(skip(officer, state, form), fields(user_id = %officer.id()))]
pub async fn transfer(
    officer: Officer,
    State(state): State<AppState>,
    Path(id): Path<ContrabandId>,
    Form(form): Form<TransferForm>,
) -> Result<Redirect, AppError> {
    officer.require(Capability::TransferCustody)?;
    let back = format!("/contraband/{id}");

    let transfer = match form.to_transfer(id) {
        Ok(transfer) => transfer,
        Err(message) => {
            return Ok(redirect_with(&officer.session, Flash::error(message), &back).await);
        }
    };

    match state.api().transfer_custody(&officer.caller(), &transfer).await {
        Ok(created) => {
            tracing::info!(record_id = %created.id, contraband_id = %id, "Custody transferred");
            let message = if is_destruction_transfer(&transfer.transfer_reason) {
                "Custody transfer recorded; item marked pending destruction"
            } else {
                "Custody transfer recorded"
            };
            Ok(redirect_with(&officer.session, Flash::success(message), &back).await)
        }
        Err(e) => action_failed(&officer.session, e, "record transfer", &back).await,
    }
}

/// Files chosen on the detail page, each carrying the shared description.
#[derive(Debug, Default)]
struct UploadForm {
    photos: Vec<EvidenceUpload>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self, String> {
        let mut form = Self::default();
        let mut description = None;
        while let Some(field) = multipart.next_field().await.map_err(|e| e.body_text())? {
            match field.name() {
                Some(PHOTO_FIELD) => {
                    if let Some(photo) = read_photo(field).await.map_err(|e| e.body_text())? {
                        form.photos.push(photo);
                    }
                }
                Some("description") => {
                    let text = field.text().await.map_err(|e| e.body_text())?;
                    description = non_blank(&text);
                }
                _ => {}
            }
        }
        for photo in &mut form.photos {
            photo.description.clone_from(&description);
        }
        Ok(form)
    }
}

/// Upload evidence files for an existing item.
///
/// POST /contraband/{id}/files
#[instrument(skip(officer, state, multipart), fields(user_id = %officer.id()))]
pub async fn upload_files(
    officer: Officer,
    State(state): State<AppState>,
    Path(id): Path<ContrabandId>,
    multipart: Multipart,
) -> Result<Redirect, AppError> {
    officer.require(Capability::ChangeStatus)?;
    let back = format!("/contraband/{id}");

    let photos = match UploadForm::read(multipart).await {
        Ok(form) => form.photos,
        Err(message) => {
            tracing::warn!(error = %message, "Unreadable upload form");
            return Ok(redirect_with(
                &officer.session,
                Flash::error(format!("Upload failed: {message}")),
                &back,
            )
            .await);
        }
    };

    if photos.is_empty() {
        return Ok(redirect_with(
            &officer.session,
            Flash::error("Choose at least one file to upload"),
            &back,
        )
        .await);
    }
    let report = upload_all(state.api(), &officer.caller(), id, photos).await?;
    if report.stored > 0 {
        push_flash(
            &officer.session,
            Flash::success(format!("{} file(s) uploaded", report.stored)),
        )
        .await;
    }
    if let Some(message) = report.failure_message() {
        push_flash(&officer.session, Flash::error(message)).await;
    }
    Ok(Redirect::to(&back))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::extract::FromRequest;
    use axum::http::{Request, header};
    use chrono::{TimeZone, Utc};
    use cms_core::records::OfficerRef;
    use cms_core::{CustodyRecordId, Role};
    use rust_decimal::Decimal;

    use super::*;
    use crate::test_support as fixtures;

    async fn multipart(body: &'static str) -> Multipart {
        let request = Request::builder()
            .method("POST")
            .header(
                header::CONTENT_TYPE,
                "multipart/form-data; boundary=evidence",
            )
            .body(Body::from(body))
            .unwrap();
        Multipart::from_request(request, &()).await.unwrap()
    }

    #[tokio::test]
    async fn test_upload_form_shares_description() {
        let body = "--evidence\r\n\
                    Content-Disposition: form-data; name=\"description\"\r\n\r\n\
                    Scale photo\r\n\
                    --evidence\r\n\
                    Content-Disposition: form-data; name=\"photos\"; filename=\"a.jpg\"\r\n\
                    Content-Type: image/jpeg\r\n\r\n\
                    jpeg-bytes\r\n\
                    --evidence\r\n\
                    Content-Disposition: form-data; name=\"photos\"; filename=\"\"\r\n\r\n\
                    \r\n\
                    --evidence--\r\n";
        let form = UploadForm::read(multipart(body).await).await.unwrap();

        assert_eq!(form.photos.len(), 1);
        assert_eq!(form.photos[0].file_name, "a.jpg");
        assert_eq!(form.photos[0].description.as_deref(), Some("Scale photo"));
    }

    #[tokio::test]
    async fn test_truncated_upload_is_an_error() {
        let body = "--evidence\r\n\
                    Content-Disposition: form-data; name=\"photos\"; filename=\"a.jpg\"\r\n\
                    Content-Type: image/jpeg\r\n\r\n\
                    jpeg-bytes";
        assert!(UploadForm::read(multipart(body).await).await.is_err());
    }

    #[test]
    fn test_item_row() {
        let officer = fixtures::officer("Abebe Kebede", Role::FieldOfficer);
        let mut item = fixtures::item("SZ-20240615-0001", "Khat bundles", &officer);
        item.status = ItemStatus::PendingDestruction;
        let row = ItemRow::from(&item);
        assert_eq!(row.quantity, "2.5 kg");
        assert_eq!(row.category, "Narcotics");
        assert_eq!(row.status_label, "Pending Destruction");
        assert_eq!(row.status_class, "status-pending_destruction");
        assert_eq!(row.seized_by, "Abebe Kebede");
        assert_eq!(row.seized_on, "Jun 15, 2024");
    }

    #[test]
    fn test_facts_include_only_present_optionals() {
        let officer = fixtures::officer("Abebe Kebede", Role::FieldOfficer);
        let mut item = fixtures::item("SZ-1", "Cash", &officer);
        item.gps_latitude = Some(9.0);
        item.gps_longitude = Some(38.75);
        item.weight_kg = Some(Decimal::new(150, 2));

        let facts = facts(&item);
        let get = |label: &str| facts.iter().find(|f| f.label == label).map(|f| f.value.clone());
        assert_eq!(get("Estimated Value").as_deref(), Some("ETB 12,500.00"));
        assert_eq!(get("GPS").as_deref(), Some("9.000000, 38.750000"));
        assert_eq!(get("Weight").as_deref(), Some("1.5 kg"));
        assert_eq!(get("Barcode"), None);
    }

    #[test]
    fn test_custody_rows_newest_first() {
        let item = ContrabandId::generate();
        let record = |reason: &str, day: u32, from: Option<&str>| CustodyRecord {
            id: CustodyRecordId::generate(),
            contraband_id: item,
            from_user_id: from.map(|_| UserId::generate()),
            to_user_id: UserId::generate(),
            transfer_reason: reason.into(),
            transfer_date: Utc.with_ymd_and_hms(2024, 6, day, 8, 0, 0).unwrap(),
            location: Some("Evidence Room A".into()),
            notes: None,
            from_user: from.map(|name| OfficerRef {
                full_name: name.into(),
                badge_number: None,
            }),
            to_user: Some(OfficerRef {
                full_name: "Selam Haile".into(),
                badge_number: Some("WM-3".into()),
            }),
        };
        let chain = vec![
            record("Storage", 2, Some("Abebe Kebede")),
            record("Initial seizure", 1, None),
        ];

        let rows = custody_rows(&chain);
        assert_eq!(rows[0].step, 2);
        assert_eq!(rows[0].reason, "Storage");
        assert_eq!(rows[0].from.as_deref(), Some("Abebe Kebede"));
        assert_eq!(rows[0].to, "Selam Haile (WM-3)");
        assert_eq!(rows[1].step, 1);
        assert_eq!(rows[1].from, None);
    }

    #[test]
    fn test_transfer_form_validation() {
        let item = ContrabandId::generate();
        let form = TransferForm {
            to_user_id: "not-an-id".into(),
            transfer_reason: "Storage".into(),
            location: "Warehouse B".into(),
            notes: String::new(),
        };
        assert_eq!(
            form.to_transfer(item).unwrap_err(),
            "Select the officer receiving custody"
        );

        let to = UserId::generate();
        let form = TransferForm {
            to_user_id: to.to_string(),
            transfer_reason: "  Destruction ".into(),
            location: "Incinerator".into(),
            notes: "  ".into(),
        };
        let transfer = form.to_transfer(item).unwrap();
        assert_eq!(transfer.to_user_id, to);
        assert_eq!(transfer.transfer_reason, "Destruction");
        assert_eq!(transfer.notes, None);

        let blank = TransferForm {
            to_user_id: to.to_string(),
            ..TransferForm::default()
        };
        assert!(blank.to_transfer(item).is_err());
    }

    #[test]
    fn test_recipients_exclude_self_and_inactive() {
        let me = fixtures::officer("Abebe Kebede", Role::FieldOfficer);
        let keeper = fixtures::officer("Selam Haile", Role::WarehouseManager);
        let mut retired = fixtures::officer("Dawit Alemu", Role::Supervisor);
        retired.is_active = false;

        let options = recipient_options(&[me.clone(), keeper.clone(), retired], me.id);
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].value, keeper.id.to_string());
        assert!(options[0].label.ends_with("- Warehouse Manager"));
    }

    #[test]
    fn test_status_options() {
        let options = status_options(Some(ItemStatus::Destroyed));
        assert_eq!(options.len(), 7);
        assert_eq!(options[0].value, "all");
        assert!(!options[0].selected);
        assert!(options.iter().any(|o| o.value == "destroyed" && o.selected));
    }

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(2048), "2.0 KB");
        assert_eq!(human_size(3 * 1024 * 1024), "3.0 MB");
    }
}
