//! Seizure registration.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, State},
    response::{IntoResponse, Redirect, Response},
};
use tracing::instrument;

use cms_core::records::Category;
use cms_core::seizure::SeizureForm;
use cms_core::{Capability, Unit};

use super::Shell;
use super::contraband::SelectOption;
use super::evidence::{PHOTO_FIELD, read_photo, upload_all};
use crate::client::{ClientError, EvidenceUpload};
use crate::error::AppError;
use crate::filters;
use crate::middleware::Officer;
use crate::middleware::session::push_flash;
use crate::models::Flash;
use crate::state::AppState;

/// Seizure registration form template.
#[derive(Template, WebTemplate)]
#[template(path = "seizures/new.html")]
pub struct SeizureFormTemplate {
    pub shell: Shell,
    pub form: SeizureForm,
    pub errors: Vec<String>,
    pub categories: Vec<SelectOption>,
    pub units: Vec<SelectOption>,
}

impl SeizureFormTemplate {
    fn new(shell: Shell, form: SeizureForm, errors: Vec<String>, categories: &[Category]) -> Self {
        let categories = categories
            .iter()
            .map(|c| {
                let id = c.id.to_string();
                let selected = id == form.category_id;
                SelectOption::new(id, format!("{} ({} risk)", c.name, c.risk_level.label()), selected)
            })
            .collect();
        let units = Unit::ALL
            .iter()
            .map(|u| SelectOption::new(u.as_str(), u.label(), u.as_str() == form.unit))
            .collect();
        Self {
            shell,
            form,
            errors,
            categories,
            units,
        }
    }
}

/// Registration form page.
///
/// GET /seizures/new
#[instrument(skip(officer, state), fields(user_id = %officer.id()))]
pub async fn new_form(
    officer: Officer,
    State(state): State<AppState>,
) -> Result<SeizureFormTemplate, AppError> {
    officer.require(Capability::RegisterSeizure)?;
    let mut shell = Shell::new(&officer, "register").await;
    let categories = shell.or_toast(
        state.api().categories(&officer.caller()).await,
        "categories",
    )?;

    let form = SeizureForm {
        unit: Unit::Kg.as_str().to_string(),
        ..SeizureForm::default()
    };
    Ok(SeizureFormTemplate::new(shell, form, Vec::new(), &categories))
}

/// The submitted form and the photos attached to it.
#[derive(Debug, Default)]
struct Submission {
    form: SeizureForm,
    photos: Vec<EvidenceUpload>,
}

impl Submission {
    async fn read(mut multipart: Multipart) -> Result<Self, String> {
        let mut submission = Self::default();
        while let Some(field) = multipart.next_field().await.map_err(|e| e.body_text())? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            if name == PHOTO_FIELD {
                if let Some(photo) = read_photo(field).await.map_err(|e| e.body_text())? {
                    submission.photos.push(photo);
                }
            } else {
                let value = field.text().await.map_err(|e| e.body_text())?;
                submission.form.set(&name, value);
            }
        }
        Ok(submission)
    }
}

/// Register a seizure, then upload its photos.
///
/// POST /seizures
#[instrument(skip(officer, state, multipart), fields(user_id = %officer.id()))]
pub async fn create(
    officer: Officer,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    officer.require(Capability::RegisterSeizure)?;
    let caller = officer.caller();

    let Submission { form, photos } = match Submission::read(multipart).await {
        Ok(submission) => submission,
        Err(message) => {
            tracing::warn!(error = %message, "Unreadable seizure form");
            push_flash(
                &officer.session,
                Flash::error(format!("The form could not be read: {message}")),
            )
            .await;
            return Ok(Redirect::to("/seizures/new").into_response());
        }
    };

    let new_item = match form.validate() {
        Ok(item) => item,
        Err(errors) => {
            let messages = errors.errors().iter().map(|e| e.message.clone()).collect();
            return rerender(&officer, &state, form, messages).await;
        }
    };

    let item = match state.api().create_item(&caller, &new_item).await {
        Ok(item) => item,
        Err(ClientError::Unauthorized) => return Err(ClientError::Unauthorized.into()),
        Err(e) => {
            tracing::warn!(error = %e, "Seizure registration rejected");
            return rerender(&officer, &state, form, vec![e.to_string()]).await;
        }
    };
    tracing::info!(
        seizure = %item.seizure_number,
        contraband_id = %item.id,
        photos = photos.len(),
        "Seizure registered"
    );

    let report = upload_all(state.api(), &caller, item.id, photos).await?;
    push_flash(
        &officer.session,
        Flash::success(format!(
            "Seizure {} has been successfully registered.",
            item.seizure_number
        )),
    )
    .await;
    if let Some(message) = report.failure_message() {
        push_flash(&officer.session, Flash::error(message)).await;
    }

    Ok(Redirect::to(&format!("/contraband/{}", item.id)).into_response())
}

/// Show the form again with what the officer typed and what went wrong.
async fn rerender(
    officer: &Officer,
    state: &AppState,
    form: SeizureForm,
    errors: Vec<String>,
) -> Result<Response, AppError> {
    let mut shell = Shell::new(officer, "register").await;
    let categories = shell.or_toast(
        state.api().categories(&officer.caller()).await,
        "categories",
    )?;
    Ok(SeizureFormTemplate::new(shell, form, errors, &categories).into_response())
}
