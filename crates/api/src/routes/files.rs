//! Evidence file upload and download.

use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, Request, State, multipart::MultipartError},
    http::StatusCode,
    response::Response,
};
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::instrument;

use cms_core::{Capability, ContrabandId};
use cms_core::records::UploadedFile;
use cms_core::validate::non_blank;

use crate::db::EvidenceFileRepository;
use crate::db::files::NewEvidenceFile;
use crate::error::{ApiError, Result};
use crate::middleware::{AuthUser, ClientIp};
use crate::services::storage::{is_safe_name, stored_name};
use crate::state::AppState;

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge
        } else {
            Self::BadRequest(err.body_text())
        }
    }
}

/// The three parts of an upload form.
#[derive(Debug, Default)]
struct UploadForm {
    file_name: Option<String>,
    content_type: Option<String>,
    contents: Option<Vec<u8>>,
    contraband_id: Option<String>,
    description: Option<String>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            match field.name() {
                Some("file") => {
                    form.file_name = field.file_name().map(str::to_owned);
                    form.content_type = field.content_type().map(str::to_owned);
                    form.contents = Some(field.bytes().await?.to_vec());
                }
                Some("contraband_id") => form.contraband_id = Some(field.text().await?),
                Some("description") => form.description = non_blank(&field.text().await?),
                _ => {}
            }
        }
        Ok(form)
    }

    fn contraband_id(&self) -> Result<ContrabandId> {
        self.contraband_id
            .as_deref()
            .ok_or_else(|| ApiError::BadRequest("contraband_id is required".to_string()))?
            .parse()
            .map_err(|_| ApiError::BadRequest("contraband_id is not a valid id".to_string()))
    }
}

/// `POST /files/upload`
///
/// Attaching evidence needs the same role as changing an item's status, and
/// destroyed or released items take no new files.
#[instrument(skip(caller, state, ip, multipart), fields(user_id = %caller.id()))]
pub async fn upload(
    caller: AuthUser,
    State(state): State<AppState>,
    ip: ClientIp,
    multipart: Multipart,
) -> Result<(StatusCode, Json<UploadedFile>)> {
    caller.require(Capability::ChangeStatus)?;
    let form = UploadForm::read(multipart).await?;
    let contraband_id = form.contraband_id()?;
    let contents = form
        .contents
        .as_deref()
        .filter(|bytes| !bytes.is_empty())
        .ok_or_else(|| ApiError::BadRequest("file is required".to_string()))?;

    let name = stored_name(form.file_name.as_deref());
    let file_url = format!("/files/{name}");
    let original_name = form.file_name.clone().unwrap_or_else(|| name.clone());

    state
        .files()
        .save(&name, contents)
        .await
        .map_err(|e| ApiError::Internal(format!("failed to store upload: {e}")))?;

    let record = NewEvidenceFile {
        contraband_id,
        file_name: &original_name,
        file_type: form.content_type.as_deref(),
        file_size: i64::try_from(contents.len()).unwrap_or(i64::MAX),
        file_url: &file_url,
        description: form.description.as_deref(),
    };
    if let Err(e) = EvidenceFileRepository::new(state.pool())
        .create(&record, caller.id(), ip.as_deref())
        .await
    {
        state.files().discard(&name).await;
        return Err(e.into());
    }

    tracing::info!(file = %name, %contraband_id, size = contents.len(), "Evidence file stored");
    Ok((
        StatusCode::CREATED,
        Json(UploadedFile {
            file_url,
            file_name: name,
        }),
    ))
}

/// `GET /files/{file_name}`
///
/// Public so evidence photos can be embedded by the console. Names are
/// random UUIDs, so they are not guessable.
#[instrument(skip(state, request))]
pub async fn download(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
    request: Request,
) -> Result<Response> {
    if !is_safe_name(&file_name) {
        return Err(ApiError::BadRequest("Invalid file name".to_string()));
    }

    let response = ServeFile::new(state.files().path_of(&file_name))
        .oneshot(request)
        .await
        .unwrap_or_else(|never| match never {});
    Ok(response.map(Body::new))
}
