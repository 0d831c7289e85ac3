//! Evidence photo uploads shared by seizure registration and item detail.

use axum::extract::multipart::Field;

use cms_core::ContrabandId;

use crate::client::{ApiClient, Caller, ClientError, EvidenceUpload};

/// Multipart field name of the file input.
pub const PHOTO_FIELD: &str = "photos";

/// Read one file input. Empty inputs (nothing chosen) yield `None`.
///
/// # Errors
///
/// Returns the multipart error if the body cannot be read.
pub async fn read_photo(
    field: Field<'_>,
) -> Result<Option<EvidenceUpload>, axum::extract::multipart::MultipartError> {
    let file_name = field
        .file_name()
        .map(str::to_owned)
        .filter(|name| !name.is_empty());
    let content_type = field.content_type().map(str::to_owned);
    let bytes = field.bytes().await?;

    Ok(file_name.filter(|_| !bytes.is_empty()).map(|file_name| EvidenceUpload {
        file_name,
        content_type,
        bytes: bytes.to_vec(),
        description: None,
    }))
}

/// Outcome of uploading a batch of photos.
#[derive(Debug, Default)]
pub struct UploadReport {
    pub stored: usize,
    pub failed: Vec<String>,
}

impl UploadReport {
    /// Toast text for failures, if any.
    #[must_use]
    pub fn failure_message(&self) -> Option<String> {
        (!self.failed.is_empty()).then(|| {
            format!(
                "{} file(s) could not be uploaded: {}",
                self.failed.len(),
                self.failed.join(", ")
            )
        })
    }
}

/// Upload every photo for `item`, one at a time.
///
/// # Errors
///
/// Only an expired token aborts the batch; other failures are collected.
pub async fn upload_all(
    api: &ApiClient,
    caller: &Caller<'_>,
    item: ContrabandId,
    photos: Vec<EvidenceUpload>,
) -> Result<UploadReport, ClientError> {
    let mut report = UploadReport::default();
    for photo in photos {
        let name = photo.file_name.clone();
        match api.upload(caller, item, photo).await {
            Ok(stored) => {
                tracing::debug!(file = %stored.file_name, "Evidence photo uploaded");
                report.stored += 1;
            }
            Err(ClientError::Unauthorized) => return Err(ClientError::Unauthorized),
            Err(e) => {
                tracing::warn!(error = %e, file = %name, "Evidence upload failed");
                report.failed.push(name);
            }
        }
    }
    Ok(report)
}
