use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::response::{Html, Redirect};
use bytes::Bytes;
use common::storage::StorageError;
use common::storage::name::blob_name_from_upload;
use tracing::{info, instrument};
use url::Url;

use crate::error::AppError;
use crate::state::AppState;
use crate::storage::ensure_container;
use crate::views;

/// Room for the text fields and multipart framing on top of the file itself.
const FORM_OVERHEAD: usize = 64 * 1024;

/// Body limit for the upload route.
pub fn upload_body_limit(max_blob_size: u64) -> DefaultBodyLimit {
    let limit = usize::try_from(max_blob_size)
        .unwrap_or(usize::MAX)
        .saturating_add(FORM_OVERHEAD);
    DefaultBodyLimit::max(limit)
}

struct UploadedFile {
    file_name: Option<String>,
    content_type: Option<String>,
    data: Bytes,
}

pub async fn upload_form() -> Html<String> {
    Html(views::upload_form())
}

/// Store the file in the images container and record it.
///
/// Missing or empty files are rejected with 400. Any storage or database
/// failure is logged and answered with a generic 500.
#[instrument(skip(state, multipart))]
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Redirect, AppError> {
    let mut title = String::new();
    let mut tags = String::new();
    let mut file: Option<UploadedFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        match field.name() {
            Some("title") => {
                title = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read title: {e}")))?;
            }
            Some("tags") => {
                tags = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read tags: {e}")))?;
            }
            Some("file") => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read file: {e}")))?;
                file = Some(UploadedFile {
                    file_name,
                    content_type,
                    data,
                });
            }
            _ => {} // Ignore unknown fields.
        }
    }

    let file = file.ok_or_else(|| AppError::Validation("Missing 'file' field".into()))?;
    if file.data.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".into()));
    }
    let max_size = state.config.storage.max_blob_size;
    if file.data.len() as u64 > max_size {
        return Err(AppError::Validation(format!(
            "File is larger than {max_size} bytes"
        )));
    }

    let file_name = file
        .file_name
        .ok_or_else(|| AppError::Validation("File field must have a filename".into()))?;
    let name = blob_name_from_upload(&file_name)
        .map_err(|e| AppError::Validation(e.message().into()))?
        .to_string();
    let content_type = file
        .content_type
        .filter(|ct| !ct.is_empty())
        .or_else(|| mime_guess::from_path(&name).first().map(|m| m.to_string()));

    let uri = store_blob(&state, &name, content_type.as_deref(), file.data)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to store blob '{name}': {e}")))?;

    let image = state
        .images
        .set_image(&title, &tags, &uri)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to record image '{name}': {e}")))?;

    info!(id = image.id, %uri, "Uploaded image");
    Ok(Redirect::to("/gallery"))
}

/// Replace any blob of the same name with the uploaded bytes.
async fn store_blob(
    state: &AppState,
    name: &str,
    content_type: Option<&str>,
    data: Bytes,
) -> Result<Url, StorageError> {
    let store = &*state.blob_store;
    let container = &state.config.storage.container;

    ensure_container(store, container).await?;
    store.delete_if_exists(container, name).await?;
    store.put(container, name, content_type, data).await
}
