use axum::extract::State;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use tracing::instrument;

use crate::error::AppError;
use crate::extractors::path::AppPath;
use crate::state::AppState;

/// Serve a stored blob. Used by the filesystem backend, whose blob URIs point
/// back at this route.
#[instrument(skip(state))]
pub async fn get_blob(
    State(state): State<AppState>,
    AppPath((container, name)): AppPath<(String, String)>,
) -> Result<Response, AppError> {
    let blob = state.blob_store.get(&container, &name).await?;

    let content_type = blob
        .content_type
        .or_else(|| mime_guess::from_path(&name).first().map(|m| m.to_string()))
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let content_type = HeaderValue::from_str(&content_type)
        .unwrap_or(HeaderValue::from_static("application/octet-stream"));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (
                header::CACHE_CONTROL,
                HeaderValue::from_static("public, max-age=3600"),
            ),
            (
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ),
        ],
        blob.data,
    )
        .into_response())
}
