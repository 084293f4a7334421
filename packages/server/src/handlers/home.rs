use axum::extract::State;
use axum::response::Html;
use tracing::instrument;

use crate::error::AppError;
use crate::state::AppState;
use crate::views;

#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let images = state.images.get_all().await?;
    Ok(Html(views::home(images)))
}
