use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use sea_orm::DbErr;
use tracing::{error, info, instrument};

use crate::error::AppError;
use crate::extractors::form::AppForm;
use crate::extractors::path::AppPath;
use crate::extractors::query::AppQuery;
use crate::models::gallery::{EditImageForm, GalleryQuery};
use crate::models::image::{GalleryDetailModel, GalleryImage, ImageTag};
use crate::models::paging::PagedList;
use crate::state::AppState;
use crate::views;

async fn find_image(state: &AppState, id: i32) -> Result<GalleryImage, AppError> {
    state
        .images
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Image {id} not found")))
}

/// Paged, optionally filtered list. The filter is a case-sensitive substring
/// match on the title.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<GalleryQuery>,
) -> Result<Response, AppError> {
    if query.page_number < 1 {
        return Ok(Redirect::to(&query.first_page_location()).into_response());
    }

    let filter = query.effective_filter();
    let images: Vec<GalleryDetailModel> = state
        .images
        .get_all()
        .await?
        .into_iter()
        .filter(|image| filter.is_none_or(|f| image.title.contains(f)))
        .map(GalleryDetailModel::from)
        .collect();

    let page = PagedList::create(images, query.effective_page(), query.effective_page_size());
    Ok(Html(views::gallery_index(&page, filter)).into_response())
}

#[instrument(skip(state))]
pub async fn by_tag(
    State(state): State<AppState>,
    AppPath(tag): AppPath<String>,
) -> Result<Html<String>, AppError> {
    let images = state.images.get_with_tag(&tag).await?;
    Ok(Html(views::tagged(&tag, images)))
}

#[instrument(skip(state))]
pub async fn detail(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> Result<Html<String>, AppError> {
    let image = find_image(&state, id).await?;
    Ok(Html(views::detail(&image.into())))
}

#[instrument(skip(state))]
pub async fn edit_form(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> Result<Html<String>, AppError> {
    let image = find_image(&state, id).await?;
    Ok(Html(views::edit(id, &image.title, &image.tags_text(), None)))
}

/// Save title and tags. The URL and creation time are carried over from the
/// stored record. Storage failures re-render the form with the submitted
/// values and status 500.
#[instrument(skip(state, form), fields(title = %form.title))]
pub async fn edit(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
    AppForm(form): AppForm<EditImageForm>,
) -> Result<Response, AppError> {
    let result: Result<Option<GalleryImage>, DbErr> = async {
        let Some(mut image) = state.images.get_by_id(id).await? else {
            return Ok(None);
        };
        image.title = form.title.clone();
        image.tags = state
            .images
            .parse_tags(&form.tags)
            .into_iter()
            .map(|description| ImageTag { id: 0, description })
            .collect();
        state.images.update_image(&image).await
    }
    .await;

    match result {
        Ok(Some(image)) => {
            info!(id = image.id, "Updated image");
            Ok(Redirect::to("/gallery").into_response())
        }
        Ok(None) => Err(AppError::NotFound(format!("Image {id} not found"))),
        Err(e) => {
            error!(id, error = %e, "Failed to update image");
            let page = views::edit(id, &form.title, &form.tags, Some("The image could not be saved."));
            Ok((StatusCode::INTERNAL_SERVER_ERROR, Html(page)).into_response())
        }
    }
}

#[instrument(skip(state))]
pub async fn delete_confirm(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> Result<Html<String>, AppError> {
    let image = find_image(&state, id).await?;
    Ok(Html(views::delete_confirm(&image, None)))
}

/// Remove the record and its tags; the stored blob is left in place.
/// Failures re-render the confirmation page with status 500.
#[instrument(skip(state))]
pub async fn delete(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> Result<Response, AppError> {
    let err = match state.images.delete_image(id).await {
        Ok(Some(image)) => {
            info!(id = image.id, title = %image.title, "Deleted image");
            return Ok(Redirect::to("/gallery").into_response());
        }
        Ok(None) => return Err(AppError::NotFound(format!("Image {id} not found"))),
        Err(e) => e,
    };

    error!(id, error = %err, "Failed to delete image");
    match state.images.get_by_id(id).await {
        Ok(Some(image)) => {
            let page = views::delete_confirm(&image, Some("The image could not be deleted."));
            Ok((StatusCode::INTERNAL_SERVER_ERROR, Html(page)).into_response())
        }
        Ok(None) => Err(AppError::NotFound(format!("Image {id} not found"))),
        Err(_) => Err(AppError::Internal(err.to_string())),
    }
}
