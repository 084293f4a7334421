use axum::{Router, routing::get};

use crate::handlers;
use crate::state::AppState;

pub fn routes(max_blob_size: u64) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::home::index))
        .nest("/gallery", gallery_routes())
        .merge(upload_routes(max_blob_size))
        .route("/blobs/{container}/{name}", get(handlers::blobs::get_blob))
}

fn gallery_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::gallery::index))
        .route("/tag/{tag}", get(handlers::gallery::by_tag))
        .route("/detail/{id}", get(handlers::gallery::detail))
        .route(
            "/edit/{id}",
            get(handlers::gallery::edit_form).post(handlers::gallery::edit),
        )
        .route(
            "/delete/{id}",
            get(handlers::gallery::delete_confirm).post(handlers::gallery::delete),
        )
}

fn upload_routes(max_blob_size: u64) -> Router<AppState> {
    Router::new()
        .route(
            "/upload",
            get(handlers::upload::upload_form).post(handlers::upload::upload),
        )
        .layer(handlers::upload::upload_body_limit(max_blob_size))
}
