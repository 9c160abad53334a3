//! Upload server routes.

use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers::{upload_cv, upload_photo};
use crate::state::UploadState;

/// Build the upload router.
///
/// Size limits are enforced per kind while streaming, so the default body
/// limit is off.
pub fn create_router(state: UploadState) -> Router {
    let files = ServeDir::new(state.store.root());

    Router::new()
        .route("/api/upload/cv", post(upload_cv))
        .route("/api/upload/photo", post(upload_photo))
        .nest_service("/uploads", files)
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
