//! Route table of the `/api/v1` surface.

pub mod attachments;
pub mod health;
pub mod records;
pub mod workflow;

use crate::state::AppState;
use axum::routing::get;
use axum::Router;
use registrar_core::{Course, Document, LibraryBook, Publication, University};

/// Versioned API routes with state applied.
pub fn api_router(state: AppState) -> Router {
    let body_limit = attachments::body_limit(state.upload_policy().max_bytes);

    let documents = records::routes::<Document>()
        .merge(attachments::owner_routes::<Document>(body_limit))
        .merge(workflow::routes::<Document>());
    let publications = records::routes::<Publication>()
        .merge(attachments::owner_routes::<Publication>(body_limit))
        .merge(workflow::routes::<Publication>());

    let api = Router::new()
        .nest("/universities", records::routes::<University>())
        .nest("/courses", records::routes::<Course>())
        .nest("/documents", documents)
        .nest("/publications", publications)
        .nest("/books", records::routes::<LibraryBook>())
        .merge(attachments::routes())
        .route("/health", get(health::health));

    Router::new().nest("/api/v1", api).with_state(state)
}
