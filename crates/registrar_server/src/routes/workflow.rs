//! Status transitions of documents and publications.

use crate::api::{ApiError, ApiJson, ApiPath, ApiResponse};
use crate::auth::CurrentActor;
use crate::state::AppState;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use registrar_core::{DocumentStatus, RecordId, RecordTable, Statusful, WorkflowService};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub status: String,
    #[serde(default)]
    pub comment: Option<String>,
}

pub fn routes<R>() -> Router<AppState>
where
    R: Statusful + RecordTable + Serialize + Send + 'static,
{
    Router::new().route("/:id/status", post(transition::<R>))
}

async fn transition<R>(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(request): ApiJson<TransitionRequest>,
) -> Result<Response, ApiError>
where
    R: Statusful + RecordTable + Serialize + Send + 'static,
{
    let target: DocumentStatus = request
        .status
        .parse()
        .map_err(|message: String| ApiError::field("status", message))?;
    let comment = request.comment;

    let record = state
        .run(move |ctx| {
            WorkflowService::<R>::new(ctx.conn).transition(id, target, comment.as_deref(), &actor)
        })
        .await?;
    Ok(ApiResponse::ok(format!("{} status changed to {}", R::KIND, target), record).into_response())
}
