//! CRUD and trash routes shared by every record kind.

use crate::api::{ApiError, ApiJson, ApiPath, ApiQuery, ApiResponse};
use crate::auth::CurrentActor;
use crate::state::AppState;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::Router;
use log::info;
use registrar_core::{ListQuery, RecordId, RecordService, RecordTable, TrashFilter};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub trashed: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ShowParams {
    pub trashed: Option<String>,
}

/// Routes for one record kind, mounted below its collection segment.
pub fn routes<R>() -> Router<AppState>
where
    R: RecordTable + Serialize + Send + 'static,
    R::Input: DeserializeOwned + Send + 'static,
{
    Router::new()
        .route("/", get(list::<R>).post(create::<R>))
        .route("/:id", get(show::<R>).put(update::<R>).delete(destroy::<R>))
        .route("/:id/restore", post(restore::<R>))
        .route("/:id/force", delete(force_delete::<R>))
}

pub(crate) fn parse_trashed(value: Option<&str>) -> Result<TrashFilter, ApiError> {
    value
        .unwrap_or_default()
        .parse()
        .map_err(|message: String| ApiError::field("trashed", message))
}

async fn list<R>(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> Result<Response, ApiError>
where
    R: RecordTable + Serialize + Send + 'static,
{
    let query = ListQuery {
        trashed: parse_trashed(params.trashed.as_deref())?,
        limit: params.limit,
        offset: params.offset.unwrap_or(0),
    };
    let records = state
        .run(move |ctx| RecordService::<R, _>::new(ctx.conn, ctx.blobs).list(&query))
        .await?;
    Ok(ApiResponse::ok(format!("{} list", R::KIND), records).into_response())
}

async fn show<R>(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<RecordId>,
    ApiQuery(params): ApiQuery<ShowParams>,
) -> Result<Response, ApiError>
where
    R: RecordTable + Serialize + Send + 'static,
{
    let trashed = parse_trashed(params.trashed.as_deref())?;
    let record = state
        .run(move |ctx| RecordService::<R, _>::new(ctx.conn, ctx.blobs).get(id, trashed))
        .await?;
    Ok(ApiResponse::ok(format!("{} found", R::KIND), record).into_response())
}

async fn create<R>(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiJson(input): ApiJson<R::Input>,
) -> Result<Response, ApiError>
where
    R: RecordTable + Serialize + Send + 'static,
    R::Input: DeserializeOwned + Send + 'static,
{
    let record = state
        .run(move |ctx| RecordService::<R, _>::new(ctx.conn, ctx.blobs).create(input, &actor))
        .await?;
    Ok(ApiResponse::created(format!("{} created", R::KIND), record).into_response())
}

async fn update<R>(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(input): ApiJson<R::Input>,
) -> Result<Response, ApiError>
where
    R: RecordTable + Serialize + Send + 'static,
    R::Input: DeserializeOwned + Send + 'static,
{
    let record = state
        .run(move |ctx| RecordService::<R, _>::new(ctx.conn, ctx.blobs).update(id, input, &actor))
        .await?;
    Ok(ApiResponse::ok(format!("{} updated", R::KIND), record).into_response())
}

async fn destroy<R>(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(id): ApiPath<RecordId>,
) -> Result<Response, ApiError>
where
    R: RecordTable + Serialize + Send + 'static,
{
    let record = state
        .run(move |ctx| RecordService::<R, _>::new(ctx.conn, ctx.blobs).delete(id, &actor))
        .await?;
    Ok(ApiResponse::ok(format!("{} moved to trash", R::KIND), record).into_response())
}

async fn restore<R>(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(id): ApiPath<RecordId>,
) -> Result<Response, ApiError>
where
    R: RecordTable + Serialize + Send + 'static,
{
    let record = state
        .run(move |ctx| RecordService::<R, _>::new(ctx.conn, ctx.blobs).restore(id))
        .await?;
    info!(
        "event=http_restore module=api status=ok kind={} id={} actor={}",
        R::KIND,
        id,
        actor
    );
    Ok(ApiResponse::ok(format!("{} restored", R::KIND), record).into_response())
}

async fn force_delete<R>(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(id): ApiPath<RecordId>,
) -> Result<Response, ApiError>
where
    R: RecordTable + Serialize + Send + 'static,
{
    let report = state
        .run(move |ctx| RecordService::<R, _>::new(ctx.conn, ctx.blobs).force_delete(id))
        .await?;
    info!(
        "event=http_purge module=api status=ok kind={} id={} attachments_removed={} actor={}",
        R::KIND,
        id,
        report.attachments_removed,
        actor
    );
    Ok(ApiResponse::ok(format!("{} permanently deleted", R::KIND), report).into_response())
}
