//! Attachment upload, listing, download and removal.

use crate::api::{ApiError, ApiPath, ApiResponse};
use crate::auth::CurrentActor;
use crate::state::AppState;
use axum::body::Body;
use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::{DefaultBodyLimit, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::Router;
use registrar_core::{
    Attachment, AttachmentId, AttachmentService, OwnerRef, RecordId, RecordService, RecordTable,
    Upload,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Multipart framing allowance on top of the file size limit.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Owner-scoped routes, mounted below an attachable collection.
pub fn owner_routes<R>(body_limit: usize) -> Router<AppState>
where
    R: RecordTable + Serialize + Send + 'static,
    R::Input: DeserializeOwned + Send + 'static,
{
    Router::new()
        .route(
            "/:id/attachments",
            get(list::<R>)
                .post(attach::<R>)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .route(
            "/with-attachment",
            post(create_with_attachment::<R>).layer(DefaultBodyLimit::max(body_limit)),
        )
}

/// Attachment-id routes, mounted at the API root.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/attachments/:id", delete(detach))
        .route("/attachments/:id/download", get(download))
}

/// Request body limit for a given file size limit.
pub fn body_limit(max_upload_bytes: u64) -> usize {
    usize::try_from(max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES)
}

#[derive(Serialize)]
struct CreatedWithAttachment<R> {
    record: R,
    attachment: Attachment,
}

/// Fields of an upload request.
#[derive(Default)]
struct UploadForm {
    file: Option<Upload>,
    data: Option<String>,
}

async fn read_form(multipart: Result<Multipart, MultipartRejection>) -> Result<UploadForm, ApiError> {
    let mut multipart = multipart?;
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let mime_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                let mut upload = Upload::new(file_name, bytes.to_vec());
                if let Some(mime_type) = mime_type {
                    upload = upload.with_mime_type(mime_type);
                }
                form.file = Some(upload);
            }
            Some("data") => form.data = Some(field.text().await?),
            _ => {}
        }
    }
    Ok(form)
}

fn require_file(form: &mut UploadForm) -> Result<Upload, ApiError> {
    form.file
        .take()
        .ok_or_else(|| ApiError::field("file", "the file field is required"))
}

async fn attach<R>(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(id): ApiPath<RecordId>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError>
where
    R: RecordTable + Send + 'static,
{
    let upload = require_file(&mut read_form(multipart).await?)?;
    let owner = OwnerRef::new(R::KIND, id);
    let attachment = state
        .run(move |ctx| {
            AttachmentService::new(ctx.conn, ctx.blobs, ctx.policy).attach(owner, upload, &actor)
        })
        .await?;
    Ok(ApiResponse::created("attachment stored", attachment).into_response())
}

async fn list<R>(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<RecordId>,
) -> Result<Response, ApiError>
where
    R: RecordTable + Send + 'static,
{
    let owner = OwnerRef::new(R::KIND, id);
    let attachments = state
        .run(move |ctx| AttachmentService::new(ctx.conn, ctx.blobs, ctx.policy).list(owner))
        .await?;
    Ok(ApiResponse::ok("attachment list", attachments).into_response())
}

/// Creates a record from the `data` JSON field together with `file`.
async fn create_with_attachment<R>(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError>
where
    R: RecordTable + Serialize + Send + 'static,
    R::Input: DeserializeOwned + Send + 'static,
{
    let mut form = read_form(multipart).await?;
    let upload = require_file(&mut form)?;
    let data = form
        .data
        .ok_or_else(|| ApiError::field("data", "the data field is required"))?;
    let input: R::Input = serde_json::from_str(&data)
        .map_err(|err| ApiError::field("data", format!("invalid JSON: {err}")))?;

    let (record, attachment) = state
        .run(move |ctx| {
            RecordService::<R, _>::new(ctx.conn, ctx.blobs).create_with_attachment(
                input,
                upload,
                ctx.policy,
                &actor,
            )
        })
        .await?;
    Ok(ApiResponse::created(
        format!("{} created", R::KIND),
        CreatedWithAttachment { record, attachment },
    )
    .into_response())
}

async fn download(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AttachmentId>,
) -> Result<Response, ApiError> {
    let (attachment, bytes) = state
        .run(move |ctx| AttachmentService::new(ctx.conn, ctx.blobs, ctx.policy).download(id))
        .await?;

    let content_type = HeaderValue::from_str(&attachment.mime_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        header_safe_filename(&attachment.original_name)
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, content_type),
            (CONTENT_DISPOSITION, disposition),
        ],
        Body::from(bytes),
    )
        .into_response())
}

async fn detach(
    State(state): State<AppState>,
    CurrentActor(_actor): CurrentActor,
    ApiPath(id): ApiPath<AttachmentId>,
) -> Result<Response, ApiError> {
    let attachment = state
        .run(move |ctx| AttachmentService::new(ctx.conn, ctx.blobs, ctx.policy).detach(id))
        .await?;
    Ok(ApiResponse::ok("attachment deleted", attachment).into_response())
}

/// Printable ASCII without quotes or backslashes.
fn header_safe_filename(name: &str) -> String {
    name.chars()
        .map(|ch| match ch {
            '"' | '\\' => '_',
            ch if ch.is_ascii_graphic() || ch == ' ' => ch,
            _ => '_',
        })
        .collect()
}
