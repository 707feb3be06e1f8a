//! Liveness and database connectivity probe.

use crate::api::{ApiError, ApiResponse};
use crate::state::AppState;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub database: &'static str,
    pub version: &'static str,
}

pub async fn health(State(state): State<AppState>) -> Result<Response, ApiError> {
    state
        .run(|ctx| {
            ctx.conn
                .query_row("SELECT 1;", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
        .await?;
    Ok(ApiResponse::ok(
        "healthy",
        HealthStatus {
            status: "healthy",
            database: "connected",
            version: registrar_core::core_version(),
        },
    )
    .into_response())
}
