//! Shared application state.
//!
//! One SQLite connection sits behind a mutex; every service call runs on
//! tokio's blocking pool so async workers never wait on SQLite or disk.

use crate::api::ApiError;
use crate::auth::{IdentityProvider, StaticTokenProvider};
use registrar_core::{BlobStore, ServiceResult, UploadPolicy};
use rusqlite::Connection;
use std::sync::{Arc, Mutex, PoisonError};

/// Borrowed resources handed to one service call.
pub struct ServiceContext<'a> {
    pub conn: &'a Connection,
    pub blobs: &'a dyn BlobStore,
    pub policy: &'a UploadPolicy,
}

#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Connection>>,
    blobs: Arc<dyn BlobStore>,
    policy: Arc<UploadPolicy>,
    identity: Arc<dyn IdentityProvider>,
    require_actor: bool,
}

impl AppState {
    /// State with the default upload policy and no known tokens.
    pub fn new(conn: Connection, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            blobs,
            policy: Arc::new(UploadPolicy::default()),
            identity: Arc::new(StaticTokenProvider::default()),
            require_actor: false,
        }
    }

    pub fn with_upload_policy(mut self, policy: UploadPolicy) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    pub fn with_identity_provider(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_require_actor(mut self, require_actor: bool) -> Self {
        self.require_actor = require_actor;
        self
    }

    pub fn upload_policy(&self) -> &UploadPolicy {
        &self.policy
    }

    pub fn identity(&self) -> &dyn IdentityProvider {
        self.identity.as_ref()
    }

    pub fn require_actor(&self) -> bool {
        self.require_actor
    }

    /// Runs `op` with the connection held, on the blocking pool.
    pub async fn run<T, F>(&self, op: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(ServiceContext<'_>) -> ServiceResult<T> + Send + 'static,
    {
        let state = self.clone();
        let result = tokio::task::spawn_blocking(move || {
            let conn = state.db.lock().unwrap_or_else(PoisonError::into_inner);
            op(ServiceContext {
                conn: &conn,
                blobs: state.blobs.as_ref(),
                policy: state.policy.as_ref(),
            })
        })
        .await?;
        Ok(result?)
    }
}
