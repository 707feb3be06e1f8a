//! Actor resolution from bearer tokens.
//!
//! Identity itself is owned by an external provider; this module only maps
//! an already-issued token to an actor id.

use crate::api::ApiError;
use crate::state::AppState;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::{HeaderMap, Method};
use registrar_core::{ActorContext, ActorId};
use std::collections::BTreeMap;

/// Maps bearer tokens to actor ids.
pub trait IdentityProvider: Send + Sync {
    /// `None` when the token is unknown.
    fn resolve(&self, token: &str) -> Option<ActorId>;
}

/// Fixed token table loaded from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenProvider {
    tokens: BTreeMap<String, ActorId>,
}

impl StaticTokenProvider {
    pub fn new(tokens: BTreeMap<String, ActorId>) -> Self {
        Self { tokens }
    }
}

impl IdentityProvider for StaticTokenProvider {
    fn resolve(&self, token: &str) -> Option<ActorId> {
        self.tokens.get(token).copied()
    }
}

/// Actor of the current request.
///
/// No `Authorization` header means anonymous; an unknown or malformed token
/// is 401. With `require_actor` set, anonymous mutations are 401 as well.
#[derive(Debug, Clone, Copy)]
pub struct CurrentActor(pub ActorContext);

#[async_trait]
impl FromRequestParts<AppState> for CurrentActor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let actor = match bearer_token(&parts.headers)? {
            Some(token) => state
                .identity()
                .resolve(token)
                .map(ActorContext::authenticated)
                .ok_or(ApiError::InvalidToken)?,
            None => ActorContext::anonymous(),
        };

        if state.require_actor() && !actor.is_authenticated() && is_mutation(&parts.method) {
            return Err(ApiError::Unauthenticated);
        }
        Ok(CurrentActor(actor))
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, ApiError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| ApiError::InvalidToken)?;
    let (scheme, token) = value.trim().split_once(' ').ok_or(ApiError::InvalidToken)?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(ApiError::InvalidToken);
    }
    Ok(Some(token.trim()))
}

fn is_mutation(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}
