//! Registrar HTTP server: JSON API over the registrar core services.

pub mod api;
pub mod auth;
pub mod config;
pub mod routes;
pub mod state;

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use config::{Config, CorsConfig};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

pub use auth::{CurrentActor, IdentityProvider, StaticTokenProvider};
pub use state::AppState;

/// Create CORS layer from configuration
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(3600));

    if config.allowed_origins.is_empty() || config.allowed_origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

/// Applies upload and identity settings from `config` to a fresh state.
pub fn configure_state(state: AppState, config: &Config) -> AppState {
    state
        .with_upload_policy(config.uploads.policy())
        .with_identity_provider(Arc::new(StaticTokenProvider::new(
            config.auth.tokens.clone(),
        )))
        .with_require_actor(config.auth.require_actor)
}

/// The full application: API routes plus CORS.
pub fn app(state: AppState, config: &Config) -> Router {
    routes::api_router(state).layer(cors_layer(&config.cors))
}
