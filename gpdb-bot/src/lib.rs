//! gpdb-bot library - command service for the Gameplay Database
//!
//! Exposes the registry commands over HTTP. Mutations go through the
//! shared write queue; lookups read the store directly.

use axum::Router;
use gpdb_common::{Store, WriteQueue};
use std::path::PathBuf;
use std::time::Instant;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod auth;
pub mod backup;
pub mod error;
pub mod metadata;
pub mod reply;
pub mod scheduler;

use auth::ModeratorWhitelist;
use metadata::MetadataClient;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub queue: WriteQueue,
    pub whitelist: ModeratorWhitelist,
    pub metadata: MetadataClient,
    /// Directory holding backup snapshots
    pub saves_dir: PathBuf,
    pub startup_time: Instant,
}

impl AppState {
    pub fn new(
        store: Store,
        queue: WriteQueue,
        whitelist: ModeratorWhitelist,
        metadata: MetadataClient,
        saves_dir: PathBuf,
    ) -> Self {
        Self {
            store,
            queue,
            whitelist,
            metadata,
            saves_dir,
            startup_time: Instant::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::command_routes())
        .merge(api::registry_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
