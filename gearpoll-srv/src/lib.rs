//! gearpoll-srv library - pairwise gear-impact survey service
//!
//! Serves the survey web UI, manages per-respondent sessions, and records
//! judgments to the answer log.

use axum::Router;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;

use gearpoll_common::catalog::Catalog;
use gearpoll_common::config::ServiceConfig;
use gearpoll_common::Language;

pub mod api;
pub mod error;
pub mod images;
pub mod sessions;

use images::ImageCache;
use sessions::SessionStore;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Answer log database
    pub db: SqlitePool,
    /// Loaded catalogs, one per supported language
    pub catalogs: Arc<HashMap<Language, Arc<Catalog>>>,
    /// Downscaled catalog image cache
    pub images: ImageCache,
    /// Live survey sessions keyed by session token
    pub sessions: SessionStore,
    /// Resolved service configuration
    pub config: Arc<ServiceConfig>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        catalogs: HashMap<Language, Arc<Catalog>>,
        config: ServiceConfig,
    ) -> Self {
        let images = ImageCache::new(config.image_folder.clone(), config.image_scale);
        Self {
            db,
            catalogs: Arc::new(catalogs),
            images,
            sessions: SessionStore::new(),
            config: Arc::new(config),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    Router::new()
        .route("/", get(api::serve_index))
        .route("/static/app.js", get(api::serve_app_js))
        .route("/api/session", post(api::create_session))
        .route("/api/session/:id/current", get(api::current_pair))
        .route("/api/session/:id/answer", post(api::submit_answer))
        .route("/api/session/:id/progress", get(api::session_progress))
        .route("/api/images/:file", get(api::serve_image))
        .merge(api::health_routes())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}
