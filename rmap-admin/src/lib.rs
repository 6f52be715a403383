//! rmap-admin library interface
//!
//! Exposes the admin service internals for integration testing.

pub mod api;
pub mod error;
pub mod ingest;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use anyhow::Context;
use axum::Router;
use chrono::{DateTime, Utc};
use rmap_common::config::TomlConfig;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::ingest::{PromotionPipeline, StagingPipeline};
use crate::models::UploadSession;
use crate::services::{Geocoder, LocalObjectStore, Mailer};

/// Serializes every writer of the staging/production listing tables
pub type PipelineLock = Arc<Mutex<()>>;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<TomlConfig>,
    /// Upload wizard sessions keyed by session cookie
    pub sessions: Arc<RwLock<HashMap<Uuid, UploadSession>>>,
    pub pipeline_lock: PipelineLock,
    pub staging: StagingPipeline,
    pub promotion: PromotionPipeline,
    pub geocoder: Arc<Geocoder>,
    pub mailer: Arc<Mailer>,
    pub images: Arc<LocalObjectStore>,
    /// Service startup timestamp for uptime reporting
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, config: TomlConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        let pipeline_lock: PipelineLock = Arc::new(Mutex::new(()));

        let geocoder = Geocoder::new(&config.geocoder, config.region)
            .context("Failed to build geocoding client")?;
        let mailer = Mailer::new(&config.email).context("Failed to build email client")?;
        let images = LocalObjectStore::new(config.image_root.clone());

        Ok(Self {
            staging: StagingPipeline::new(db.clone(), Arc::clone(&config), Arc::clone(&pipeline_lock)),
            promotion: PromotionPipeline::new(db.clone(), Arc::clone(&pipeline_lock)),
            db,
            config,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            pipeline_lock,
            geocoder: Arc::new(geocoder),
            mailer: Arc::new(mailer),
            images: Arc::new(images),
            startup_time: Utc::now(),
        })
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::upload_routes())
        .merge(api::listing_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
