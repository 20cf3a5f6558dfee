pub mod auth;
pub mod errors;
pub mod models;
pub mod routes;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Settings;
use crate::db::Database;
use crate::errors::AstraError;
use crate::lifecycle::ScanManager;
use crate::scanner::NmapProber;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub manager: Arc<ScanManager>,
}

pub fn create_app_state(settings: &Settings) -> Result<AppState, AstraError> {
    let db = Database::new(&settings.db_path)?;
    let prober = Arc::new(NmapProber::new(&settings.nmap_path, settings.probe_timeout_secs));
    let manager = Arc::new(ScanManager::new(db.clone(), prober, settings.max_concurrent_scans));
    Ok(AppState { db, manager })
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(routes::system::health_check))
        .route("/api/profiles", get(routes::system::list_profiles))
        .route("/api/stats", get(routes::system::company_stats))
        .route("/api/targets", post(routes::targets::create_target).get(routes::targets::list_targets))
        .route("/api/targets/:id", get(routes::targets::get_target))
        .route("/api/scans", post(routes::scans::create_scan).get(routes::scans::list_scans))
        .route("/api/scans/:id", get(routes::scans::get_scan).delete(routes::scans::delete_scan))
        .route("/api/scans/:id/cancel", post(routes::scans::cancel_scan))
        .route("/api/scans/:id/vulnerabilities", get(routes::scans::get_scan_vulnerabilities))
        .route("/api/vulnerabilities", get(routes::vulnerabilities::list_vulnerabilities))
        .route("/api/vulnerabilities/:id/status", put(routes::vulnerabilities::update_status))
        .route("/api/vulnerabilities/:id/assign", put(routes::vulnerabilities::assign))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
