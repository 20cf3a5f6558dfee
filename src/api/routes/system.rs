use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::api::AppState;
use crate::errors::AstraError;
use crate::lifecycle::UserContext;
use crate::scanner::PROFILE_CATALOG;

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "astrasecure",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn list_profiles() -> Json<Value> {
    Json(json!({ "profiles": PROFILE_CATALOG }))
}

pub async fn company_stats(
    State(state): State<AppState>,
    user: UserContext,
) -> Result<Json<Value>, AstraError> {
    let stats = state.db.company_stats(&user.company_id)?;
    Ok(Json(serde_json::to_value(stats)?))
}
