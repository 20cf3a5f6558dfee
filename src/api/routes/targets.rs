use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::info;

use crate::api::models::ListQuery;
use crate::api::AppState;
use crate::errors::AstraError;
use crate::lifecycle::UserContext;
use crate::models::CreateTarget;

pub async fn create_target(
    State(state): State<AppState>,
    user: UserContext,
    Json(req): Json<CreateTarget>,
) -> Result<(StatusCode, Json<Value>), AstraError> {
    if req.target_value.trim().is_empty() {
        return Err(AstraError::Config("target_value must not be empty".into()));
    }

    let target = state.db.create_target(&user.company_id, &req)?;
    info!(target_id = %target.id, company_id = %user.company_id, "Target created");
    Ok((StatusCode::CREATED, Json(serde_json::to_value(target)?)))
}

pub async fn list_targets(
    State(state): State<AppState>,
    user: UserContext,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, AstraError> {
    let targets = state.db.list_targets(
        &user.company_id,
        query.limit.unwrap_or(50),
        query.offset.unwrap_or(0),
    )?;
    Ok(Json(json!({ "targets": targets, "total": targets.len() })))
}

pub async fn get_target(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<String>,
) -> Result<Json<Value>, AstraError> {
    // Cross-tenant reads look like a miss rather than leaking existence.
    let target = state.db.get_target(&id)?
        .filter(|t| user.is_superuser() || t.company_id == user.company_id)
        .ok_or_else(|| AstraError::NotFound(format!("Target {} not found", id)))?;
    Ok(Json(serde_json::to_value(target)?))
}
