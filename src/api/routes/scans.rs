use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::api::models::{CreateScanRequest, ScanListQuery};
use crate::api::AppState;
use crate::errors::AstraError;
use crate::lifecycle::UserContext;
use crate::models::{ScanRecord, ScanStatus};

pub async fn create_scan(
    State(state): State<AppState>,
    user: UserContext,
    Json(req): Json<CreateScanRequest>,
) -> Result<(StatusCode, Json<Value>), AstraError> {
    let mut config = req.config.unwrap_or_else(|| json!({}));
    if let Some(obj) = config.as_object_mut() {
        if let Some(profile) = req.scan_profile {
            obj.insert("scan_profile".to_string(), Value::String(profile));
        }
        if let Some(options) = req.custom_options {
            obj.insert(
                "custom_options".to_string(),
                Value::Array(options.into_iter().map(Value::String).collect()),
            );
        }
    }

    let scan = state.manager.request_scan(&user, &req.target_id, req.scan_type, config)?;
    state.manager.dispatch(&scan.id);

    Ok((StatusCode::CREATED, Json(serde_json::to_value(scan)?)))
}

pub async fn list_scans(
    State(state): State<AppState>,
    user: UserContext,
    Query(query): Query<ScanListQuery>,
) -> Result<Json<Value>, AstraError> {
    let status = match query.status.as_deref() {
        Some(raw) => Some(ScanStatus::parse(raw).ok_or_else(|| {
            AstraError::Config(format!("Unknown scan status {:?}", raw))
        })?),
        None => None,
    };

    let scans = state.db.list_scans(
        &user.company_id,
        query.target_id.as_deref(),
        status,
        query.limit.unwrap_or(50),
        query.offset.unwrap_or(0),
    )?;
    Ok(Json(json!({ "scans": scans, "total": scans.len() })))
}

pub async fn get_scan(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<String>,
) -> Result<Json<Value>, AstraError> {
    let scan = scoped_scan(&state, &user, &id)?;
    Ok(Json(serde_json::to_value(scan)?))
}

pub async fn cancel_scan(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<String>,
) -> Result<Json<Value>, AstraError> {
    state.manager.cancel(&user, &id)?;
    Ok(Json(json!({"cancelled": true})))
}

pub async fn delete_scan(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<String>,
) -> Result<Json<Value>, AstraError> {
    state.manager.delete(&user, &id)?;
    Ok(Json(json!({"deleted": true})))
}

pub async fn get_scan_vulnerabilities(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<String>,
) -> Result<Json<Value>, AstraError> {
    scoped_scan(&state, &user, &id)?;
    let vulns = state.db.get_scan_vulnerabilities(&id)?;
    Ok(Json(json!({ "vulnerabilities": vulns, "total": vulns.len() })))
}

fn scoped_scan(state: &AppState, user: &UserContext, id: &str) -> Result<ScanRecord, AstraError> {
    state.db.get_scan(id)?
        .filter(|s| user.is_superuser() || s.company_id == user.company_id)
        .ok_or_else(|| AstraError::NotFound(format!("Scan {} not found", id)))
}
