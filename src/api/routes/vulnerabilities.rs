use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use tracing::info;

use crate::api::models::{AssignVulnRequest, UpdateVulnStatusRequest, VulnListQuery};
use crate::api::AppState;
use crate::db::vulnerabilities::VulnFilter;
use crate::errors::AstraError;
use crate::lifecycle::UserContext;
use crate::models::{Severity, VulnStatus, Vulnerability};

pub async fn list_vulnerabilities(
    State(state): State<AppState>,
    user: UserContext,
    Query(query): Query<VulnListQuery>,
) -> Result<Json<Value>, AstraError> {
    let severity = match query.severity.as_deref() {
        Some(raw) => Some(Severity::parse(raw).ok_or_else(|| {
            AstraError::Config(format!("Unknown severity {:?}", raw))
        })?),
        None => None,
    };
    let status = match query.status.as_deref() {
        Some(raw) => Some(VulnStatus::parse(raw).ok_or_else(|| {
            AstraError::Config(format!("Unknown vulnerability status {:?}", raw))
        })?),
        None => None,
    };

    let filter = VulnFilter { severity, status, target_id: query.target_id.clone() };
    let vulns = state.db.list_vulnerabilities(
        &user.company_id,
        &filter,
        query.limit.unwrap_or(50),
        query.offset.unwrap_or(0),
    )?;
    Ok(Json(json!({ "vulnerabilities": vulns, "total": vulns.len() })))
}

pub async fn update_status(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<String>,
    Json(req): Json<UpdateVulnStatusRequest>,
) -> Result<Json<Value>, AstraError> {
    scoped_vulnerability(&state, &user, &id)?;
    state.db.update_vulnerability_status(&id, req.status, Some(&user.user_id))?;
    info!(vulnerability_id = %id, status = req.status.as_str(), user = %user.user_id, "Vulnerability status updated");

    let updated = scoped_vulnerability(&state, &user, &id)?;
    Ok(Json(serde_json::to_value(updated)?))
}

pub async fn assign(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<String>,
    Json(req): Json<AssignVulnRequest>,
) -> Result<Json<Value>, AstraError> {
    scoped_vulnerability(&state, &user, &id)?;
    state.db.assign_vulnerability(&id, &req.assigned_to, req.due_date)?;
    info!(vulnerability_id = %id, assigned_to = %req.assigned_to, "Vulnerability assigned");

    let updated = scoped_vulnerability(&state, &user, &id)?;
    Ok(Json(serde_json::to_value(updated)?))
}

fn scoped_vulnerability(
    state: &AppState,
    user: &UserContext,
    id: &str,
) -> Result<Vulnerability, AstraError> {
    state.db.get_vulnerability(id)?
        .filter(|v| user.is_superuser() || v.company_id == user.company_id)
        .ok_or_else(|| AstraError::NotFound(format!("Vulnerability {} not found", id)))
}
