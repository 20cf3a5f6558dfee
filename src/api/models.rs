use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::models::{ScanType, VulnStatus};

#[derive(Debug, Deserialize)]
pub struct CreateScanRequest {
    pub target_id: String,
    #[serde(default)]
    pub scan_type: ScanType,
    /// Convenience alias for `config.scan_profile`.
    pub scan_profile: Option<String>,
    /// Explicit tool options overriding the profile; alias for
    /// `config.custom_options`.
    pub custom_options: Option<Vec<String>>,
    pub config: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ScanListQuery {
    pub target_id: Option<String>,
    pub status: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct VulnListQuery {
    pub severity: Option<String>,
    pub status: Option<String>,
    pub target_id: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateVulnStatusRequest {
    pub status: VulnStatus,
}

#[derive(Debug, Deserialize)]
pub struct AssignVulnRequest {
    pub assigned_to: String,
    pub due_date: Option<DateTime<Utc>>,
}
