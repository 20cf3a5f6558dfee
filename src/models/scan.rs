use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a scan execution.
///
/// Transitions are owned by `lifecycle::state::transition`; the three
/// terminal states have no outgoing edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ScanStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(Self::Queued),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of security scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScanType {
    #[default]
    NetworkScan,
    WebScan,
    CloudConfigScan,
    CodeScan,
    ComplianceScan,
    FullAudit,
}

impl ScanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NetworkScan => "network_scan",
            Self::WebScan => "web_scan",
            Self::CloudConfigScan => "cloud_config_scan",
            Self::CodeScan => "code_scan",
            Self::ComplianceScan => "compliance_scan",
            Self::FullAudit => "full_audit",
        }
    }
}

/// Per-severity finding counts summarized onto a completed scan.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: i64,
    pub high: i64,
    pub medium: i64,
    pub low: i64,
    pub info: i64,
}

impl SeverityCounts {
    pub fn total(&self) -> i64 {
        self.critical + self.high + self.medium + self.low + self.info
    }
}

/// One scan execution record. Immutable once terminal, except deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRecord {
    pub id: String,
    pub target_id: String,
    pub company_id: String,
    pub scan_type: ScanType,
    pub status: ScanStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Whole seconds between started_at and completed_at; set only when both exist.
    pub duration_seconds: Option<i64>,
    /// Free-form scan parameters, e.g. {"scan_profile": "quick"}.
    pub scan_config: serde_json::Value,
    pub total_vulnerabilities: i64,
    pub counts: SeverityCounts,
    /// 0-100 heuristic for this execution.
    pub risk_score: i64,
    /// Change versus the previous completed scan of the same target.
    pub risk_score_delta: i64,
    pub raw_output: Option<String>,
    pub parsed_data: serde_json::Value,
    pub error_message: Option<String>,
    pub initiated_by: Option<String>,
    pub created_at: DateTime<Utc>,
}
