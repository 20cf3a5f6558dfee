use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity level for a finding, ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    /// Numeric rank where lower values indicate higher severity.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
            Self::Info => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Info => "info",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "critical" => Some(Self::Critical),
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            "info" => Some(Self::Info),
            _ => None,
        }
    }
}

/// Broad classification of where the weakness lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VulnCategory {
    Network,
    WebApplication,
    CloudConfig,
    CodeQuality,
    AccessControl,
}

impl VulnCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::WebApplication => "web_application",
            Self::CloudConfig => "cloud_config",
            Self::CodeQuality => "code_quality",
            Self::AccessControl => "access_control",
        }
    }
}

/// Remediation workflow status, user-managed after discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VulnStatus {
    #[default]
    Open,
    InProgress,
    Resolved,
    Accepted,
    FalsePositive,
}

impl VulnStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Accepted => "accepted",
            Self::FalsePositive => "false_positive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "in_progress" => Some(Self::InProgress),
            "resolved" => Some(Self::Resolved),
            "accepted" => Some(Self::Accepted),
            "false_positive" => Some(Self::FalsePositive),
            _ => None,
        }
    }
}

/// Finding template emitted by the extractor, before persistence assigns
/// ids and ownership.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VulnerabilityDraft {
    pub title: String,
    pub description: String,
    pub category: VulnCategory,
    pub severity: Severity,
    /// host:port of the service the rule matched.
    pub affected_asset: String,
    pub remediation: String,
}

/// A persisted finding tied to its originating target and scan execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vulnerability {
    pub id: String,
    pub scan_result_id: String,
    pub target_id: String,
    pub company_id: String,
    pub title: String,
    pub description: String,
    pub category: VulnCategory,
    pub severity: Severity,
    pub cve_id: Option<String>,
    pub cvss_score: Option<f64>,
    pub affected_asset: String,
    pub scanner_name: String,
    pub remediation: String,
    pub status: VulnStatus,
    pub assigned_to: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
