use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of asset a scan target points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Domain,
    IpAddress,
    IpRange,
    CloudResource,
    CodeRepository,
    WebApplication,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::IpAddress => "ip_address",
            Self::IpRange => "ip_range",
            Self::CloudResource => "cloud_resource",
            Self::CodeRepository => "code_repository",
            Self::WebApplication => "web_application",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "domain" => Some(Self::Domain),
            "ip_address" => Some(Self::IpAddress),
            "ip_range" => Some(Self::IpRange),
            "cloud_resource" => Some(Self::CloudResource),
            "code_repository" => Some(Self::CodeRepository),
            "web_application" => Some(Self::WebApplication),
            _ => None,
        }
    }
}

/// Business criticality tier assigned by the tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Criticality {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Criticality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

/// A named endpoint owned by a company and subject to scanning.
///
/// `risk_score` and `last_scan_at` are recomputed by the lifecycle manager
/// after each successful scan; everything else is tenant-managed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanTarget {
    pub id: String,
    pub company_id: String,
    pub name: String,
    pub description: Option<String>,
    pub target_type: TargetType,
    /// Domain, IP, CIDR, resource ARN, repo URL — interpreted per target_type.
    pub target_value: String,
    pub cloud_provider: Option<String>,
    pub cloud_region: Option<String>,
    pub repository_url: Option<String>,
    pub is_active: bool,
    /// manual, daily, weekly, monthly
    pub scan_frequency: String,
    pub last_scan_at: Option<DateTime<Utc>>,
    pub next_scan_at: Option<DateTime<Utc>>,
    /// 0-100 heuristic, clamped on write.
    pub risk_score: i64,
    pub criticality: Criticality,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Tenant-supplied fields for registering a new target.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTarget {
    pub name: String,
    pub description: Option<String>,
    pub target_type: TargetType,
    pub target_value: String,
    pub cloud_provider: Option<String>,
    pub cloud_region: Option<String>,
    pub repository_url: Option<String>,
    pub scan_frequency: Option<String>,
    pub criticality: Option<Criticality>,
    pub tags: Option<Vec<String>>,
}
