use serde::{Deserialize, Serialize};

use crate::models::ScanTarget;

/// Role levels relevant to scan operations. Session handling and the full
/// permission matrix live in the auth service; only the tenant boundary is
/// enforced here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    Member,
    Analyst,
    CompanyAdmin,
    SuperAdmin,
}

/// Caller identity as asserted by the upstream auth layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: String,
    pub company_id: String,
    pub role: UserRole,
}

impl UserContext {
    pub fn is_superuser(&self) -> bool {
        self.role == UserRole::SuperAdmin
    }
}

/// Gate for tenant-boundary access to a target and its scans.
pub trait Authorizer: Send + Sync {
    fn is_authorized(&self, user: &UserContext, target: &ScanTarget) -> bool;
}

/// Default policy: same company, or super admin.
pub struct CompanyAuthorizer;

impl Authorizer for CompanyAuthorizer {
    fn is_authorized(&self, user: &UserContext, target: &ScanTarget) -> bool {
        user.is_superuser() || user.company_id == target.company_id
    }
}
