//! Caller identity extraction.
//!
//! The platform terminates sessions upstream; this service trusts the
//! identity headers the gateway injects. Requests without them are
//! rejected before any handler runs.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    Json,
};
use serde_json::{json, Value};

use crate::lifecycle::{UserContext, UserRole};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const COMPANY_ID_HEADER: &str = "x-company-id";
pub const ROLE_HEADER: &str = "x-user-role";

fn parse_role(s: &str) -> Option<UserRole> {
    match s {
        "member" => Some(UserRole::Member),
        "analyst" => Some(UserRole::Analyst),
        "company_admin" => Some(UserRole::CompanyAdmin),
        "super_admin" => Some(UserRole::SuperAdmin),
        _ => None,
    }
}

fn unauthorized(message: &str) -> (StatusCode, Json<Value>) {
    (StatusCode::UNAUTHORIZED, Json(json!({"error": message})))
}

#[async_trait]
impl<S> FromRequestParts<S> for UserContext
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts.headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
        };

        let user_id = header(USER_ID_HEADER)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| unauthorized("Missing x-user-id header"))?;
        let company_id = header(COMPANY_ID_HEADER)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| unauthorized("Missing x-company-id header"))?;

        let role = match header(ROLE_HEADER) {
            Some(raw) => parse_role(&raw).ok_or_else(|| unauthorized("Unknown user role"))?,
            None => UserRole::Member,
        };

        Ok(UserContext { user_id, company_id, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role_known_values() {
        assert_eq!(parse_role("member"), Some(UserRole::Member));
        assert_eq!(parse_role("analyst"), Some(UserRole::Analyst));
        assert_eq!(parse_role("company_admin"), Some(UserRole::CompanyAdmin));
        assert_eq!(parse_role("super_admin"), Some(UserRole::SuperAdmin));
    }

    #[test]
    fn test_parse_role_rejects_unknown() {
        assert_eq!(parse_role("root"), None);
        assert_eq!(parse_role(""), None);
    }
}
