use chrono::{DateTime, Utc};
use serde::Serialize;
use crate::errors::AstraError;
use super::Database;

/// Read-side aggregate over a company's targets, scans and vulnerabilities.
#[derive(Debug, Clone, Serialize)]
pub struct CompanyStats {
    pub total_scan_targets: i64,
    pub open_vulnerabilities: i64,
    pub resolved_vulnerabilities: i64,
    pub last_scan_at: Option<DateTime<Utc>>,
    /// Mean risk score across active targets, 0 when there are none.
    pub average_risk_score: i64,
    /// clamp(100 - 2 * open, 0, 100). A coarse indicator, not a framework score.
    pub compliance_score: i64,
}

impl Database {
    pub fn company_stats(&self, company_id: &str) -> Result<CompanyStats, AstraError> {
        let conn = self.conn.lock().unwrap();

        let total_scan_targets: i64 = conn.query_row(
            "SELECT COUNT(*) FROM scan_targets WHERE company_id = ?1 AND is_active = 1",
            rusqlite::params![company_id],
            |row| row.get(0),
        ).map_err(|e| AstraError::Database(format!("Query error: {}", e)))?;

        let open_vulnerabilities: i64 = conn.query_row(
            "SELECT COUNT(*) FROM vulnerabilities v \
             JOIN scan_targets t ON v.target_id = t.id \
             WHERE t.company_id = ?1 AND v.status = 'open'",
            rusqlite::params![company_id],
            |row| row.get(0),
        ).map_err(|e| AstraError::Database(format!("Query error: {}", e)))?;

        let resolved_vulnerabilities: i64 = conn.query_row(
            "SELECT COUNT(*) FROM vulnerabilities v \
             JOIN scan_targets t ON v.target_id = t.id \
             WHERE t.company_id = ?1 AND v.status = 'resolved'",
            rusqlite::params![company_id],
            |row| row.get(0),
        ).map_err(|e| AstraError::Database(format!("Query error: {}", e)))?;

        let last_scan: Option<String> = match conn.query_row(
            "SELECT created_at FROM scan_results WHERE company_id = ?1 \
             ORDER BY created_at DESC LIMIT 1",
            rusqlite::params![company_id],
            |row| row.get(0),
        ) {
            Ok(created) => Some(created),
            Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(e) => return Err(AstraError::Database(format!("Query error: {}", e))),
        };

        let average_risk_score: f64 = conn.query_row(
            "SELECT COALESCE(AVG(risk_score), 0) FROM scan_targets \
             WHERE company_id = ?1 AND is_active = 1",
            rusqlite::params![company_id],
            |row| row.get(0),
        ).map_err(|e| AstraError::Database(format!("Query error: {}", e)))?;

        Ok(CompanyStats {
            total_scan_targets,
            open_vulnerabilities,
            resolved_vulnerabilities,
            last_scan_at: last_scan.as_deref().and_then(super::parse_ts),
            average_risk_score: average_risk_score as i64,
            compliance_score: (100 - 2 * open_vulnerabilities).clamp(0, 100),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateTarget, Criticality, ScanType, Severity, TargetType, VulnCategory, VulnStatus, VulnerabilityDraft};
    use serde_json::json;

    fn make_target(name: &str) -> CreateTarget {
        CreateTarget {
            name: name.to_string(),
            description: None,
            target_type: TargetType::IpAddress,
            target_value: "10.0.0.5".to_string(),
            cloud_provider: None,
            cloud_region: None,
            repository_url: None,
            scan_frequency: None,
            criticality: Some(Criticality::Medium),
            tags: None,
        }
    }

    fn make_draft(title: &str) -> VulnerabilityDraft {
        VulnerabilityDraft {
            title: title.to_string(),
            description: "d".to_string(),
            category: VulnCategory::Network,
            severity: Severity::Medium,
            affected_asset: "10.0.0.5:21".to_string(),
            remediation: "r".to_string(),
        }
    }

    #[test]
    fn test_stats_empty_company() {
        let db = Database::in_memory().unwrap();
        let stats = db.company_stats("acme").unwrap();
        assert_eq!(stats.total_scan_targets, 0);
        assert_eq!(stats.open_vulnerabilities, 0);
        assert_eq!(stats.resolved_vulnerabilities, 0);
        assert!(stats.last_scan_at.is_none());
        assert_eq!(stats.average_risk_score, 0);
        assert_eq!(stats.compliance_score, 100);
    }

    #[test]
    fn test_stats_aggregate_scenario() {
        // 3 targets, 2 open + 1 resolved vulnerability -> compliance 96.
        let db = Database::in_memory().unwrap();
        let t1 = db.create_target("acme", &make_target("a")).unwrap().id;
        let t2 = db.create_target("acme", &make_target("b")).unwrap().id;
        db.create_target("acme", &make_target("c")).unwrap();

        db.create_scan("s1", &t1, "acme", ScanType::NetworkScan, &json!({}), None).unwrap();
        db.insert_vulnerability("s1", &t1, "acme", "nmap", &make_draft("v1")).unwrap();
        db.insert_vulnerability("s1", &t1, "acme", "nmap", &make_draft("v2")).unwrap();
        let resolved = db.insert_vulnerability("s1", &t2, "acme", "nmap", &make_draft("v3")).unwrap();
        db.update_vulnerability_status(&resolved, VulnStatus::Resolved, Some("analyst")).unwrap();

        let stats = db.company_stats("acme").unwrap();
        assert_eq!(stats.total_scan_targets, 3);
        assert_eq!(stats.open_vulnerabilities, 2);
        assert_eq!(stats.resolved_vulnerabilities, 1);
        assert!(stats.last_scan_at.is_some());
        assert_eq!(stats.compliance_score, 96);
    }

    #[test]
    fn test_stats_compliance_floor() {
        let db = Database::in_memory().unwrap();
        let t = db.create_target("acme", &make_target("a")).unwrap().id;
        db.create_scan("s1", &t, "acme", ScanType::NetworkScan, &json!({}), None).unwrap();
        for i in 0..60 {
            db.insert_vulnerability("s1", &t, "acme", "nmap", &make_draft(&format!("v{}", i))).unwrap();
        }

        let stats = db.company_stats("acme").unwrap();
        assert_eq!(stats.open_vulnerabilities, 60);
        assert_eq!(stats.compliance_score, 0);
    }

    #[test]
    fn test_stats_average_risk_over_active_targets() {
        let db = Database::in_memory().unwrap();
        let t1 = db.create_target("acme", &make_target("a")).unwrap().id;
        let t2 = db.create_target("acme", &make_target("b")).unwrap().id;
        db.record_target_scan(&t1, 40, Utc::now()).unwrap();
        db.record_target_scan(&t2, 20, Utc::now()).unwrap();

        let stats = db.company_stats("acme").unwrap();
        assert_eq!(stats.average_risk_score, 30);
    }

    #[test]
    fn test_stats_query_errors_are_propagated() {
        let db = Database::in_memory().unwrap();
        db.conn.lock().unwrap().execute_batch("DROP TABLE scan_results;").unwrap();
        assert!(db.company_stats("acme").is_err());
    }

    #[test]
    fn test_stats_scoped_to_company() {
        let db = Database::in_memory().unwrap();
        let t = db.create_target("acme", &make_target("a")).unwrap().id;
        db.create_scan("s1", &t, "acme", ScanType::NetworkScan, &json!({}), None).unwrap();
        db.insert_vulnerability("s1", &t, "acme", "nmap", &make_draft("v")).unwrap();

        let stats = db.company_stats("globex").unwrap();
        assert_eq!(stats.total_scan_targets, 0);
        assert_eq!(stats.open_vulnerabilities, 0);
        assert_eq!(stats.compliance_score, 100);
    }
}
