use chrono::{DateTime, Utc};
use rusqlite::Row;
use crate::errors::AstraError;
use crate::models::{Severity, VulnCategory, VulnStatus, Vulnerability, VulnerabilityDraft};
use super::Database;

const VULN_COLUMNS: &str = "id, scan_result_id, target_id, company_id, title, description, \
    category, severity, cve_id, cvss_score, affected_asset, scanner_name, remediation, status, \
    assigned_to, due_date, resolved_by, resolved_at, created_at";

fn row_to_vulnerability(row: &Row) -> rusqlite::Result<Vulnerability> {
    let category: String = row.get(6)?;
    let severity: String = row.get(7)?;
    let status: String = row.get(13)?;
    let due: Option<String> = row.get(15)?;
    let resolved: Option<String> = row.get(17)?;
    let created: String = row.get(18)?;

    Ok(Vulnerability {
        id: row.get(0)?,
        scan_result_id: row.get(1)?,
        target_id: row.get(2)?,
        company_id: row.get(3)?,
        title: row.get(4)?,
        description: row.get(5)?,
        category: serde_json::from_value(serde_json::Value::String(category))
            .unwrap_or(VulnCategory::Network),
        severity: Severity::parse(&severity).unwrap_or(Severity::Info),
        cve_id: row.get(8)?,
        cvss_score: row.get(9)?,
        affected_asset: row.get(10)?,
        scanner_name: row.get(11)?,
        remediation: row.get(12)?,
        status: VulnStatus::parse(&status).unwrap_or_default(),
        assigned_to: row.get(14)?,
        due_date: due.as_deref().and_then(super::parse_ts),
        resolved_by: row.get(16)?,
        resolved_at: resolved.as_deref().and_then(super::parse_ts),
        created_at: super::parse_ts(&created).unwrap_or_else(Utc::now),
    })
}

/// Optional filters for company-scoped vulnerability listing.
#[derive(Debug, Clone, Default)]
pub struct VulnFilter {
    pub severity: Option<Severity>,
    pub status: Option<VulnStatus>,
    pub target_id: Option<String>,
}

impl Database {
    pub fn insert_vulnerability(
        &self,
        scan_result_id: &str,
        target_id: &str,
        company_id: &str,
        scanner_name: &str,
        draft: &VulnerabilityDraft,
    ) -> Result<String, AstraError> {
        let conn = self.conn.lock().unwrap();
        let id = uuid::Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO vulnerabilities (id, scan_result_id, target_id, company_id, title, description, category, severity, affected_asset, scanner_name, remediation, status, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 'open', ?12)",
            rusqlite::params![
                id,
                scan_result_id,
                target_id,
                company_id,
                draft.title,
                draft.description,
                draft.category.as_str(),
                draft.severity.as_str(),
                draft.affected_asset,
                scanner_name,
                draft.remediation,
                Utc::now().to_rfc3339(),
            ],
        ).map_err(|e| AstraError::Database(format!("Failed to insert vulnerability: {}", e)))?;
        Ok(id)
    }

    pub fn get_vulnerability(&self, id: &str) -> Result<Option<Vulnerability>, AstraError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            &format!("SELECT {} FROM vulnerabilities WHERE id = ?1", VULN_COLUMNS),
        ).map_err(|e| AstraError::Database(format!("Query failed: {}", e)))?;

        match stmt.query_row(rusqlite::params![id], row_to_vulnerability) {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(AstraError::Database(format!("Query error: {}", e))),
        }
    }

    /// Findings for one scan, most severe first, stable within a severity.
    pub fn get_scan_vulnerabilities(&self, scan_result_id: &str) -> Result<Vec<Vulnerability>, AstraError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            &format!(
                "SELECT {} FROM vulnerabilities WHERE scan_result_id = ?1 \
                 ORDER BY CASE severity WHEN 'critical' THEN 0 WHEN 'high' THEN 1 WHEN 'medium' THEN 2 \
                 WHEN 'low' THEN 3 WHEN 'info' THEN 4 ELSE 5 END, created_at, id",
                VULN_COLUMNS
            ),
        ).map_err(|e| AstraError::Database(format!("Query failed: {}", e)))?;

        let rows = stmt.query_map(rusqlite::params![scan_result_id], row_to_vulnerability)
            .map_err(|e| AstraError::Database(format!("Query error: {}", e)))?;

        let mut vulns = Vec::new();
        for row in rows {
            vulns.push(row.map_err(|e| AstraError::Database(format!("Row error: {}", e)))?);
        }
        Ok(vulns)
    }

    pub fn list_vulnerabilities(
        &self,
        company_id: &str,
        filter: &VulnFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Vulnerability>, AstraError> {
        let conn = self.conn.lock().unwrap();
        let mut sql = format!("SELECT {} FROM vulnerabilities WHERE company_id = ?1", VULN_COLUMNS);
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(company_id.to_string())];

        if let Some(sev) = filter.severity {
            params.push(Box::new(sev.as_str().to_string()));
            sql.push_str(&format!(" AND severity = ?{}", params.len()));
        }
        if let Some(st) = filter.status {
            params.push(Box::new(st.as_str().to_string()));
            sql.push_str(&format!(" AND status = ?{}", params.len()));
        }
        if let Some(ref tid) = filter.target_id {
            params.push(Box::new(tid.clone()));
            sql.push_str(&format!(" AND target_id = ?{}", params.len()));
        }
        params.push(Box::new(limit as i64));
        sql.push_str(&format!(" ORDER BY created_at DESC, id LIMIT ?{}", params.len()));
        params.push(Box::new(offset as i64));
        sql.push_str(&format!(" OFFSET ?{}", params.len()));

        let mut stmt = conn.prepare(&sql)
            .map_err(|e| AstraError::Database(format!("Query failed: {}", e)))?;
        let rows = stmt.query_map(
            rusqlite::params_from_iter(params.iter().map(|p| p.as_ref())),
            row_to_vulnerability,
        ).map_err(|e| AstraError::Database(format!("Query error: {}", e)))?;

        let mut vulns = Vec::new();
        for row in rows {
            vulns.push(row.map_err(|e| AstraError::Database(format!("Row error: {}", e)))?);
        }
        Ok(vulns)
    }

    /// Workflow update: resolving stamps resolved_by/resolved_at, re-opening
    /// clears them.
    pub fn update_vulnerability_status(
        &self,
        id: &str,
        status: VulnStatus,
        actor: Option<&str>,
    ) -> Result<bool, AstraError> {
        let conn = self.conn.lock().unwrap();
        let affected = if status == VulnStatus::Resolved {
            conn.execute(
                "UPDATE vulnerabilities SET status = ?2, resolved_by = ?3, resolved_at = ?4 WHERE id = ?1",
                rusqlite::params![id, status.as_str(), actor, Utc::now().to_rfc3339()],
            )
        } else {
            conn.execute(
                "UPDATE vulnerabilities SET status = ?2, resolved_by = NULL, resolved_at = NULL WHERE id = ?1",
                rusqlite::params![id, status.as_str()],
            )
        }.map_err(|e| AstraError::Database(format!("Update failed: {}", e)))?;
        Ok(affected > 0)
    }

    /// Remove every finding persisted for one scan. Used when a scan is
    /// cancelled after its pipeline already wrote findings; the cancelled
    /// record must not keep them.
    pub fn delete_scan_vulnerabilities(&self, scan_result_id: &str) -> Result<usize, AstraError> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute(
            "DELETE FROM vulnerabilities WHERE scan_result_id = ?1",
            rusqlite::params![scan_result_id],
        ).map_err(|e| AstraError::Database(format!("Delete failed: {}", e)))?;
        Ok(affected)
    }

    pub fn assign_vulnerability(
        &self,
        id: &str,
        assigned_to: &str,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<bool, AstraError> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute(
            "UPDATE vulnerabilities SET assigned_to = ?2, due_date = ?3 WHERE id = ?1",
            rusqlite::params![id, assigned_to, due_date.map(|d| d.to_rfc3339())],
        ).map_err(|e| AstraError::Database(format!("Update failed: {}", e)))?;
        Ok(affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateTarget, Criticality, ScanType, TargetType};
    use serde_json::json;

    fn seed(db: &Database) -> (String, String) {
        let req = CreateTarget {
            name: "t".to_string(),
            description: None,
            target_type: TargetType::IpAddress,
            target_value: "10.0.0.5".to_string(),
            cloud_provider: None,
            cloud_region: None,
            repository_url: None,
            scan_frequency: None,
            criticality: Some(Criticality::Medium),
            tags: None,
        };
        let target_id = db.create_target("acme", &req).unwrap().id;
        db.create_scan("scan-1", &target_id, "acme", ScanType::NetworkScan, &json!({}), None).unwrap();
        (target_id, "scan-1".to_string())
    }

    fn make_draft(title: &str, severity: Severity) -> VulnerabilityDraft {
        VulnerabilityDraft {
            title: title.to_string(),
            description: "Service exposed".to_string(),
            category: VulnCategory::Network,
            severity,
            affected_asset: "10.0.0.5:23".to_string(),
            remediation: "Disable the service".to_string(),
        }
    }

    #[test]
    fn test_insert_and_get_vulnerability() {
        let db = Database::in_memory().unwrap();
        let (target_id, scan_id) = seed(&db);

        let id = db.insert_vulnerability(&scan_id, &target_id, "acme", "nmap",
            &make_draft("Telnet Service Detected", Severity::High)).unwrap();

        let vuln = db.get_vulnerability(&id).unwrap().unwrap();
        assert_eq!(vuln.title, "Telnet Service Detected");
        assert_eq!(vuln.severity, Severity::High);
        assert_eq!(vuln.status, VulnStatus::Open);
        assert_eq!(vuln.scanner_name, "nmap");
        assert_eq!(vuln.affected_asset, "10.0.0.5:23");
        assert_eq!(vuln.scan_result_id, scan_id);
    }

    #[test]
    fn test_scan_vulnerabilities_ordered_by_severity() {
        let db = Database::in_memory().unwrap();
        let (target_id, scan_id) = seed(&db);

        db.insert_vulnerability(&scan_id, &target_id, "acme", "nmap", &make_draft("low", Severity::Low)).unwrap();
        db.insert_vulnerability(&scan_id, &target_id, "acme", "nmap", &make_draft("crit", Severity::Critical)).unwrap();
        db.insert_vulnerability(&scan_id, &target_id, "acme", "nmap", &make_draft("med", Severity::Medium)).unwrap();

        let vulns = db.get_scan_vulnerabilities(&scan_id).unwrap();
        assert_eq!(vulns.len(), 3);
        assert_eq!(vulns[0].severity, Severity::Critical);
        assert_eq!(vulns[1].severity, Severity::Medium);
        assert_eq!(vulns[2].severity, Severity::Low);
    }

    #[test]
    fn test_list_vulnerabilities_filters() {
        let db = Database::in_memory().unwrap();
        let (target_id, scan_id) = seed(&db);
        let v1 = db.insert_vulnerability(&scan_id, &target_id, "acme", "nmap", &make_draft("a", Severity::High)).unwrap();
        db.insert_vulnerability(&scan_id, &target_id, "acme", "nmap", &make_draft("b", Severity::Medium)).unwrap();
        db.update_vulnerability_status(&v1, VulnStatus::Resolved, Some("analyst@acme.io")).unwrap();

        let all = db.list_vulnerabilities("acme", &VulnFilter::default(), 100, 0).unwrap();
        assert_eq!(all.len(), 2);

        let high = db.list_vulnerabilities("acme", &VulnFilter {
            severity: Some(Severity::High), ..Default::default()
        }, 100, 0).unwrap();
        assert_eq!(high.len(), 1);

        let open = db.list_vulnerabilities("acme", &VulnFilter {
            status: Some(VulnStatus::Open), ..Default::default()
        }, 100, 0).unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].title, "b");

        let other = db.list_vulnerabilities("globex", &VulnFilter::default(), 100, 0).unwrap();
        assert!(other.is_empty());
    }

    #[test]
    fn test_resolve_stamps_and_reopen_clears() {
        let db = Database::in_memory().unwrap();
        let (target_id, scan_id) = seed(&db);
        let id = db.insert_vulnerability(&scan_id, &target_id, "acme", "nmap", &make_draft("v", Severity::High)).unwrap();

        assert!(db.update_vulnerability_status(&id, VulnStatus::Resolved, Some("analyst@acme.io")).unwrap());
        let resolved = db.get_vulnerability(&id).unwrap().unwrap();
        assert_eq!(resolved.status, VulnStatus::Resolved);
        assert_eq!(resolved.resolved_by.as_deref(), Some("analyst@acme.io"));
        assert!(resolved.resolved_at.is_some());

        assert!(db.update_vulnerability_status(&id, VulnStatus::Open, None).unwrap());
        let reopened = db.get_vulnerability(&id).unwrap().unwrap();
        assert_eq!(reopened.status, VulnStatus::Open);
        assert!(reopened.resolved_by.is_none());
        assert!(reopened.resolved_at.is_none());
    }

    #[test]
    fn test_assign_vulnerability() {
        let db = Database::in_memory().unwrap();
        let (target_id, scan_id) = seed(&db);
        let id = db.insert_vulnerability(&scan_id, &target_id, "acme", "nmap", &make_draft("v", Severity::High)).unwrap();

        let due = Utc::now() + chrono::Duration::days(7);
        assert!(db.assign_vulnerability(&id, "bob@acme.io", Some(due)).unwrap());
        let vuln = db.get_vulnerability(&id).unwrap().unwrap();
        assert_eq!(vuln.assigned_to.as_deref(), Some("bob@acme.io"));
        assert!(vuln.due_date.is_some());
    }

    #[test]
    fn test_delete_scan_vulnerabilities_scoped_to_scan() {
        let db = Database::in_memory().unwrap();
        let (target_id, scan_id) = seed(&db);
        db.create_scan("scan-2", &target_id, "acme", ScanType::NetworkScan, &json!({}), None).unwrap();
        db.insert_vulnerability(&scan_id, &target_id, "acme", "nmap", &make_draft("a", Severity::High)).unwrap();
        db.insert_vulnerability(&scan_id, &target_id, "acme", "nmap", &make_draft("b", Severity::Medium)).unwrap();
        db.insert_vulnerability("scan-2", &target_id, "acme", "nmap", &make_draft("c", Severity::Low)).unwrap();

        assert_eq!(db.delete_scan_vulnerabilities(&scan_id).unwrap(), 2);
        assert!(db.get_scan_vulnerabilities(&scan_id).unwrap().is_empty());
        assert_eq!(db.get_scan_vulnerabilities("scan-2").unwrap().len(), 1);
        assert_eq!(db.delete_scan_vulnerabilities(&scan_id).unwrap(), 0);
    }

    #[test]
    fn test_cascade_delete_with_scan() {
        let db = Database::in_memory().unwrap();
        let (target_id, scan_id) = seed(&db);
        db.insert_vulnerability(&scan_id, &target_id, "acme", "nmap", &make_draft("v", Severity::High)).unwrap();

        assert_eq!(db.get_scan_vulnerabilities(&scan_id).unwrap().len(), 1);
        db.delete_scan(&scan_id).unwrap();
        assert_eq!(db.get_scan_vulnerabilities(&scan_id).unwrap().len(), 0);
    }
}
