use chrono::{DateTime, Utc};
use rusqlite::Row;
use crate::errors::AstraError;
use crate::models::{Criticality, CreateTarget, ScanTarget, TargetType};
use super::Database;

fn row_to_target(row: &Row) -> rusqlite::Result<ScanTarget> {
    let target_type: String = row.get(4)?;
    let criticality: String = row.get(14)?;
    let tags_json: String = row.get(15)?;
    let last_scan: Option<String> = row.get(11)?;
    let next_scan: Option<String> = row.get(12)?;
    let created: String = row.get(16)?;

    Ok(ScanTarget {
        id: row.get(0)?,
        company_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        target_type: TargetType::parse(&target_type).unwrap_or(TargetType::Domain),
        target_value: row.get(5)?,
        cloud_provider: row.get(6)?,
        cloud_region: row.get(7)?,
        repository_url: row.get(8)?,
        is_active: row.get::<_, i64>(9)? != 0,
        scan_frequency: row.get(10)?,
        last_scan_at: last_scan.as_deref().and_then(super::parse_ts),
        next_scan_at: next_scan.as_deref().and_then(super::parse_ts),
        risk_score: row.get(13)?,
        criticality: Criticality::parse(&criticality).unwrap_or_default(),
        tags: serde_json::from_str(&tags_json).unwrap_or_default(),
        created_at: super::parse_ts(&created).unwrap_or_else(Utc::now),
    })
}

const TARGET_COLUMNS: &str = "id, company_id, name, description, target_type, target_value, \
    cloud_provider, cloud_region, repository_url, is_active, scan_frequency, last_scan_at, \
    next_scan_at, risk_score, criticality, tags, created_at";

impl Database {
    pub fn create_target(&self, company_id: &str, req: &CreateTarget) -> Result<ScanTarget, AstraError> {
        let conn = self.conn.lock().unwrap();
        let id = uuid::Uuid::new_v4().to_string();
        let tags = serde_json::to_string(req.tags.as_deref().unwrap_or_default())?;
        conn.execute(
            "INSERT INTO scan_targets (id, company_id, name, description, target_type, target_value, cloud_provider, cloud_region, repository_url, scan_frequency, criticality, tags, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            rusqlite::params![
                id,
                company_id,
                req.name,
                req.description,
                req.target_type.as_str(),
                req.target_value,
                req.cloud_provider,
                req.cloud_region,
                req.repository_url,
                req.scan_frequency.as_deref().unwrap_or("manual"),
                req.criticality.unwrap_or_default().as_str(),
                tags,
                Utc::now().to_rfc3339(),
            ],
        ).map_err(|e| AstraError::Database(format!("Failed to create target: {}", e)))?;

        drop(conn);
        self.get_target(&id)?
            .ok_or_else(|| AstraError::Database("Target vanished after insert".into()))
    }

    pub fn get_target(&self, id: &str) -> Result<Option<ScanTarget>, AstraError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            &format!("SELECT {} FROM scan_targets WHERE id = ?1", TARGET_COLUMNS),
        ).map_err(|e| AstraError::Database(format!("Query failed: {}", e)))?;

        match stmt.query_row(rusqlite::params![id], row_to_target) {
            Ok(t) => Ok(Some(t)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(AstraError::Database(format!("Query error: {}", e))),
        }
    }

    pub fn list_targets(&self, company_id: &str, limit: usize, offset: usize) -> Result<Vec<ScanTarget>, AstraError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            &format!(
                "SELECT {} FROM scan_targets WHERE company_id = ?1 ORDER BY created_at DESC LIMIT ?2 OFFSET ?3",
                TARGET_COLUMNS
            ),
        ).map_err(|e| AstraError::Database(format!("Query failed: {}", e)))?;

        let rows = stmt.query_map(
            rusqlite::params![company_id, limit as i64, offset as i64],
            row_to_target,
        ).map_err(|e| AstraError::Database(format!("Query error: {}", e)))?;

        let mut targets = Vec::new();
        for row in rows {
            targets.push(row.map_err(|e| AstraError::Database(format!("Row error: {}", e)))?);
        }
        Ok(targets)
    }

    /// Post-scan mutation: stamp last_scan_at and the recomputed risk score.
    /// The score is clamped to [0, 100] here so no caller can exceed the range.
    pub fn record_target_scan(
        &self,
        id: &str,
        risk_score: i64,
        scanned_at: DateTime<Utc>,
    ) -> Result<(), AstraError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE scan_targets SET risk_score = ?2, last_scan_at = ?3 WHERE id = ?1",
            rusqlite::params![id, risk_score.clamp(0, 100), scanned_at.to_rfc3339()],
        ).map_err(|e| AstraError::Database(format!("Update failed: {}", e)))?;
        Ok(())
    }
}
