use chrono::Utc;
use rusqlite::Row;
use serde_json::Value;
use crate::errors::AstraError;
use crate::models::{ScanRecord, ScanStatus, ScanType, SeverityCounts};
use super::Database;

/// Summary fields written when a scan reaches `completed`.
#[derive(Debug, Clone)]
pub struct ScanCompletion {
    pub counts: SeverityCounts,
    pub risk_score: i64,
    pub risk_score_delta: i64,
    pub raw_output: String,
    pub parsed_data: Value,
}

const SCAN_COLUMNS: &str = "id, target_id, company_id, scan_type, status, started_at, \
    completed_at, duration_seconds, scan_config, total_vulnerabilities, critical_count, \
    high_count, medium_count, low_count, info_count, risk_score, risk_score_delta, \
    raw_output, parsed_data, error_message, initiated_by, created_at";

fn row_to_scan(row: &Row) -> rusqlite::Result<ScanRecord> {
    let scan_type: String = row.get(3)?;
    let status: String = row.get(4)?;
    let started: Option<String> = row.get(5)?;
    let completed: Option<String> = row.get(6)?;
    let config: String = row.get(8)?;
    let parsed: String = row.get(18)?;
    let created: String = row.get(21)?;

    Ok(ScanRecord {
        id: row.get(0)?,
        target_id: row.get(1)?,
        company_id: row.get(2)?,
        scan_type: serde_json::from_value(Value::String(scan_type)).unwrap_or_default(),
        status: ScanStatus::parse(&status).unwrap_or(ScanStatus::Queued),
        started_at: started.as_deref().and_then(super::parse_ts),
        completed_at: completed.as_deref().and_then(super::parse_ts),
        duration_seconds: row.get(7)?,
        scan_config: serde_json::from_str(&config).unwrap_or(Value::Null),
        total_vulnerabilities: row.get(9)?,
        counts: SeverityCounts {
            critical: row.get(10)?,
            high: row.get(11)?,
            medium: row.get(12)?,
            low: row.get(13)?,
            info: row.get(14)?,
        },
        risk_score: row.get(15)?,
        risk_score_delta: row.get(16)?,
        raw_output: row.get(17)?,
        parsed_data: serde_json::from_str(&parsed).unwrap_or(Value::Null),
        error_message: row.get(19)?,
        initiated_by: row.get(20)?,
        created_at: super::parse_ts(&created).unwrap_or_else(Utc::now),
    })
}

impl Database {
    pub fn create_scan(
        &self,
        id: &str,
        target_id: &str,
        company_id: &str,
        scan_type: ScanType,
        config: &Value,
        initiated_by: Option<&str>,
    ) -> Result<(), AstraError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO scan_results (id, target_id, company_id, scan_type, status, scan_config, initiated_by, created_at) \
             VALUES (?1, ?2, ?3, ?4, 'queued', ?5, ?6, ?7)",
            rusqlite::params![
                id,
                target_id,
                company_id,
                scan_type.as_str(),
                serde_json::to_string(config)?,
                initiated_by,
                Utc::now().to_rfc3339(),
            ],
        ).map_err(|e| AstraError::Database(format!("Failed to create scan: {}", e)))?;
        Ok(())
    }

    pub fn get_scan(&self, id: &str) -> Result<Option<ScanRecord>, AstraError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            &format!("SELECT {} FROM scan_results WHERE id = ?1", SCAN_COLUMNS),
        ).map_err(|e| AstraError::Database(format!("Query failed: {}", e)))?;

        match stmt.query_row(rusqlite::params![id], row_to_scan) {
            Ok(scan) => Ok(Some(scan)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(AstraError::Database(format!("Query error: {}", e))),
        }
    }

    pub fn list_scans(
        &self,
        company_id: &str,
        target_id: Option<&str>,
        status: Option<ScanStatus>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ScanRecord>, AstraError> {
        let conn = self.conn.lock().unwrap();
        let mut sql = format!("SELECT {} FROM scan_results WHERE company_id = ?1", SCAN_COLUMNS);
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(company_id.to_string())];

        if let Some(tid) = target_id {
            params.push(Box::new(tid.to_string()));
            sql.push_str(&format!(" AND target_id = ?{}", params.len()));
        }
        if let Some(st) = status {
            params.push(Box::new(st.as_str().to_string()));
            sql.push_str(&format!(" AND status = ?{}", params.len()));
        }
        params.push(Box::new(limit as i64));
        sql.push_str(&format!(" ORDER BY created_at DESC LIMIT ?{}", params.len()));
        params.push(Box::new(offset as i64));
        sql.push_str(&format!(" OFFSET ?{}", params.len()));

        let mut stmt = conn.prepare(&sql)
            .map_err(|e| AstraError::Database(format!("Query failed: {}", e)))?;
        let rows = stmt.query_map(
            rusqlite::params_from_iter(params.iter().map(|p| p.as_ref())),
            row_to_scan,
        ).map_err(|e| AstraError::Database(format!("Query error: {}", e)))?;

        let mut scans = Vec::new();
        for row in rows {
            scans.push(row.map_err(|e| AstraError::Database(format!("Row error: {}", e)))?);
        }
        Ok(scans)
    }

    /// queued -> running. Returns false when the scan was not in `queued`,
    /// e.g. it was cancelled before the worker picked it up.
    pub fn mark_scan_running(&self, id: &str) -> Result<bool, AstraError> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute(
            "UPDATE scan_results SET status = 'running', started_at = ?2 WHERE id = ?1 AND status = 'queued'",
            rusqlite::params![id, Utc::now().to_rfc3339()],
        ).map_err(|e| AstraError::Database(format!("Update failed: {}", e)))?;
        Ok(affected > 0)
    }

    /// running -> completed, writing all summary fields in one statement so
    /// observers never see a half-updated record. Returns false when the scan
    /// was no longer `running` (cancel won the race); the summary is dropped.
    pub fn mark_scan_completed(&self, id: &str, summary: &ScanCompletion) -> Result<bool, AstraError> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let started: String = match conn.query_row(
            "SELECT started_at FROM scan_results WHERE id = ?1 AND status = 'running'",
            rusqlite::params![id],
            |row| row.get(0),
        ) {
            Ok(started) => started,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(false),
            Err(e) => return Err(AstraError::Database(format!("Query error: {}", e))),
        };
        let duration = super::parse_ts(&started).map(|s| (now - s).num_seconds());

        let affected = conn.execute(
            "UPDATE scan_results SET status = 'completed', completed_at = ?2, duration_seconds = ?3, \
             total_vulnerabilities = ?4, critical_count = ?5, high_count = ?6, medium_count = ?7, \
             low_count = ?8, info_count = ?9, risk_score = ?10, risk_score_delta = ?11, \
             raw_output = ?12, parsed_data = ?13 \
             WHERE id = ?1 AND status = 'running'",
            rusqlite::params![
                id,
                now.to_rfc3339(),
                duration,
                summary.counts.total(),
                summary.counts.critical,
                summary.counts.high,
                summary.counts.medium,
                summary.counts.low,
                summary.counts.info,
                summary.risk_score.clamp(0, 100),
                summary.risk_score_delta,
                summary.raw_output,
                serde_json::to_string(&summary.parsed_data)?,
            ],
        ).map_err(|e| AstraError::Database(format!("Update failed: {}", e)))?;
        Ok(affected > 0)
    }

    /// queued|running -> failed. Duration is recorded only when the scan had
    /// actually started.
    pub fn mark_scan_failed(&self, id: &str, error_message: &str) -> Result<bool, AstraError> {
        self.mark_scan_terminal(id, ScanStatus::Failed, Some(error_message))
    }

    /// queued|running -> cancelled.
    pub fn mark_scan_cancelled(&self, id: &str) -> Result<bool, AstraError> {
        self.mark_scan_terminal(id, ScanStatus::Cancelled, None)
    }

    fn mark_scan_terminal(
        &self,
        id: &str,
        status: ScanStatus,
        error_message: Option<&str>,
    ) -> Result<bool, AstraError> {
        debug_assert!(status.is_terminal());
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let started: Option<String> = match conn.query_row(
            "SELECT started_at FROM scan_results WHERE id = ?1 AND status IN ('queued', 'running')",
            rusqlite::params![id],
            |row| row.get(0),
        ) {
            Ok(started) => started,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(false),
            Err(e) => return Err(AstraError::Database(format!("Query error: {}", e))),
        };
        let duration = started
            .as_deref()
            .and_then(super::parse_ts)
            .map(|s| (now - s).num_seconds());

        let affected = conn.execute(
            "UPDATE scan_results SET status = ?2, completed_at = ?3, duration_seconds = ?4, error_message = ?5 \
             WHERE id = ?1 AND status IN ('queued', 'running')",
            rusqlite::params![id, status.as_str(), now.to_rfc3339(), duration, error_message],
        ).map_err(|e| AstraError::Database(format!("Update failed: {}", e)))?;
        Ok(affected > 0)
    }

    /// Cascades to this scan's vulnerabilities via the FK constraint.
    pub fn delete_scan(&self, id: &str) -> Result<bool, AstraError> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute("DELETE FROM scan_results WHERE id = ?1", rusqlite::params![id])
            .map_err(|e| AstraError::Database(format!("Delete failed: {}", e)))?;
        Ok(affected > 0)
    }

    /// Risk score of the most recent completed scan for a target, used to
    /// compute the delta on the next completion.
    pub fn latest_completed_risk(&self, target_id: &str) -> Result<Option<i64>, AstraError> {
        let conn = self.conn.lock().unwrap();
        match conn.query_row(
            "SELECT risk_score FROM scan_results WHERE target_id = ?1 AND status = 'completed' \
             ORDER BY completed_at DESC LIMIT 1",
            rusqlite::params![target_id],
            |row| row.get(0),
        ) {
            Ok(score) => Ok(Some(score)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(AstraError::Database(format!("Query error: {}", e))),
        }
    }
}
