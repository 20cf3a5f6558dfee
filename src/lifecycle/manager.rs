//! Scan lifecycle orchestration.
//!
//! Owns every status mutation of a scan record: request, background
//! dispatch of the probe -> parse -> extract pipeline, cancellation and
//! deletion. Dispatch runs under a global semaphore so external tool
//! fan-out stays bounded; excess dispatches wait for a permit instead of
//! failing.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::db::scans::ScanCompletion;
use crate::db::Database;
use crate::errors::AstraError;
use crate::models::{ScanRecord, ScanType, SeverityCounts, Severity};
use crate::scanner::{extract_vulnerabilities, parse_probe_output, ProbeOptions, ProbeOutcome, Prober, ScanProfile};
use super::auth::{Authorizer, CompanyAuthorizer, UserContext};
use super::state::{transition, ScanEvent};

pub struct ScanManager {
    db: Database,
    prober: Arc<dyn Prober>,
    authorizer: Arc<dyn Authorizer>,
    permits: Arc<Semaphore>,
    /// Cancellation tokens for scans currently dispatched. Cancelling marks
    /// the record first; the token is a best-effort nudge to the pipeline
    /// and does not guarantee the in-flight probe process dies.
    active: Arc<DashMap<String, CancellationToken>>,
}

impl ScanManager {
    pub fn new(db: Database, prober: Arc<dyn Prober>, max_concurrent_scans: usize) -> Self {
        Self {
            db,
            prober,
            authorizer: Arc::new(CompanyAuthorizer),
            permits: Arc::new(Semaphore::new(max_concurrent_scans.max(1))),
            active: Arc::new(DashMap::new()),
        }
    }

    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Create a queued scan record for a target the caller may scan.
    pub fn request_scan(
        &self,
        user: &UserContext,
        target_id: &str,
        scan_type: ScanType,
        config: Value,
    ) -> Result<ScanRecord, AstraError> {
        let target = self.db.get_target(target_id)?
            .ok_or_else(|| AstraError::NotFound(format!("Target {} not found", target_id)))?;

        if !self.authorizer.is_authorized(user, &target) {
            return Err(AstraError::Forbidden("Not authorized to scan this target".into()));
        }

        let scan_id = uuid::Uuid::new_v4().to_string();
        self.db.create_scan(&scan_id, &target.id, &target.company_id, scan_type, &config, Some(&user.user_id))?;
        info!(scan_id = %scan_id, target_id = %target.id, user = %user.user_id, "Scan queued");

        self.db.get_scan(&scan_id)?
            .ok_or_else(|| AstraError::Database("Scan vanished after insert".into()))
    }

    /// Run the scan pipeline in the background. The returned handle is only
    /// needed by callers that want to await completion (tests, the one-shot
    /// CLI); the API layer drops it.
    pub fn dispatch(self: &Arc<Self>, scan_id: &str) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        let scan_id = scan_id.to_string();
        let token = CancellationToken::new();
        self.active.insert(scan_id.clone(), token.clone());

        tokio::spawn(async move {
            // Wait for a worker slot; the bound applies to the whole
            // pipeline including the external probe.
            let permit = match manager.permits.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    error!(scan_id = %scan_id, "Worker pool closed");
                    manager.active.remove(&scan_id);
                    return;
                }
            };

            if let Err(e) = manager.run_pipeline(&scan_id, &token).await {
                warn!(scan_id = %scan_id, error = %e, "Scan pipeline failed");
                match manager.db.mark_scan_failed(&scan_id, &e.to_string()) {
                    Ok(true) => {}
                    Ok(false) => info!(scan_id = %scan_id, "Scan already terminal, failure not recorded"),
                    Err(db_err) => error!(scan_id = %scan_id, error = %db_err, "Could not record scan failure"),
                }
            }

            manager.active.remove(&scan_id);
            drop(permit);
        })
    }

    async fn run_pipeline(&self, scan_id: &str, token: &CancellationToken) -> Result<(), AstraError> {
        // Guarded queued -> running; loses to a cancel that landed first.
        if !self.db.mark_scan_running(scan_id)? {
            info!(scan_id = %scan_id, "Scan no longer queued, skipping dispatch");
            return Ok(());
        }

        let scan = self.db.get_scan(scan_id)?
            .ok_or_else(|| AstraError::NotFound(format!("Scan {} not found", scan_id)))?;
        let target = self.db.get_target(&scan.target_id)?
            .ok_or_else(|| AstraError::NotFound(format!("Target {} not found", scan.target_id)))?;

        let options = probe_options(&scan.scan_config);

        info!(scan_id = %scan_id, target = %target.target_value, profile = %options.profile, "Scan running");
        let outcome = self.prober.probe(&target.target_value, &options).await;

        let raw_output = match outcome {
            ProbeOutcome::Completed(raw) => raw,
            ProbeOutcome::TimedOut => {
                return Err(AstraError::ProbeTimeout(
                    "Scan timed out before the probe finished".into(),
                ));
            }
            ProbeOutcome::ToolError(msg) => return Err(AstraError::ProbeTool(msg)),
        };

        if token.is_cancelled() {
            // The record was already marked cancelled; drop the results.
            info!(scan_id = %scan_id, "Scan cancelled mid-probe, discarding results");
            return Ok(());
        }

        // Tolerant parse: bad output degrades to an empty host list.
        let parsed = parse_probe_output(&raw_output);
        let findings = extract_vulnerabilities(&parsed);

        let mut counts = SeverityCounts::default();
        for draft in &findings {
            match draft.severity {
                Severity::Critical => counts.critical += 1,
                Severity::High => counts.high += 1,
                Severity::Medium => counts.medium += 1,
                Severity::Low => counts.low += 1,
                Severity::Info => counts.info += 1,
            }
            self.db.insert_vulnerability(
                scan_id,
                &target.id,
                &target.company_id,
                self.prober.scanner_name(),
                draft,
            )?;
        }

        // Documented heuristic, not a calibrated risk model.
        let risk_score = (findings.len() as i64 * 10).min(100);
        let previous = self.db.latest_completed_risk(&target.id)?.unwrap_or(0);

        let completed = self.db.mark_scan_completed(scan_id, &ScanCompletion {
            counts,
            risk_score,
            risk_score_delta: risk_score - previous,
            raw_output,
            parsed_data: serde_json::to_value(&parsed)?,
        })?;

        if completed {
            let completed_at = self.db.get_scan(scan_id)?
                .and_then(|s| s.completed_at)
                .unwrap_or_else(Utc::now);
            self.db.record_target_scan(&target.id, risk_score, completed_at)?;
            info!(
                scan_id = %scan_id,
                findings = findings.len(),
                risk_score,
                "Scan completed"
            );
        } else {
            // Cancel won after findings were persisted; the cancelled record
            // must not keep them.
            let removed = self.db.delete_scan_vulnerabilities(scan_id)?;
            info!(scan_id = %scan_id, removed, "Scan reached terminal state concurrently, findings discarded");
        }

        Ok(())
    }

    /// Mark a queued or running scan cancelled. A running probe process is
    /// not guaranteed to be killed; its results are discarded when it ends.
    pub fn cancel(&self, user: &UserContext, scan_id: &str) -> Result<(), AstraError> {
        let scan = self.scan_for_update(user, scan_id)?;
        transition(scan.status, ScanEvent::Cancel)?;

        if !self.db.mark_scan_cancelled(scan_id)? {
            return Err(AstraError::InvalidState(format!(
                "cannot cancel a scan that is no longer {}",
                scan.status
            )));
        }
        if let Some(token) = self.active.get(scan_id) {
            token.cancel();
        }
        info!(scan_id = %scan_id, user = %user.user_id, "Scan cancelled");
        Ok(())
    }

    /// Remove a scan record at any status; vulnerabilities cascade.
    pub fn delete(&self, user: &UserContext, scan_id: &str) -> Result<(), AstraError> {
        self.scan_for_update(user, scan_id)?;
        if !self.db.delete_scan(scan_id)? {
            return Err(AstraError::NotFound(format!("Scan {} not found", scan_id)));
        }
        info!(scan_id = %scan_id, user = %user.user_id, "Scan deleted");
        Ok(())
    }

    fn scan_for_update(&self, user: &UserContext, scan_id: &str) -> Result<ScanRecord, AstraError> {
        let scan = self.db.get_scan(scan_id)?
            .ok_or_else(|| AstraError::NotFound(format!("Scan {} not found", scan_id)))?;
        let target = self.db.get_target(&scan.target_id)?
            .ok_or_else(|| AstraError::NotFound(format!("Target {} not found", scan.target_id)))?;
        if !self.authorizer.is_authorized(user, &target) {
            return Err(AstraError::Forbidden("Not authorized for this scan".into()));
        }
        Ok(scan)
    }
}

/// Probe parameters from a scan's stored config: a named profile, plus an
/// optional `custom_options` list of explicit tool arguments overriding it.
fn probe_options(config: &Value) -> ProbeOptions {
    let profile = config.get("scan_profile")
        .and_then(|v| v.as_str())
        .map(ScanProfile::parse_or_default)
        .unwrap_or_default();
    let custom = config.get("custom_options")
        .and_then(|v| v.as_array())
        .map(|args| args.iter().filter_map(|a| a.as_str().map(str::to_string)).collect());
    ProbeOptions { profile, custom }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::auth::UserRole;
    use crate::models::{CreateTarget, Criticality, ScanStatus, TargetType};
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;

    const FIXTURE_XML: &str = r#"<?xml version="1.0"?>
<nmaprun scanner="nmap">
<host><address addr="10.0.0.5" addrtype="ipv4"/>
<port protocol="tcp" portid="21"><state state="open"/><service name="ftp"/></port>
<port protocol="tcp" portid="80"><state state="open"/><service name="http"/></port>
</host>
</nmaprun>"#;

    const TELNET_XML: &str = r#"<nmaprun>
<host><address addr="10.0.0.5" addrtype="ipv4"/>
<port protocol="tcp" portid="23"><state state="open"/></port>
</host>
</nmaprun>"#;

    struct FakeProber {
        outcome: ProbeOutcome,
        delay: Duration,
    }

    impl FakeProber {
        fn completed(xml: &str) -> Self {
            Self { outcome: ProbeOutcome::Completed(xml.to_string()), delay: Duration::ZERO }
        }
    }

    #[async_trait]
    impl Prober for FakeProber {
        async fn probe(&self, _target: &str, _options: &ProbeOptions) -> ProbeOutcome {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.outcome.clone()
        }
    }

    /// Records the options it was invoked with.
    struct RecordingProber {
        seen: std::sync::Mutex<Vec<ProbeOptions>>,
    }

    #[async_trait]
    impl Prober for RecordingProber {
        async fn probe(&self, _target: &str, options: &ProbeOptions) -> ProbeOutcome {
            self.seen.lock().unwrap().push(options.clone());
            ProbeOutcome::Completed(TELNET_XML.to_string())
        }
    }

    /// Cancels its own scan record mid-probe, directly in the database, so
    /// the pipeline only notices when its completion update loses the race.
    struct SelfCancellingProber {
        db: Database,
        scan_id: std::sync::Mutex<String>,
    }

    #[async_trait]
    impl Prober for SelfCancellingProber {
        async fn probe(&self, _target: &str, _options: &ProbeOptions) -> ProbeOutcome {
            let id = self.scan_id.lock().unwrap().clone();
            assert!(self.db.mark_scan_cancelled(&id).unwrap());
            ProbeOutcome::Completed(FIXTURE_XML.to_string())
        }
    }

    fn manager_with(prober: FakeProber) -> Arc<ScanManager> {
        let db = Database::in_memory().unwrap();
        Arc::new(ScanManager::new(db, Arc::new(prober), 5))
    }

    fn user(company: &str) -> UserContext {
        UserContext {
            user_id: "user-1".to_string(),
            company_id: company.to_string(),
            role: UserRole::Member,
        }
    }

    fn seed_target(manager: &ScanManager, company: &str) -> String {
        let req = CreateTarget {
            name: "edge".to_string(),
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
        manager.db().create_target(company, &req).unwrap().id
    }

    #[tokio::test]
    async fn test_end_to_end_quick_scan() {
        let manager = manager_with(FakeProber::completed(FIXTURE_XML));
        let target_id = seed_target(&manager, "acme");

        let scan = manager.request_scan(&user("acme"), &target_id,
            ScanType::NetworkScan, json!({"scan_profile": "quick"})).unwrap();
        assert_eq!(scan.status, ScanStatus::Queued);

        manager.dispatch(&scan.id).await.unwrap();

        let done = manager.db().get_scan(&scan.id).unwrap().unwrap();
        assert_eq!(done.status, ScanStatus::Completed);
        assert_eq!(done.total_vulnerabilities, 2);
        assert_eq!(done.counts.medium, 2);
        assert_eq!(done.risk_score, 20);
        assert_eq!(done.risk_score_delta, 20);
        assert!(done.duration_seconds.is_some());
        assert!(done.raw_output.as_deref().unwrap().contains("nmaprun"));

        let target = manager.db().get_target(&target_id).unwrap().unwrap();
        assert_eq!(target.risk_score, 20);
        assert!(target.last_scan_at.is_some());

        let vulns = manager.db().get_scan_vulnerabilities(&scan.id).unwrap();
        assert_eq!(vulns.len(), 2);
        assert!(vulns.iter().any(|v| v.affected_asset == "10.0.0.5:21"));
        assert!(vulns.iter().any(|v| v.affected_asset == "10.0.0.5:80"));
    }

    #[tokio::test]
    async fn test_timeout_marks_scan_failed() {
        let manager = manager_with(FakeProber {
            outcome: ProbeOutcome::TimedOut,
            delay: Duration::ZERO,
        });
        let target_id = seed_target(&manager, "acme");
        let scan = manager.request_scan(&user("acme"), &target_id, ScanType::NetworkScan, json!({})).unwrap();

        manager.dispatch(&scan.id).await.unwrap();

        let failed = manager.db().get_scan(&scan.id).unwrap().unwrap();
        assert_eq!(failed.status, ScanStatus::Failed);
        assert!(failed.error_message.as_deref().unwrap().contains("timed out"));
        assert_eq!(failed.total_vulnerabilities, 0);
    }

    #[tokio::test]
    async fn test_tool_error_marks_scan_failed() {
        let manager = manager_with(FakeProber {
            outcome: ProbeOutcome::ToolError("Nmap scan failed: segfault".to_string()),
            delay: Duration::ZERO,
        });
        let target_id = seed_target(&manager, "acme");
        let scan = manager.request_scan(&user("acme"), &target_id, ScanType::NetworkScan, json!({})).unwrap();

        manager.dispatch(&scan.id).await.unwrap();

        let failed = manager.db().get_scan(&scan.id).unwrap().unwrap();
        assert_eq!(failed.status, ScanStatus::Failed);
        assert!(failed.error_message.as_deref().unwrap().contains("segfault"));
    }

    #[tokio::test]
    async fn test_unauthorized_request_creates_nothing() {
        let manager = manager_with(FakeProber::completed(FIXTURE_XML));
        let target_id = seed_target(&manager, "acme");

        let err = manager.request_scan(&user("globex"), &target_id, ScanType::NetworkScan, json!({})).unwrap_err();
        assert!(matches!(err, AstraError::Forbidden(_)));
        assert!(manager.db().list_scans("acme", None, None, 100, 0).unwrap().is_empty());
        assert!(manager.db().list_scans("globex", None, None, 100, 0).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_request_missing_target_not_found() {
        let manager = manager_with(FakeProber::completed(FIXTURE_XML));
        let err = manager.request_scan(&user("acme"), "no-such-target", ScanType::NetworkScan, json!({})).unwrap_err();
        assert!(matches!(err, AstraError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_cancel_queued_then_dispatch_is_noop() {
        let manager = manager_with(FakeProber::completed(FIXTURE_XML));
        let target_id = seed_target(&manager, "acme");
        let scan = manager.request_scan(&user("acme"), &target_id, ScanType::NetworkScan, json!({})).unwrap();

        manager.cancel(&user("acme"), &scan.id).unwrap();
        manager.dispatch(&scan.id).await.unwrap();

        let cancelled = manager.db().get_scan(&scan.id).unwrap().unwrap();
        assert_eq!(cancelled.status, ScanStatus::Cancelled);
        assert_eq!(cancelled.total_vulnerabilities, 0);
        assert!(manager.db().get_scan_vulnerabilities(&scan.id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_terminal_is_invalid_state() {
        let manager = manager_with(FakeProber::completed(FIXTURE_XML));
        let target_id = seed_target(&manager, "acme");
        let scan = manager.request_scan(&user("acme"), &target_id, ScanType::NetworkScan, json!({})).unwrap();
        manager.dispatch(&scan.id).await.unwrap();

        let err = manager.cancel(&user("acme"), &scan.id).unwrap_err();
        assert!(matches!(err, AstraError::InvalidState(_)));
        let scan = manager.db().get_scan(&scan.id).unwrap().unwrap();
        assert_eq!(scan.status, ScanStatus::Completed);
    }

    #[tokio::test]
    async fn test_cancel_requires_authorization() {
        let manager = manager_with(FakeProber::completed(FIXTURE_XML));
        let target_id = seed_target(&manager, "acme");
        let scan = manager.request_scan(&user("acme"), &target_id, ScanType::NetworkScan, json!({})).unwrap();

        let err = manager.cancel(&user("globex"), &scan.id).unwrap_err();
        assert!(matches!(err, AstraError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_delete_twice_reports_not_found() {
        let manager = manager_with(FakeProber::completed(FIXTURE_XML));
        let target_id = seed_target(&manager, "acme");
        let scan = manager.request_scan(&user("acme"), &target_id, ScanType::NetworkScan, json!({})).unwrap();

        manager.delete(&user("acme"), &scan.id).unwrap();
        let err = manager.delete(&user("acme"), &scan.id).unwrap_err();
        assert!(matches!(err, AstraError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_risk_delta_against_previous_scan() {
        let db = Database::in_memory().unwrap();
        let first = Arc::new(ScanManager::new(db.clone(), Arc::new(FakeProber::completed(FIXTURE_XML)), 5));
        let target_id = seed_target(&first, "acme");

        let scan1 = first.request_scan(&user("acme"), &target_id, ScanType::NetworkScan, json!({})).unwrap();
        first.dispatch(&scan1.id).await.unwrap();

        // Second run finds only telnet: risk drops from 20 to 10.
        let second = Arc::new(ScanManager::new(db, Arc::new(FakeProber::completed(TELNET_XML)), 5));
        let scan2 = second.request_scan(&user("acme"), &target_id, ScanType::NetworkScan, json!({})).unwrap();
        second.dispatch(&scan2.id).await.unwrap();

        let done = second.db().get_scan(&scan2.id).unwrap().unwrap();
        assert_eq!(done.risk_score, 10);
        assert_eq!(done.risk_score_delta, -10);
        assert_eq!(done.counts.high, 1);

        let target = second.db().get_target(&target_id).unwrap().unwrap();
        assert_eq!(target.risk_score, 10);
    }

    #[tokio::test]
    async fn test_custom_options_reach_the_prober() {
        let db = Database::in_memory().unwrap();
        let prober = Arc::new(RecordingProber { seen: std::sync::Mutex::new(Vec::new()) });
        let manager = Arc::new(ScanManager::new(db, prober.clone(), 5));
        let target_id = seed_target(&manager, "acme");

        let scan = manager.request_scan(&user("acme"), &target_id, ScanType::NetworkScan, json!({
            "scan_profile": "quick",
            "custom_options": ["-sT", "-p", "1-100"]
        })).unwrap();
        manager.dispatch(&scan.id).await.unwrap();

        let seen = prober.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].profile, ScanProfile::Quick);
        assert_eq!(seen[0].tool_args(), vec!["-sT", "-p", "1-100"]);
    }

    #[tokio::test]
    async fn test_config_without_custom_options_uses_profile() {
        let db = Database::in_memory().unwrap();
        let prober = Arc::new(RecordingProber { seen: std::sync::Mutex::new(Vec::new()) });
        let manager = Arc::new(ScanManager::new(db, prober.clone(), 5));
        let target_id = seed_target(&manager, "acme");

        let scan = manager.request_scan(&user("acme"), &target_id, ScanType::NetworkScan,
            json!({"scan_profile": "stealth"})).unwrap();
        manager.dispatch(&scan.id).await.unwrap();

        let seen = prober.seen.lock().unwrap();
        assert_eq!(seen[0].tool_args(), vec!["-sS", "-T1", "-f"]);
    }

    #[tokio::test]
    async fn test_cancel_during_probe_discards_findings() {
        let db = Database::in_memory().unwrap();
        let prober = Arc::new(SelfCancellingProber {
            db: db.clone(),
            scan_id: std::sync::Mutex::new(String::new()),
        });
        let manager = Arc::new(ScanManager::new(db, prober.clone(), 5));
        let target_id = seed_target(&manager, "acme");

        let scan = manager.request_scan(&user("acme"), &target_id, ScanType::NetworkScan, json!({})).unwrap();
        *prober.scan_id.lock().unwrap() = scan.id.clone();

        manager.dispatch(&scan.id).await.unwrap();

        let record = manager.db().get_scan(&scan.id).unwrap().unwrap();
        assert_eq!(record.status, ScanStatus::Cancelled);
        assert_eq!(record.total_vulnerabilities, 0);
        // Findings inserted before the lost completion race are cleaned up.
        assert!(manager.db().get_scan_vulnerabilities(&scan.id).unwrap().is_empty());

        let stats = manager.db().company_stats("acme").unwrap();
        assert_eq!(stats.open_vulnerabilities, 0);
        assert_eq!(stats.compliance_score, 100);

        let target = manager.db().get_target(&target_id).unwrap().unwrap();
        assert_eq!(target.risk_score, 0);
        assert!(target.last_scan_at.is_none());
    }

    #[tokio::test]
    async fn test_concurrency_bound_queues_rather_than_fails() {
        let db = Database::in_memory().unwrap();
        let prober = FakeProber {
            outcome: ProbeOutcome::Completed(TELNET_XML.to_string()),
            delay: Duration::from_millis(50),
        };
        let manager = Arc::new(ScanManager::new(db, Arc::new(prober), 1));
        let target_id = seed_target(&manager, "acme");

        let s1 = manager.request_scan(&user("acme"), &target_id, ScanType::NetworkScan, json!({})).unwrap();
        let s2 = manager.request_scan(&user("acme"), &target_id, ScanType::NetworkScan, json!({})).unwrap();

        let h1 = manager.dispatch(&s1.id);
        let h2 = manager.dispatch(&s2.id);
        let (r1, r2) = tokio::join!(h1, h2);
        r1.unwrap();
        r2.unwrap();

        for id in [&s1.id, &s2.id] {
            let scan = manager.db().get_scan(id).unwrap().unwrap();
            assert_eq!(scan.status, ScanStatus::Completed);
        }
    }
}
