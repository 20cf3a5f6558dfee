//! Nmap process wrapper.
//!
//! Runs the external tool via `tokio::process::Command` with a hard timeout.
//! The process is spawned with `kill_on_drop` so a timeout kills it rather
//! than leaving it running in the background.

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{info, warn};

use super::profiles::ScanProfile;

/// Outcome of a single probe invocation. No partial or streaming results;
/// the adapter never retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Tool exited zero; raw XML captured from stdout.
    Completed(String),
    TimedOut,
    /// Tool missing or exited non-zero; message carries stderr.
    ToolError(String),
}

/// Tool invocation parameters: a named profile, optionally overridden by an
/// explicit option list supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct ProbeOptions {
    pub profile: ScanProfile,
    pub custom: Option<Vec<String>>,
}

impl ProbeOptions {
    pub fn profile(profile: ScanProfile) -> Self {
        Self { profile, custom: None }
    }

    /// Arguments handed to the tool. A non-empty custom list wins over the
    /// profile mapping.
    pub fn tool_args(&self) -> Vec<String> {
        match &self.custom {
            Some(args) if !args.is_empty() => args.clone(),
            _ => self.profile.options().iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Injected probing interface so the pipeline can be driven by a
/// deterministic fake in tests.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, target: &str, options: &ProbeOptions) -> ProbeOutcome;

    /// Name recorded on findings produced from this prober's output.
    fn scanner_name(&self) -> &str {
        "nmap"
    }
}

pub struct NmapProber {
    nmap_path: String,
    timeout: Duration,
}

impl NmapProber {
    pub fn new(nmap_path: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            nmap_path: nmap_path.into(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

#[async_trait]
impl Prober for NmapProber {
    async fn probe(&self, target: &str, options: &ProbeOptions) -> ProbeOutcome {
        let mut cmd = Command::new(&self.nmap_path);
        cmd.args(options.tool_args())
            .arg("-oX")
            .arg("-")
            .arg(target)
            .kill_on_drop(true);

        info!(target = %target, profile = %options.profile, "Starting nmap scan");

        let result = tokio::time::timeout(self.timeout, cmd.output()).await;
        let output = match result {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!(target = %target, error = %e, "Failed to launch nmap");
                return ProbeOutcome::ToolError(format!("Failed to execute nmap: {}", e));
            }
            Err(_) => {
                warn!(target = %target, timeout_secs = self.timeout.as_secs(), "Nmap scan timed out");
                return ProbeOutcome::TimedOut;
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            warn!(target = %target, code = output.status.code().unwrap_or(-1), "Nmap exited non-zero");
            return ProbeOutcome::ToolError(format!("Nmap scan failed: {}", stderr.trim()));
        }

        info!(target = %target, bytes = output.stdout.len(), "Nmap scan complete");
        ProbeOutcome::Completed(String::from_utf8_lossy(&output.stdout).to_string())
    }
}
