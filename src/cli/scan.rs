use serde_json::json;
use tracing::info;

use crate::cli::commands::ScanArgs;
use crate::config::Settings;
use crate::errors::AstraError;
use crate::scanner::{extract_vulnerabilities, parse_probe_output, NmapProber, ProbeOptions, ProbeOutcome, Prober, ScanProfile};

/// Headless probe of a single target. Nothing is persisted; the report goes
/// to stdout as JSON.
pub async fn handle_scan(args: ScanArgs) -> Result<(), AstraError> {
    let settings = Settings::from_env()?;
    let nmap_path = args.nmap_path.unwrap_or(settings.nmap_path);
    let timeout = args.timeout.unwrap_or(settings.probe_timeout_secs);
    let options = ProbeOptions {
        profile: ScanProfile::parse_or_default(&args.profile),
        custom: (!args.tool_options.is_empty()).then(|| args.tool_options.clone()),
    };

    let prober = NmapProber::new(nmap_path, timeout);
    info!(target = %args.target, profile = %options.profile, "Running one-shot scan");

    let raw = match prober.probe(&args.target, &options).await {
        ProbeOutcome::Completed(raw) => raw,
        ProbeOutcome::TimedOut => {
            return Err(AstraError::ProbeTimeout(format!(
                "Scan of {} timed out after {} seconds", args.target, timeout
            )));
        }
        ProbeOutcome::ToolError(msg) => return Err(AstraError::ProbeTool(msg)),
    };

    let parsed = parse_probe_output(&raw);
    let findings = extract_vulnerabilities(&parsed);

    let report = json!({
        "target": args.target,
        "profile": options.profile,
        "hosts": parsed.hosts,
        "open_ports": parsed.open_port_count(),
        "findings": findings,
        "total_findings": findings.len(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
