//! Port-based finding rules.
//!
//! The mapping is a declarative whitelist: ports without a rule produce no
//! finding. It is not a vulnerability database; it flags services whose mere
//! exposure is a problem.

use crate::models::{Severity, VulnCategory, VulnerabilityDraft};
use super::parser::ParsedScan;

pub struct PortRule {
    pub port: u16,
    pub severity: Severity,
    pub category: VulnCategory,
    pub title: &'static str,
    pub description: &'static str,
    pub remediation: &'static str,
}

pub static PORT_RULES: &[PortRule] = &[
    PortRule {
        port: 21,
        severity: Severity::Medium,
        category: VulnCategory::Network,
        title: "FTP Service Detected",
        description: "FTP service running on port 21 may be vulnerable to various attacks",
        remediation: "Consider using SFTP or FTPS instead of plain FTP",
    },
    PortRule {
        port: 23,
        severity: Severity::High,
        category: VulnCategory::Network,
        title: "Telnet Service Detected",
        description: "Telnet transmits data in clear text and is inherently insecure",
        remediation: "Replace Telnet with SSH for secure remote access",
    },
    PortRule {
        port: 80,
        severity: Severity::Medium,
        category: VulnCategory::WebApplication,
        title: "Unencrypted HTTP Service",
        description: "Web service running without encryption",
        remediation: "Implement HTTPS with valid SSL/TLS certificate",
    },
    PortRule {
        port: 445,
        severity: Severity::High,
        category: VulnCategory::Network,
        title: "SMB Service Exposed",
        description: "SMB file sharing exposed to the network is a frequent ransomware entry point",
        remediation: "Restrict SMB to trusted networks and disable SMBv1",
    },
    PortRule {
        port: 3306,
        severity: Severity::Medium,
        category: VulnCategory::Network,
        title: "MySQL Service Exposed",
        description: "Database port reachable from the scan origin",
        remediation: "Bind the database to internal interfaces or firewall the port",
    },
    PortRule {
        port: 3389,
        severity: Severity::High,
        category: VulnCategory::Network,
        title: "RDP Service Exposed",
        description: "Remote Desktop exposed to the network invites brute-force and exploit attempts",
        remediation: "Place RDP behind a VPN or gateway and enforce NLA",
    },
    PortRule {
        port: 5900,
        severity: Severity::Medium,
        category: VulnCategory::Network,
        title: "VNC Service Exposed",
        description: "VNC remote access often runs without strong authentication or encryption",
        remediation: "Tunnel VNC over SSH or replace it with an authenticated alternative",
    },
];

fn rule_for_port(port: u16) -> Option<&'static PortRule> {
    PORT_RULES.iter().find(|r| r.port == port)
}

/// One candidate finding per (host, open port) pair with a matching rule,
/// in host-then-port order. The order is not meaningful but is deterministic.
pub fn extract_vulnerabilities(parsed: &ParsedScan) -> Vec<VulnerabilityDraft> {
    let mut findings = Vec::new();

    for host in &parsed.hosts {
        for port in &host.ports {
            if let Some(rule) = rule_for_port(port.port) {
                findings.push(VulnerabilityDraft {
                    title: rule.title.to_string(),
                    description: rule.description.to_string(),
                    category: rule.category,
                    severity: rule.severity,
                    affected_asset: format!("{}:{}", host.ip, port.port),
                    remediation: rule.remediation.to_string(),
                });
            }
        }
    }

    findings
}
