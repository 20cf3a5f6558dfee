//! Tolerant line-oriented scrape of nmap XML output.
//!
//! This deliberately avoids a strict XML parse: truncated or malformed tool
//! output degrades to a partial (or empty) host list instead of failing the
//! scan. Identical input always yields identical output.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedScan {
    pub hosts: Vec<HostRecord>,
}

impl ParsedScan {
    pub fn open_port_count(&self) -> usize {
        self.hosts.iter().map(|h| h.ports.len()).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostRecord {
    pub ip: String,
    /// Best-effort OS guess; "unknown" when nmap reported nothing usable.
    pub os: String,
    pub ports: Vec<PortRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortRecord {
    pub port: u16,
    pub state: String,
    pub service: String,
}

/// Pull the value of `attr="…"` out of a line, if present.
fn extract_attr<'a>(line: &'a str, attr: &str) -> Option<&'a str> {
    let needle = format!("{}=\"", attr);
    let start = line.find(&needle)? + needle.len();
    let end = line[start..].find('"')? + start;
    Some(&line[start..end])
}

pub fn parse_probe_output(raw: &str) -> ParsedScan {
    let mut parsed = ParsedScan::default();
    let mut current_host: Option<HostRecord> = None;

    for line in raw.lines() {
        let line = line.trim();

        if line.contains("address addr=") {
            // A new address while a host is open starts the next host block;
            // nmap emits one <host> element per address.
            if let Some(ip) = extract_attr(line, "addr") {
                // Skip MAC address lines attached to the same host.
                if line.contains("addrtype=\"mac\"") {
                    continue;
                }
                if let Some(host) = current_host.take() {
                    parsed.hosts.push(host);
                }
                current_host = Some(HostRecord {
                    ip: ip.to_string(),
                    os: "unknown".to_string(),
                    ports: Vec::new(),
                });
            }
        } else if line.contains("port protocol=") {
            if let Some(host) = current_host.as_mut() {
                if line.contains("state=\"open\"") {
                    if let Some(port) = extract_attr(line, "portid").and_then(|p| p.parse::<u16>().ok()) {
                        let service = extract_attr(line, "name").unwrap_or("unknown");
                        host.ports.push(PortRecord {
                            port,
                            state: "open".to_string(),
                            service: service.to_string(),
                        });
                    }
                }
            }
        } else if line.contains("osmatch name=") {
            if let Some(host) = current_host.as_mut() {
                if host.os == "unknown" {
                    if let Some(os) = extract_attr(line, "name") {
                        host.os = os.to_string();
                    }
                }
            }
        } else if line.contains("</host>") {
            if let Some(host) = current_host.take() {
                parsed.hosts.push(host);
            }
        }
    }

    // Truncated output: keep whatever the open host block collected.
    if let Some(host) = current_host.take() {
        parsed.hosts.push(host);
    }

    parsed
}
