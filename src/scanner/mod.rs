pub mod parser;
pub mod probe;
pub mod profiles;
pub mod rules;

pub use parser::{parse_probe_output, ParsedScan};
pub use probe::{NmapProber, ProbeOptions, ProbeOutcome, Prober};
pub use profiles::{ProfileInfo, ScanProfile, PROFILE_CATALOG};
pub use rules::extract_vulnerabilities;
