pub mod scans;
pub mod system;
pub mod targets;
pub mod vulnerabilities;
