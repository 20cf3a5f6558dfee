use serde::{Deserialize, Serialize};

/// Named bundle of nmap options trading thoroughness for speed and stealth.
/// The option mapping is a design constant, not user-configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScanProfile {
    #[default]
    Basic,
    Comprehensive,
    Quick,
    Stealth,
}

impl ScanProfile {
    pub fn options(&self) -> &'static [&'static str] {
        match self {
            // SYN scan, OS detection, version detection
            Self::Basic => &["-sS", "-O", "-sV"],
            Self::Comprehensive => &["-sS", "-sU", "-O", "-sV", "-sC", "--script=vuln"],
            Self::Quick => &["-sS", "-T4", "--top-ports", "1000"],
            Self::Stealth => &["-sS", "-T1", "-f"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Comprehensive => "comprehensive",
            Self::Quick => "quick",
            Self::Stealth => "stealth",
        }
    }

    /// Unknown names fall back to basic, matching the scanner's historic
    /// behavior of never rejecting a profile string.
    pub fn parse_or_default(s: &str) -> Self {
        match s {
            "comprehensive" => Self::Comprehensive,
            "quick" => Self::Quick,
            "stealth" => Self::Stealth,
            _ => Self::Basic,
        }
    }
}

impl std::fmt::Display for ScanProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog entry surfaced by the profiles API.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileInfo {
    pub profile: ScanProfile,
    pub name: &'static str,
    pub description: &'static str,
    pub duration: &'static str,
    pub aggressiveness: &'static str,
}

pub static PROFILE_CATALOG: &[ProfileInfo] = &[
    ProfileInfo {
        profile: ScanProfile::Basic,
        name: "Basic Scan",
        description: "Standard TCP SYN scan with OS and version detection",
        duration: "5-15 minutes",
        aggressiveness: "medium",
    },
    ProfileInfo {
        profile: ScanProfile::Comprehensive,
        name: "Comprehensive Scan",
        description: "Full scan including UDP, scripts, and vulnerability detection",
        duration: "30-60 minutes",
        aggressiveness: "high",
    },
    ProfileInfo {
        profile: ScanProfile::Quick,
        name: "Quick Scan",
        description: "Fast scan of top 1000 ports",
        duration: "1-5 minutes",
        aggressiveness: "medium",
    },
    ProfileInfo {
        profile: ScanProfile::Stealth,
        name: "Stealth Scan",
        description: "Slow, fragmented scan to avoid detection",
        duration: "20-45 minutes",
        aggressiveness: "low",
    },
];
