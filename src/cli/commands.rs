use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "astrasecure", version, about = "Continuous security auditing platform")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP REST API server
    Serve(ServeArgs),
    /// Run a one-shot network scan and print findings as JSON
    Scan(ScanArgs),
}

#[derive(Args, Clone)]
pub struct ServeArgs {
    /// Bind address for the API server
    #[arg(long)]
    pub bind: Option<String>,

    /// Path to the SQLite database file
    #[arg(long)]
    pub db: Option<String>,

    /// Maximum number of scans probing concurrently
    #[arg(long)]
    pub workers: Option<usize>,
}

#[derive(Args, Clone)]
pub struct ScanArgs {
    /// Host, IP, or CIDR range to scan
    #[arg(short, long)]
    pub target: String,

    /// Scan profile: basic, comprehensive, quick, stealth
    #[arg(long, default_value = "basic")]
    pub profile: String,

    /// Explicit nmap option overriding the profile (repeatable)
    #[arg(long = "tool-option")]
    pub tool_options: Vec<String>,

    /// Path to the nmap binary
    #[arg(long)]
    pub nmap_path: Option<String>,

    /// Probe timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}
