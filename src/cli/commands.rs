use clap::{Parser, Subcommand, Args};

use crate::config::{ApiGeneration, DistributionSystem};
use crate::pipeline::state::ReportKind;

#[derive(Parser)]
#[command(
    name = "stingray-scan",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ", built ", env!("BUILD_TIMESTAMP"), ")"),
    about = "Run Stingray mobile application scans from CI"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Submit a binary, wait for the scans and write reports
    Scan(ScanArgs),
    /// Validate a configuration file
    Validate(ValidateArgs),
}

#[derive(Args, Clone, Default)]
pub struct ScanArgs {
    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Stingray base URL
    #[arg(long)]
    pub url: Option<String>,

    /// Service API generation
    #[arg(long, value_enum)]
    pub api: Option<ApiGeneration>,

    /// Access token (or STINGRAY_TOKEN)
    #[arg(long)]
    pub token: Option<String>,

    /// Company id (current API)
    #[arg(long)]
    pub company_id: Option<String>,

    /// Architecture id (current API)
    #[arg(long)]
    pub architecture_id: Option<String>,

    /// Architecture type, android or ios (current API)
    #[arg(long)]
    pub architecture_type: Option<String>,

    /// Scan profile id
    #[arg(long)]
    pub profile: Option<u64>,

    /// Test case id; repeat or comma-separate for several
    #[arg(long = "testcase", value_delimiter = ',')]
    pub testcases: Vec<u64>,

    /// Report type: standard, grouping or separate; repeatable
    #[arg(long = "report", value_delimiter = ',', value_parser = parse_report_kind)]
    pub reports: Vec<ReportKind>,

    /// Directory for report files
    #[arg(short, long)]
    pub output_dir: Option<String>,

    /// Also write the merged issues to this JSON file
    #[arg(long)]
    pub json_file: Option<String>,

    /// Start the scans and exit without waiting for results
    #[arg(long, visible_alias = "nowait")]
    pub no_wait: bool,

    /// Seconds between status checks
    #[arg(long)]
    pub poll_interval: Option<u64>,

    /// Status checks per bounded wait stage (current API)
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Attempts per status or result read
    #[arg(long)]
    pub retry_attempts: Option<u32>,

    /// Seconds between read attempts
    #[arg(long)]
    pub retry_delay: Option<u64>,

    /// Where the binary comes from
    #[arg(long, value_enum)]
    pub distribution_system: Option<DistributionSystem>,

    /// Local binary path (file distribution)
    #[arg(long)]
    pub file_path: Option<String>,

    #[arg(long)]
    pub hockey_token: Option<String>,

    #[arg(long)]
    pub hockey_bundle_id: Option<String>,

    #[arg(long)]
    pub hockey_public_id: Option<String>,

    /// HockeyApp version, latest when unset
    #[arg(long)]
    pub hockey_version: Option<String>,

    #[arg(long)]
    pub appcenter_token: Option<String>,

    #[arg(long)]
    pub appcenter_owner_name: Option<String>,

    #[arg(long)]
    pub appcenter_app_name: Option<String>,

    #[arg(long)]
    pub appcenter_release_id: Option<String>,

    #[arg(long)]
    pub appcenter_app_version: Option<String>,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Configuration file to validate
    pub config: String,
}

fn parse_report_kind(value: &str) -> Result<ReportKind, String> {
    ReportKind::parse(value).ok_or_else(|| {
        format!("invalid report type '{}': expected standard, grouping or separate", value)
    })
}
