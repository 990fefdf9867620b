//! Clap derive structures for the `bmsdash` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};

use bmsdash_core::Domain;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// bmsdash -- building-management telemetry from the command line
#[derive(Debug, Parser)]
#[command(
    name = "bmsdash",
    version,
    about = "Monitor building-management telemetry from the command line",
    long_about = "Logs in to a building-management backend, lists electrical panels and\n\
        environmental sensors, and queries their trends and reading logs.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Backend profile to use
    #[arg(long, short = 'p', env = "BMSDASH_PROFILE", global = true)]
    pub profile: Option<String>,

    /// API root URL (overrides profile)
    #[arg(long, short = 'u', env = "BMSDASH_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "BMSDASH_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "BMSDASH_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "BMSDASH_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and store the session in the system keyring
    Login(LoginArgs),

    /// End the session and clear stored credentials
    Logout,

    /// Show the cached user profile
    Whoami,

    /// Show or choose the active application
    #[command(alias = "application")]
    App(AppArgs),

    /// List reconciled machines for a domain
    #[command(alias = "m", alias = "ls")]
    Machines(MachinesArgs),

    /// Fleet counts and energy totals for a domain
    Summary(DomainArg),

    /// Trend series for one machine and parameter
    Trend(TrendArgs),

    /// Reading log for one machine
    Logs(LogsArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Session ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Login name (defaults to the profile's username, then prompts)
    #[arg(long, env = "BMSDASH_USERNAME")]
    pub username: Option<String>,

    /// Remember the password in the system keyring
    #[arg(long)]
    pub save_password: bool,
}

#[derive(Debug, Args)]
pub struct AppArgs {
    #[command(subcommand)]
    pub command: AppCommand,
}

#[derive(Debug, Subcommand)]
pub enum AppCommand {
    /// Print the active application
    Show,

    /// Choose the active application (prompts when omitted)
    Select {
        /// Application name
        name: Option<Domain>,
    },
}

// ── Machines & telemetry ─────────────────────────────────────────────

/// Domain selector shared by list-style commands.
#[derive(Debug, Args)]
pub struct DomainArg {
    /// Device domain (defaults to the active application)
    pub domain: Option<Domain>,
}

#[derive(Debug, Args)]
pub struct MachinesArgs {
    #[command(flatten)]
    pub domain: DomainArg,

    /// Only show machines reporting online
    #[arg(long)]
    pub online: bool,
}

#[derive(Debug, Args)]
pub struct TrendArgs {
    /// Device domain
    pub domain: Domain,

    /// Machine identifier
    pub machine: String,

    /// Parameter to chart (e.g. voltage, temperature)
    pub parameter: String,

    /// Window length in hours ending now
    #[arg(long, default_value = "6", conflicts_with_all = ["start", "end"])]
    pub hours: i64,

    /// Window start (RFC 3339)
    #[arg(long, requires = "end")]
    pub start: Option<DateTime<Utc>>,

    /// Window end (RFC 3339)
    #[arg(long, requires = "start")]
    pub end: Option<DateTime<Utc>>,

    /// Max points to return
    #[arg(long, short = 'l')]
    pub limit: Option<u32>,
}

#[derive(Debug, Args)]
pub struct LogsArgs {
    /// Device domain
    pub domain: Domain,

    /// Machine identifier
    pub machine: String,

    /// Max entries to return
    #[arg(long, short = 'l')]
    pub limit: Option<u32>,

    /// Pagination offset
    #[arg(long)]
    pub offset: Option<u32>,

    /// Range start (RFC 3339)
    #[arg(long)]
    pub start: Option<DateTime<Utc>>,

    /// Range end (RFC 3339)
    #[arg(long)]
    pub end: Option<DateTime<Utc>>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create or update a profile with guided setup
    Init,

    /// Display current configuration
    Show,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Print the config file location
    Path,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn domain_parses_case_insensitively() {
        let cli = Cli::try_parse_from(["bmsdash", "summary", "Electrical"]).unwrap();
        match cli.command {
            Command::Summary(arg) => assert_eq!(arg.domain, Some(Domain::Electrical)),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn trend_window_flags_conflict_with_hours() {
        let result = Cli::try_parse_from([
            "bmsdash", "trend", "electrical", "7", "voltage", "--hours", "2", "--start",
            "2024-06-15T00:00:00Z", "--end", "2024-06-15T06:00:00Z",
        ]);
        assert!(result.is_err());
    }
}
