//! Clap derive structures for the `wolflink` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// wolflink -- read Wolf Smartset heating systems from the terminal
#[derive(Debug, Parser)]
#[command(
    name = "wolflink",
    version,
    about = "Read Wolf Smartset heating systems from the command line",
    long_about = "Talks to the Wolf Smartset portal on behalf of your account.\n\n\
        Lists heating systems, reports whether their gateways are online,\n\
        and reads the parameters and live values shown in the portal UI.",
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
    /// Account profile to use
    #[arg(long, short = 'p', env = "WOLFLINK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "WOLFLINK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Smartset account name (overrides profile)
    #[arg(long, short = 'u', env = "WOLFLINK_USERNAME", global = true)]
    pub username: Option<String>,

    /// Portal base URL (overrides profile)
    #[arg(long, env = "WOLFLINK_PORTAL_URL", global = true)]
    pub portal_url: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "WOLFLINK_OUTPUT",
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

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', env = "WOLFLINK_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "WOLFLINK_TIMEOUT", global = true)]
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
    /// List the heating systems of the account
    #[command(alias = "ls")]
    Systems,

    /// Show whether a system's gateway is online
    Status(SystemArgs),

    /// List the parameters the portal exposes for a system
    #[command(alias = "params")]
    Parameters(ParametersArgs),

    /// Read live parameter values
    Values(ValuesArgs),

    /// Poll live values until interrupted
    Watch(WatchArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Command Arguments ────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SystemArgs {
    /// System id or name
    pub system: String,
}

#[derive(Debug, Args)]
pub struct ParametersArgs {
    /// System id or name
    pub system: String,

    /// Only parameters from this tab (case-insensitive)
    #[arg(long, short = 't')]
    pub tab: Option<String>,
}

#[derive(Debug, Args)]
pub struct ValuesArgs {
    /// System id or name
    pub system: String,

    /// Only parameters from this tab (case-insensitive)
    #[arg(long, short = 't')]
    pub tab: Option<String>,

    /// Only these value ids (repeatable)
    #[arg(long = "value-id", short = 'i')]
    pub value_ids: Vec<i64>,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    #[command(flatten)]
    pub values: ValuesArgs,

    /// Seconds between polls
    #[arg(long, short = 'n', default_value = "60", value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: u64,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current configuration (secrets masked)
    Show,

    /// Set a value on the active profile
    Set {
        /// Profile key, e.g. "username" or "timeout"
        key: String,

        /// Value to set
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store a password in the system keyring
    SetPassword {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,
    },

    /// Print the config file location
    Path,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
