//! Command-line interface argument parsing and definitions
//!
//! This module defines the CLI structure using clap's derive API.
//! Connection settings are global so they can follow any subcommand.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tower_core::config::parse_bool;
use tower_core::ConfigSource;

/// Tower CLI - talk to a Tower/AWX automation controller
///
/// Connection settings are read from tower_cli.cfg files, then from the
/// environment and finally from the flags below.
#[derive(Parser, Debug)]
#[command(
    name = "tower",
    version,
    author,
    about,
    long_about = None,
    propagate_version = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Enable verbose output (can be used multiple times for increased verbosity)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Output format for results
    #[arg(short, long, value_enum, global = true, default_value = "human")]
    pub output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Settings that override every config file
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Controller address, e.g. tower.example.org or https://10.0.0.5:8043
    #[arg(long, global = true, env = "TOWER_HOST")]
    pub host: Option<String>,

    /// Username for Basic authentication
    #[arg(long, global = true, env = "TOWER_USERNAME")]
    pub username: Option<String>,

    /// Password for Basic authentication
    #[arg(long, global = true, env = "TOWER_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Pre-issued OAuth token; skips token issuance
    #[arg(long, global = true, env = "TOWER_OAUTH_TOKEN", hide_env_values = true)]
    pub oauth_token: Option<String>,

    /// Verify the controller's TLS certificate
    #[arg(
        long,
        global = true,
        env = "TOWER_VERIFY_SSL",
        value_name = "BOOL",
        value_parser = parse_verify_ssl
    )]
    pub verify_ssl: Option<bool>,

    /// Path to an explicit tower_cli.cfg file
    #[arg(long, global = true, env = "TOWER_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the controller version
    Ping,

    /// Send one request and print its status and JSON body
    Request(RequestArgs),

    /// Fetch every page of a list endpoint
    List(ListArgs),

    /// Resolve a resource name to its id
    Lookup(LookupArgs),

    /// Show the effective connection settings and the files they came from
    Config,

    /// Generate shell completions for the specified shell
    Completions(CompletionsArgs),
}

/// Arguments for the request command
#[derive(Parser, Debug)]
pub struct RequestArgs {
    /// HTTP method (GET, POST, PUT, PATCH, DELETE or HEAD)
    #[arg(value_name = "METHOD")]
    pub method: String,

    /// API endpoint, e.g. inventories/5 or /api/v2/hosts/?page=2
    #[arg(value_name = "ENDPOINT")]
    pub endpoint: String,

    /// JSON body for POST/PUT/PATCH, query parameters otherwise
    #[arg(short, long, value_name = "JSON")]
    pub data: Option<String>,

    /// Print nothing and succeed when the resource does not exist
    #[arg(long)]
    pub allow_missing: bool,
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// List endpoint, e.g. hosts or job_templates
    #[arg(value_name = "ENDPOINT")]
    pub endpoint: String,

    /// Filter as KEY=VALUE; may be repeated
    #[arg(short, long = "filter", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub filters: Vec<(String, String)>,
}

/// Arguments for the lookup command
#[derive(Parser, Debug)]
pub struct LookupArgs {
    /// Resource list endpoint, e.g. inventories or users
    #[arg(value_name = "RESOURCE")]
    pub resource: String,

    /// Name (username for users) or numeric id
    #[arg(value_name = "NAME_OR_ID")]
    pub name_or_id: String,
}

/// Arguments for generating shell completions
#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Output format options
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable formatted output
    Human,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
    /// Pretty-printed JSON output
    JsonPretty,
}

/// Supported shells for completion generation
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective verbosity level (considering quiet flag)
    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }

    /// Check if colored output should be used
    pub fn use_color(&self) -> bool {
        use is_terminal::IsTerminal;
        !self.no_color && std::io::stdout().is_terminal()
    }
}

impl ConnectionArgs {
    /// The flag layer as a config source
    pub fn overrides(&self) -> ConfigSource {
        ConfigSource {
            host: self.host.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            verify_ssl: self.verify_ssl,
            oauth_token: self.oauth_token.clone(),
        }
    }
}

impl Shell {
    /// Convert to clap_complete shell type
    pub fn to_clap_shell(self) -> clap_complete::Shell {
        match self {
            Shell::Bash => clap_complete::Shell::Bash,
            Shell::Zsh => clap_complete::Shell::Zsh,
            Shell::Fish => clap_complete::Shell::Fish,
            Shell::PowerShell => clap_complete::Shell::PowerShell,
            Shell::Elvish => clap_complete::Shell::Elvish,
        }
    }
}

fn parse_verify_ssl(value: &str) -> Result<bool, String> {
    parse_bool(value).ok_or_else(|| format!("'{}' is not a boolean", value))
}

fn parse_key_value(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((key, val)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), val.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", value)),
    }
}
