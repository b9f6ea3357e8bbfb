//! Configuration command handler

use crate::cli::{ConnectionArgs, OutputFormat};
use crate::error::Result;
use crate::handlers::utils::warning_printer;
use crate::output::OutputWriter;
use serde::Serialize;
use tower_core::config::normalize_host;
use tower_core::{ConfigResolver, ResolvedConfig};

const REDACTED: &str = "********";

/// Effective settings as shown to the user; secrets are masked
#[derive(Debug, Serialize, PartialEq)]
struct EffectiveConfig {
    host: Option<String>,
    username: Option<String>,
    password: Option<&'static str>,
    verify_ssl: bool,
    oauth_token: Option<&'static str>,
    files: Vec<String>,
}

impl EffectiveConfig {
    fn from_resolved(resolved: ResolvedConfig) -> Self {
        let source = resolved.source;
        Self {
            host: source.host.as_deref().map(normalize_host),
            username: source.username,
            password: source.password.map(|_| REDACTED),
            verify_ssl: source.verify_ssl.unwrap_or(true),
            oauth_token: source.oauth_token.map(|_| REDACTED),
            files: resolved
                .loaded_files
                .iter()
                .map(|path| path.display().to_string())
                .collect(),
        }
    }
}

/// Handle the config command
pub fn handle_config(
    args: &ConnectionArgs,
    use_color: bool,
    output: &mut OutputWriter,
) -> Result<()> {
    let warn = warning_printer(use_color);
    let resolved = ConfigResolver::new().resolve(
        args.config_file.as_deref(),
        &args.overrides(),
        &|message: &str| warn(message),
    )?;
    let effective = EffectiveConfig::from_resolved(resolved);

    if output.format() != OutputFormat::Human {
        return output.data(&effective);
    }

    output.section("Settings")?;
    let host = effective.host.as_deref().unwrap_or("(not set)");
    let username = effective.username.as_deref().unwrap_or("(not set)");
    output.writeln(&format!("host:        {}", host))?;
    output.writeln(&format!("username:    {}", username))?;
    output.writeln(&format!("password:    {}", effective.password.unwrap_or("(not set)")))?;
    output.writeln(&format!("verify_ssl:  {}", effective.verify_ssl))?;
    output.writeln(&format!("oauth_token: {}", effective.oauth_token.unwrap_or("(not set)")))?;

    output.section("Files")?;
    if effective.files.is_empty() {
        output.writeln("(none)")?;
    }
    for file in &effective.files {
        output.writeln(file)?;
    }
    Ok(())
}
