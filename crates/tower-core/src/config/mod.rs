//! Connection configuration
//!
//! Settings are layered from several config files, lowest precedence first:
//! - the system-wide file (`/etc/tower/tower_cli.cfg`)
//! - the per-user file (`~/.tower_cli.cfg`)
//! - `tower_cli.cfg` in every directory from the filesystem root down to the
//!   working directory (closer directories win)
//! - an explicitly named file
//!
//! Explicit settings given to the connector override every file.

pub mod parser;

pub use parser::{parse_bool, parse_config, ParseFailure, ParseStrategy};

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::ToSocketAddrs;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::{Host, Url};

/// Basename of discovered config files
pub const CONFIG_NAME: &str = "tower_cli.cfg";

/// System-wide config file
pub const SYSTEM_CONFIG_PATH: &str = "/etc/tower/tower_cli.cfg";

/// Keys read from config files; everything else is ignored
pub const RECOGNIZED_KEYS: [&str; 5] =
    ["host", "username", "password", "verify_ssl", "oauth_token"];

/// Settings from one config layer. `None` means "not set by this layer".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSource {
    pub host: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub verify_ssl: Option<bool>,
    pub oauth_token: Option<String>,
}

impl ConfigSource {
    /// Overlay `other` on top of `self`, key by key
    pub fn merge(&mut self, other: ConfigSource) {
        if other.host.is_some() {
            self.host = other.host;
        }
        if other.username.is_some() {
            self.username = other.username;
        }
        if other.password.is_some() {
            self.password = other.password;
        }
        if other.verify_ssl.is_some() {
            self.verify_ssl = other.verify_ssl;
        }
        if other.oauth_token.is_some() {
            self.oauth_token = other.oauth_token;
        }
    }

    /// Names of the keys this layer sets
    pub fn present_keys(&self) -> Vec<&'static str> {
        let present = [
            self.host.is_some(),
            self.username.is_some(),
            self.password.is_some(),
            self.verify_ssl.is_some(),
            self.oauth_token.is_some(),
        ];
        RECOGNIZED_KEYS
            .iter()
            .zip(present)
            .filter_map(|(key, set)| set.then_some(*key))
            .collect()
    }

    /// Keys set both here and in `other`
    pub fn shared_keys(&self, other: &ConfigSource) -> Vec<&'static str> {
        let theirs = other.present_keys();
        self.present_keys()
            .into_iter()
            .filter(|key| theirs.contains(key))
            .collect()
    }

    /// Read and parse one config file.
    ///
    /// Fails if the path is not a regular file or cannot be read.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::config(format!(
                "The specified config file does not exist: {}",
                path.display()
            )));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            Error::config_with_source(
                format!("The specified config file cannot be read: {}", path.display()),
                e,
            )
        })?;

        parse_config(&content).map_err(|failure| {
            Error::config_with_source(
                format!("The config file {} is not properly formatted", path.display()),
                failure,
            )
        })
    }
}

/// Effective connection settings after all layers are applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionSettings {
    /// Controller base address, always with an explicit scheme
    pub host: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub verify_ssl: bool,
    pub oauth_token: Option<String>,
}

impl ConnectionSettings {
    /// Validate a merged layer and normalize its host.
    ///
    /// Does not touch the network; see [`resolve_hostname`].
    pub fn from_source(source: ConfigSource) -> Result<Self> {
        let host = source
            .host
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::config("A host must be defined"))?;

        Ok(Self {
            host: normalize_host(&host),
            username: source.username,
            password: source.password,
            verify_ssl: source.verify_ssl.unwrap_or(true),
            // A blank token is no token; Basic credentials still apply
            oauth_token: source.oauth_token.filter(|t| !t.trim().is_empty()),
        })
    }

    /// Username and password, when both are set
    pub fn basic_credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => {
                Some((user.as_str(), pass.as_str()))
            }
            _ => None,
        }
    }

    /// Parse the host into a URL
    pub fn base_url(&self) -> Result<Url> {
        Url::parse(&self.host).map_err(|e| {
            Error::config_with_source(format!("Unable to parse host as a URL: {}", self.host), e)
        })
    }
}

/// Prefix `https://` unless the host already names http or https
pub fn normalize_host(host: &str) -> String {
    let lower = host.to_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

/// Resolve the URL's host name so an unknown host fails early.
///
/// The resolved addresses are discarded. IP literals are accepted as-is.
pub fn resolve_hostname(url: &Url) -> Result<()> {
    match url.host() {
        Some(Host::Domain(domain)) => {
            let port = url.port_or_known_default().unwrap_or(443);
            let mut addrs = (domain, port).to_socket_addrs().map_err(|e| Error::HostResolution {
                hostname: domain.to_string(),
                message: e.to_string(),
            })?;
            if addrs.next().is_none() {
                return Err(Error::HostResolution {
                    hostname: domain.to_string(),
                    message: "no addresses found".to_string(),
                });
            }
            debug!(hostname = domain, "Host name resolved");
            Ok(())
        }
        Some(_) => Ok(()),
        None => Err(Error::HostResolution {
            hostname: url.to_string(),
            message: "URL has no host".to_string(),
        }),
    }
}

/// Outcome of layering every config source
#[derive(Debug, Clone, Default)]
pub struct ResolvedConfig {
    /// Merged settings, explicit overrides included
    pub source: ConfigSource,
    /// Files that contributed, in the order they were applied
    pub loaded_files: Vec<PathBuf>,
}

/// Discovers and layers config files
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    system_path: Option<PathBuf>,
    home_dir: Option<PathBuf>,
    working_dir: Option<PathBuf>,
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigResolver {
    /// Resolver using the real system file, home and working directory
    pub fn new() -> Self {
        Self {
            system_path: Some(PathBuf::from(SYSTEM_CONFIG_PATH)),
            home_dir: dirs::home_dir(),
            working_dir: std::env::current_dir().ok(),
        }
    }

    /// Resolver that discovers nothing; only explicit files and settings apply
    pub fn isolated() -> Self {
        Self {
            system_path: None,
            home_dir: None,
            working_dir: None,
        }
    }

    pub fn with_system_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.system_path = Some(path.into());
        self
    }

    pub fn with_home_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.home_dir = Some(dir.into());
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Candidate files, lowest precedence first
    pub fn candidate_paths(&self) -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Some(system) = &self.system_path {
            paths.push(system.clone());
        }
        if let Some(home) = &self.home_dir {
            paths.push(home.join(format!(".{}", CONFIG_NAME)));
        }
        if let Some(cwd) = &self.working_dir {
            // ancestors() yields cwd first; reverse so the root comes first
            let mut dirs: Vec<&Path> = cwd.ancestors().collect();
            dirs.reverse();
            for dir in dirs {
                paths.push(dir.join(format!(".{}", CONFIG_NAME)));
                paths.push(dir.join(CONFIG_NAME));
            }
        }

        paths
    }

    /// Layer every discovered file, then `explicit_file`, then `overrides`.
    ///
    /// Missing discovered files and directories are skipped. An explicit file
    /// must exist. Keys set both in the explicit file and in `overrides` are
    /// reported through `warn`.
    pub fn resolve(
        &self,
        explicit_file: Option<&Path>,
        overrides: &ConfigSource,
        warn: &dyn Fn(&str),
    ) -> Result<ResolvedConfig> {
        let mut resolved = ResolvedConfig::default();

        for path in self.candidate_paths() {
            if !path.exists() || path.is_dir() {
                continue;
            }
            let layer = ConfigSource::from_file(&path)?;
            debug!(path = %path.display(), keys = ?layer.present_keys(), "Loaded config file");
            resolved.source.merge(layer);
            resolved.loaded_files.push(path);
        }

        if let Some(path) = explicit_file {
            let layer = ConfigSource::from_file(path)?;
            debug!(
                path = %path.display(),
                keys = ?layer.present_keys(),
                "Loaded explicit config file"
            );

            let duplicated = layer.shared_keys(overrides);
            if !duplicated.is_empty() {
                warn(&format!(
                    "The parameter(s) {} were found in the specified config file {} but their values were also set as parameters. The parameter will take precedence.",
                    duplicated.join(", "),
                    path.display()
                ));
            }

            resolved.source.merge(layer);
            resolved.loaded_files.push(path.to_path_buf());
        }

        resolved.source.merge(overrides.clone());
        Ok(resolved)
    }
}
