//! Config file parsing
//!
//! A config file is either a YAML/JSON mapping or an INI document whose
//! settings live under `[general]`. Parsers are tried in order and the first
//! one that yields a mapping wins.

use super::ConfigSource;
use std::collections::HashMap;
use std::fmt;

/// Section holding the recognized settings in INI files
pub const INI_SECTION: &str = "general";

/// One way of reading a config document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    /// YAML document (covers JSON) with a mapping at the top level
    Structured,
    /// INI document, `[general]` header synthesized when missing
    Ini,
}

/// Strategies in the order they are attempted
pub const PARSE_STRATEGIES: [ParseStrategy; 2] = [ParseStrategy::Structured, ParseStrategy::Ini];

/// Why a strategy rejected a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    /// Not valid YAML/JSON at all
    Syntax(String),
    /// Valid document but the top level is not a mapping
    NotAMapping,
    /// INI line that is neither a section, a comment nor a key/value pair
    InvalidLine { line: usize, content: String },
    /// A recognized key holds a value of the wrong type
    InvalidValue { key: String, message: String },
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseFailure::Syntax(msg) => write!(f, "{}", msg),
            ParseFailure::NotAMapping => write!(f, "top level of the document is not a mapping"),
            ParseFailure::InvalidLine { line, content } => {
                write!(f, "line {}: expected 'key = value', found '{}'", line, content)
            }
            ParseFailure::InvalidValue { key, message } => {
                write!(f, "invalid value for '{}': {}", key, message)
            }
        }
    }
}

impl std::error::Error for ParseFailure {}

impl ParseStrategy {
    /// Parse `content` with this strategy
    pub fn parse(&self, content: &str) -> Result<ConfigSource, ParseFailure> {
        match self {
            ParseStrategy::Structured => parse_structured(content),
            ParseStrategy::Ini => parse_ini(content),
        }
    }
}

/// Parse a config document, trying each strategy in turn.
///
/// On total failure the error of the last strategy is returned. A value
/// error found by the structured parser is final: the document was a
/// mapping, so reading it as INI would only hide the real problem.
pub fn parse_config(content: &str) -> Result<ConfigSource, ParseFailure> {
    let mut last_failure = ParseFailure::NotAMapping;
    for strategy in PARSE_STRATEGIES {
        match strategy.parse(content) {
            Ok(source) => return Ok(source),
            Err(failure @ ParseFailure::InvalidValue { .. }) => return Err(failure),
            Err(failure) => {
                tracing::trace!(?strategy, %failure, "Config parse strategy rejected document");
                last_failure = failure;
            }
        }
    }
    Err(last_failure)
}

/// Interpret a truthy/falsy string, case-insensitively
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" | "y" | "t" => Some(true),
        "false" | "no" | "off" | "0" | "n" | "f" => Some(false),
        _ => None,
    }
}

fn parse_structured(content: &str) -> Result<ConfigSource, ParseFailure> {
    let document: serde_yaml::Value =
        serde_yaml::from_str(content).map_err(|e| ParseFailure::Syntax(e.to_string()))?;

    let mapping = match document {
        serde_yaml::Value::Mapping(mapping) => mapping,
        _ => return Err(ParseFailure::NotAMapping),
    };

    let lookup = |key: &str| mapping.get(serde_yaml::Value::String(key.to_string()));

    Ok(ConfigSource {
        host: yaml_string(lookup("host")),
        username: yaml_string(lookup("username")),
        password: yaml_string(lookup("password")),
        verify_ssl: yaml_bool("verify_ssl", lookup("verify_ssl"))?,
        oauth_token: yaml_string(lookup("oauth_token")),
    })
}

fn yaml_string(value: Option<&serde_yaml::Value>) -> Option<String> {
    match value? {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn yaml_bool(key: &str, value: Option<&serde_yaml::Value>) -> Result<Option<bool>, ParseFailure> {
    let Some(value) = value else {
        return Ok(None);
    };
    match value {
        serde_yaml::Value::Bool(b) => Ok(Some(*b)),
        serde_yaml::Value::String(s) => {
            parse_bool(s).map(Some).ok_or_else(|| ParseFailure::InvalidValue {
                key: key.to_string(),
                message: format!("'{}' is not a boolean", s),
            })
        }
        serde_yaml::Value::Number(n) => Ok(Some(n.as_f64().map(|f| f != 0.0).unwrap_or(true))),
        serde_yaml::Value::Null => Ok(None),
        other => Err(ParseFailure::InvalidValue {
            key: key.to_string(),
            message: format!("expected a boolean, found {:?}", other),
        }),
    }
}

fn parse_ini(content: &str) -> Result<ConfigSource, ParseFailure> {
    let header = format!("[{}]", INI_SECTION);
    let document = if content.contains(&header) {
        content.to_string()
    } else {
        format!("{}\n{}", header, content)
    };

    let sections = read_ini_sections(&document)?;
    let general = sections.get(INI_SECTION).cloned().unwrap_or_default();

    let verify_ssl = match general.get("verify_ssl") {
        Some(raw) => Some(parse_bool(raw).ok_or_else(|| ParseFailure::InvalidValue {
            key: "verify_ssl".to_string(),
            message: format!("'{}' is not a boolean", raw),
        })?),
        None => None,
    };

    Ok(ConfigSource {
        host: general.get("host").cloned(),
        username: general.get("username").cloned(),
        password: general.get("password").cloned(),
        verify_ssl,
        oauth_token: general.get("oauth_token").cloned(),
    })
}

/// Read sections and their key/value pairs. Keys are lowercased; indented
/// lines continue the previous value.
fn read_ini_sections(
    document: &str,
) -> Result<HashMap<String, HashMap<String, String>>, ParseFailure> {
    let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
    let mut current: Option<String> = None;
    let mut last_key: Option<String> = None;

    for (index, raw_line) in document.lines().enumerate() {
        let line_number = index + 1;
        let trimmed = raw_line.trim();

        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            last_key = None;
            continue;
        }

        let indented = raw_line.starts_with(' ') || raw_line.starts_with('\t');
        if indented {
            if let (Some(section), Some(key)) = (&current, &last_key) {
                if let Some(value) = sections.get_mut(section).and_then(|s| s.get_mut(key)) {
                    value.push('\n');
                    value.push_str(trimmed);
                    continue;
                }
            }
        }

        if trimmed.starts_with('[') && trimmed.ends_with(']') && trimmed.len() > 2 {
            let name = trimmed[1..trimmed.len() - 1].trim().to_string();
            sections.entry(name.clone()).or_default();
            current = Some(name);
            last_key = None;
            continue;
        }

        let split_at = trimmed.find(|c| c == '=' || c == ':');
        let (Some(section), Some(pos)) = (&current, split_at) else {
            return Err(ParseFailure::InvalidLine {
                line: line_number,
                content: trimmed.to_string(),
            });
        };

        let key = trimmed[..pos].trim().to_lowercase();
        let value = trimmed[pos + 1..].trim().to_string();
        if key.is_empty() {
            return Err(ParseFailure::InvalidLine {
                line: line_number,
                content: trimmed.to_string(),
            });
        }

        sections
            .entry(section.clone())
            .or_default()
            .insert(key.clone(), value);
        last_key = Some(key);
    }

    Ok(sections)
}
