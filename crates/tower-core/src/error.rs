//! Error types for the Tower connector
//!
//! Every failure the connector can surface maps to exactly one variant of
//! [`Error`]. Variants produced from an HTTP reply carry the raw reply as a
//! [`RawResponse`] so callers can show the server's own diagnostics.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Raw HTTP reply kept for diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawResponse {
    /// HTTP status code if one was received
    pub status: Option<u16>,
    /// Response body as text (may be empty)
    pub body: String,
}

impl RawResponse {
    pub fn new(status: Option<u16>, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

impl fmt::Display for RawResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {}: {}", status, self.body),
            None => write!(f, "{}", self.body),
        }
    }
}

/// Main error type for connector operations
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or unreadable config file, missing host, invalid option
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// DNS lookup for the configured host failed
    #[error("Unable to resolve host ({hostname}): {message}")]
    HostResolution { hostname: String, message: String },

    /// Certificate validation or TLS handshake failure
    #[error("Could not establish a secure connection to your host ({host}): {message}")]
    Tls { host: String, message: String },

    /// Any other transport-level failure
    #[error("There was a network error of some kind trying to connect to your host ({host}): {message}")]
    Network { host: String, message: String },

    /// 5xx reply
    #[error("The host sent back a server error ({path}): HTTP {status}. Please check the logs and try again later")]
    Server {
        path: String,
        status: u16,
        response: Option<RawResponse>,
    },

    /// 401 reply
    #[error("Invalid authentication credentials for {path} (HTTP 401)")]
    Authentication {
        path: String,
        response: Option<RawResponse>,
    },

    /// 403 reply
    #[error("You don't have permission to {method} to {path} (HTTP 403)")]
    Forbidden {
        method: String,
        path: String,
        response: Option<RawResponse>,
    },

    /// 404 reply
    #[error("The requested object could not be found at {path}")]
    NotFound {
        path: String,
        response: Option<RawResponse>,
    },

    /// 405 reply
    #[error("The server says you can't make a request with the {method} method to the endpoint {path} (HTTP 405)")]
    MethodNotAllowed {
        method: String,
        path: String,
        response: Option<RawResponse>,
    },

    /// Status code outside every other category
    #[error("Unexpected return code when calling {url}: {status}")]
    UnexpectedStatus {
        url: String,
        status: u16,
        response: Option<RawResponse>,
    },

    /// The response body could not be read
    #[error("Failed to read response body: {message}")]
    ResponseRead {
        message: String,
        response: Option<RawResponse>,
    },

    /// The response body was not valid JSON
    #[error("Failed to parse the response json: {message}")]
    ResponseParse {
        message: String,
        response: Option<RawResponse>,
    },

    /// Exchanging Basic credentials for a bearer token failed
    #[error("Failed to get token: {message}")]
    TokenIssuance {
        message: String,
        response: Option<RawResponse>,
    },

    /// Revoking an issued token failed; reported through warnings only
    #[error("Failed to release token {token_id}: {message}")]
    Teardown {
        token_id: String,
        message: String,
        response: Option<RawResponse>,
    },

    /// A well-formed reply whose content does not fit the expected shape
    #[error("Unexpected response: {message}")]
    UnexpectedResponse { message: String },

    /// Lookup by name or id found nothing usable
    #[error("Lookup failed: {message}")]
    Lookup { message: String },

    /// JSON serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse category of an [`Error`], used for reporting and exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Configuration,
    HostResolution,
    Tls,
    Network,
    Server,
    Authentication,
    Authorization,
    NotFound,
    MethodNotAllowed,
    Protocol,
    Parse,
    Teardown,
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::HostResolution => "host-resolution",
            ErrorKind::Tls => "tls",
            ErrorKind::Network => "network",
            ErrorKind::Server => "server",
            ErrorKind::Authentication => "authentication",
            ErrorKind::Authorization => "authorization",
            ErrorKind::NotFound => "not-found",
            ErrorKind::MethodNotAllowed => "method-not-allowed",
            ErrorKind::Protocol => "protocol",
            ErrorKind::Parse => "parse",
            ErrorKind::Teardown => "teardown",
            ErrorKind::Io => "io",
        };
        f.write_str(name)
    }
}

impl Error {
    /// Create a configuration error without an underlying cause
    pub fn config(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
            source: None,
        }
    }

    /// Create a configuration error wrapping its cause
    pub fn config_with_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Configuration {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// The category this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Configuration { .. } => ErrorKind::Configuration,
            Error::HostResolution { .. } => ErrorKind::HostResolution,
            Error::Tls { .. } => ErrorKind::Tls,
            Error::Network { .. } => ErrorKind::Network,
            Error::Server { .. } => ErrorKind::Server,
            Error::Authentication { .. } | Error::TokenIssuance { .. } => ErrorKind::Authentication,
            Error::Forbidden { .. } => ErrorKind::Authorization,
            Error::NotFound { .. } | Error::Lookup { .. } => ErrorKind::NotFound,
            Error::MethodNotAllowed { .. } => ErrorKind::MethodNotAllowed,
            Error::UnexpectedStatus { .. } | Error::UnexpectedResponse { .. } => {
                ErrorKind::Protocol
            }
            Error::ResponseRead { .. } | Error::ResponseParse { .. } | Error::Json { .. } => {
                ErrorKind::Parse
            }
            Error::Teardown { .. } => ErrorKind::Teardown,
            Error::Io { .. } => ErrorKind::Io,
        }
    }

    /// Raw HTTP reply attached to this error, if any
    pub fn response(&self) -> Option<&RawResponse> {
        match self {
            Error::Server { response, .. }
            | Error::Authentication { response, .. }
            | Error::Forbidden { response, .. }
            | Error::NotFound { response, .. }
            | Error::MethodNotAllowed { response, .. }
            | Error::UnexpectedStatus { response, .. }
            | Error::ResponseRead { response, .. }
            | Error::ResponseParse { response, .. }
            | Error::TokenIssuance { response, .. }
            | Error::Teardown { response, .. } => response.as_ref(),
            _ => None,
        }
    }

    /// HTTP status code of the reply behind this error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Server { status, .. } | Error::UnexpectedStatus { status, .. } => Some(*status),
            _ => self.response().and_then(|r| r.status),
        }
    }
}

// Conversion implementations
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io {
            message: err.to_string(),
            source: err,
        }
    }
}
