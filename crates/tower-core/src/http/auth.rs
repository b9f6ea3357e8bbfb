//! Token-based authentication against the controller
//!
//! Basic credentials are exchanged once for a bearer token, which is then
//! used for every request and revoked explicitly at teardown.

use crate::config::ConnectionSettings;
use crate::error::{Error, RawResponse, Result};
use crate::http::endpoint;
use crate::http::error::error_chain;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use url::Url;

/// Description attached to tokens this connector creates
pub const TOKEN_DESCRIPTION: &str = "Tower Connector Token";

/// Scope requested for issued tokens
pub const TOKEN_SCOPE: &str = "write";

/// The credential a request is sent with
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Anonymous access
    None,
    /// HTTP Basic username/password
    Basic { username: String, password: String },
    /// `Authorization: Bearer <token>`
    Bearer(String),
}

impl Credential {
    /// Pick the active credential; a token always supersedes Basic
    pub fn from_settings(settings: &ConnectionSettings) -> Self {
        if let Some(token) = &settings.oauth_token {
            return Credential::Bearer(token.clone());
        }
        match settings.basic_credentials() {
            Some((username, password)) => Credential::Basic {
                username: username.to_string(),
                password: password.to_string(),
            },
            None => Credential::None,
        }
    }

    /// Add the bearer header when this is a token credential
    pub fn apply_bearer(&self, headers: &mut HeaderMap) -> Result<()> {
        if let Credential::Bearer(token) = self {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| {
                    Error::config_with_source("OAuth token contains invalid characters", e)
                })?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(())
    }
}

// Secrets stay out of debug output and logs
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::None => write!(f, "None"),
            Credential::Basic { username, .. } => write!(f, "Basic({}:***)", username),
            Credential::Bearer(_) => write!(f, "Bearer(***)"),
        }
    }
}

/// Identifier of an issued token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenId(String);

impl TokenId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(Self(n.to_string())),
            Value::String(s) if !s.is_empty() => Some(Self(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body posted to the token endpoint
#[derive(Debug, Clone, Serialize)]
pub struct TokenRequest {
    pub description: String,
    pub application: Option<String>,
    pub scope: String,
}

impl Default for TokenRequest {
    fn default() -> Self {
        Self {
            description: TOKEN_DESCRIPTION.to_string(),
            application: None,
            scope: TOKEN_SCOPE.to_string(),
        }
    }
}

/// A token issued by the controller
#[derive(Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub id: TokenId,
    pub token: String,
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrant")
            .field("id", &self.id)
            .field("token", &"***")
            .finish()
    }
}

impl TokenGrant {
    /// Extract `id` and `token` from the token endpoint's reply
    pub fn from_response_body(body: &str) -> Result<Self> {
        let malformed = |message: String| Error::TokenIssuance {
            message: format!(
                "Failed to extract token information from login response: {}",
                message
            ),
            response: Some(RawResponse::new(None, body)),
        };

        let json: Value = serde_json::from_str(body).map_err(|e| malformed(e.to_string()))?;
        let id = json
            .get("id")
            .and_then(TokenId::from_json)
            .ok_or_else(|| malformed("missing 'id'".to_string()))?;
        let token = json
            .get("token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| malformed("missing 'token'".to_string()))?
            .to_string();

        Ok(Self { id, token })
    }
}

/// Exchange Basic credentials for a bearer token
pub fn issue_token(
    http: &Client,
    base: &Url,
    username: &str,
    password: &str,
) -> Result<TokenGrant> {
    let mut url = base.clone();
    url.set_path(&endpoint::tokens_path());
    url.set_query(None);

    let body = serde_json::to_string(&TokenRequest::default())?;
    tracing::debug!(url = %url, username, "Requesting token");

    let response = http
        .post(url.clone())
        .basic_auth(username, Some(password))
        .header(CONTENT_TYPE, "application/json")
        .body(body)
        .send()
        .map_err(|e| Error::TokenIssuance {
            message: error_chain(&e),
            response: None,
        })?;

    let status = response.status();
    let text = response.text().map_err(|e| Error::TokenIssuance {
        message: error_chain(&e),
        response: Some(RawResponse::new(Some(status.as_u16()), String::new())),
    })?;

    if !status.is_success() {
        return Err(Error::TokenIssuance {
            message: format!("HTTP {} from {}", status.as_u16(), url.path()),
            response: Some(RawResponse::new(Some(status.as_u16()), text)),
        });
    }

    let grant = TokenGrant::from_response_body(&text)?;
    tracing::info!(token_id = %grant.id, "Token issued");
    Ok(grant)
}

/// Delete an issued token using the Basic credentials that created it
pub fn revoke_token(
    http: &Client,
    base: &Url,
    username: &str,
    password: &str,
    token_id: &TokenId,
) -> Result<()> {
    let mut url = base.clone();
    url.set_path(&endpoint::token_path(token_id.as_str()));
    url.set_query(None);

    let teardown = |message: String, response: Option<RawResponse>| Error::Teardown {
        token_id: token_id.to_string(),
        message,
        response,
    };

    let response = http
        .delete(url)
        .basic_auth(username, Some(password))
        .send()
        .map_err(|e| teardown(error_chain(&e), None))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(teardown(
            format!("HTTP {}", status.as_u16()),
            Some(RawResponse::new(Some(status.as_u16()), body)),
        ));
    }

    tracing::info!(token_id = %token_id, "Token revoked");
    Ok(())
}
