//! Controller client
//!
//! Owns one blocking HTTP client (and its cookie store), the resolved
//! connection settings and the authentication state of a session.

use crate::config::{resolve_hostname, ConfigResolver, ConfigSource, ConnectionSettings};
use crate::error::{Error, RawResponse, Result};
use crate::http::auth::{self, Credential, TokenId};
use crate::http::endpoint::{normalize_endpoint, split_query};
use crate::http::error::{classify_response, classify_transport_error, error_chain, RequestOutcome};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};
use url::{Position, Url};

/// Callback receiving non-fatal diagnostics
pub type WarningHandler = Arc<dyn Fn(&str) + Send + Sync>;

const JSON_CONTENT_TYPE: &str = "application/json";

/// Per-request options
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// JSON body for POST/PUT/PATCH, query parameters otherwise
    pub data: Option<Value>,
    /// Extra headers
    pub headers: HeaderMap,
    /// Return `Ok(None)` instead of an error on 404
    pub return_none_on_404: bool,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Tolerate a missing resource
    pub fn allow_missing(mut self) -> Self {
        self.return_none_on_404 = true;
        self
    }
}

/// Builder collecting the connector's constructor options
#[derive(Default)]
pub struct ControllerClientBuilder {
    overrides: ConfigSource,
    config_file: Option<PathBuf>,
    warning_handler: Option<WarningHandler>,
    resolver: Option<ConfigResolver>,
}

impl ControllerClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.overrides.host = Some(host.into());
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.overrides.username = Some(username.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.overrides.password = Some(password.into());
        self
    }

    pub fn verify_ssl(mut self, verify: bool) -> Self {
        self.overrides.verify_ssl = Some(verify);
        self
    }

    pub fn oauth_token(mut self, token: impl Into<String>) -> Self {
        self.overrides.oauth_token = Some(token.into());
        self
    }

    /// Explicit config file; errors reading it are fatal
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Apply a whole layer of explicit settings at once
    pub fn overrides(mut self, overrides: ConfigSource) -> Self {
        self.overrides.merge(overrides);
        self
    }

    pub fn warning_handler(mut self, handler: WarningHandler) -> Self {
        self.warning_handler = Some(handler);
        self
    }

    /// Replace the default config file discovery
    pub fn resolver(mut self, resolver: ConfigResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn build(self) -> Result<ControllerClient> {
        ControllerClient::new(self)
    }
}

/// Connector to a Tower/AWX controller.
///
/// Not meant to be shared between threads; use one instance per thread.
pub struct ControllerClient {
    settings: ConnectionSettings,
    url: Url,
    http: HttpClient,
    authenticated: bool,
    oauth_token_id: Option<TokenId>,
    warning_handler: Option<WarningHandler>,
    loaded_files: Vec<PathBuf>,
}

impl fmt::Debug for ControllerClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerClient")
            .field("host", &self.settings.host)
            .field("verify_ssl", &self.settings.verify_ssl)
            .field("authenticated", &self.authenticated)
            .field("oauth_token_id", &self.oauth_token_id)
            .finish()
    }
}

impl ControllerClient {
    pub fn builder() -> ControllerClientBuilder {
        ControllerClientBuilder::new()
    }

    /// Resolve configuration, validate the host and create the HTTP client
    pub fn new(options: ControllerClientBuilder) -> Result<Self> {
        let ControllerClientBuilder {
            overrides,
            config_file,
            warning_handler,
            resolver,
        } = options;

        let resolver = resolver.unwrap_or_default();
        let warn_sink = |message: &str| emit_warning(warning_handler.as_ref(), message);
        let resolved = resolver.resolve(config_file.as_deref(), &overrides, &warn_sink)?;

        let settings = ConnectionSettings::from_source(resolved.source)?;
        let url = settings.base_url()?;
        resolve_hostname(&url)?;

        let http = HttpClient::builder()
            .cookie_store(true)
            .danger_accept_invalid_certs(!settings.verify_ssl)
            .build()
            .map_err(|e| Error::config_with_source("Failed to create HTTP client", e))?;

        debug!(
            host = %settings.host,
            verify_ssl = settings.verify_ssl,
            files = resolved.loaded_files.len(),
            "Controller client configured"
        );

        Ok(Self {
            settings,
            url,
            http,
            authenticated: false,
            oauth_token_id: None,
            warning_handler,
            loaded_files: resolved.loaded_files,
        })
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    /// URL template; its query is empty between requests
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Config files that contributed to the settings
    pub fn loaded_files(&self) -> &[PathBuf] {
        &self.loaded_files
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn oauth_token_id(&self) -> Option<&TokenId> {
        self.oauth_token_id.as_ref()
    }

    /// Obtain a bearer token if Basic credentials are configured.
    ///
    /// Runs at most once; without credentials the session continues
    /// anonymously.
    pub fn authenticate(&mut self) -> Result<()> {
        if self.authenticated {
            return Ok(());
        }

        let credentials = self
            .settings
            .basic_credentials()
            .map(|(user, pass)| (user.to_string(), pass.to_string()));
        if let Some((username, password)) = credentials {
            let grant = auth::issue_token(&self.http, &self.url, &username, &password)?;
            self.oauth_token_id = Some(grant.id);
            self.settings.oauth_token = Some(grant.token);
        } else {
            debug!("No credentials configured, continuing without authentication");
        }

        self.authenticated = true;
        Ok(())
    }

    /// Perform one request and classify its outcome.
    ///
    /// Returns `Ok(None)` only for a 404 with
    /// [`RequestOptions::return_none_on_404`] set.
    pub fn request(
        &mut self,
        method: Method,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<Option<RequestOutcome>> {
        let endpoint = normalize_endpoint(endpoint);
        let RequestOptions {
            data,
            mut headers,
            return_none_on_404,
        } = options;

        if self.settings.oauth_token.is_none() && !self.authenticated {
            self.authenticate()?;
        }
        Credential::from_settings(&self.settings).apply_bearer(&mut headers)?;

        let mut body = None;
        let mut query_data = None;
        if is_mutating(&method) {
            let content_type = headers
                .entry(CONTENT_TYPE)
                .or_insert(HeaderValue::from_static(JSON_CONTENT_TYPE));
            if content_type.as_bytes() == JSON_CONTENT_TYPE.as_bytes() {
                body = Some(serde_json::to_string(
                    &data.unwrap_or_else(|| Value::Object(Default::default())),
                )?);
            }
        } else if let Some(data) = data {
            query_data = Some(query_pairs(&data)?);
        }

        let (path, query) = split_query(&endpoint);
        self.url.set_path(path);
        self.url.set_query(query);
        if let Some(pairs) = query_data {
            self.url.query_pairs_mut().extend_pairs(pairs);
        }

        let result = self.dispatch(&method, headers, body, return_none_on_404);
        self.url.set_query(None);
        result
    }

    fn dispatch(
        &self,
        method: &Method,
        headers: HeaderMap,
        body: Option<String>,
        return_none_on_404: bool,
    ) -> Result<Option<RequestOutcome>> {
        debug!(method = %method, url = %self.url, "Sending request");

        let mut request = self
            .http
            .request(method.clone(), self.url.clone())
            .headers(headers);
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request
            .send()
            .map_err(|e| classify_transport_error(&e, self.netloc()))?;
        let status = response.status();
        let text = response.text().map_err(|e| Error::ResponseRead {
            message: error_chain(&e),
            response: Some(RawResponse::new(Some(status.as_u16()), String::new())),
        })?;

        debug!(
            method = %method,
            path = self.url.path(),
            status = status.as_u16(),
            "Received response"
        );
        classify_response(method, &self.url, status, text, return_none_on_404)
    }

    pub fn get(&mut self, endpoint: &str, data: Option<Value>) -> Result<RequestOutcome> {
        self.simple(Method::GET, endpoint, data)
    }

    pub fn post(&mut self, endpoint: &str, data: Option<Value>) -> Result<RequestOutcome> {
        self.simple(Method::POST, endpoint, data)
    }

    pub fn put(&mut self, endpoint: &str, data: Option<Value>) -> Result<RequestOutcome> {
        self.simple(Method::PUT, endpoint, data)
    }

    pub fn patch(&mut self, endpoint: &str, data: Option<Value>) -> Result<RequestOutcome> {
        self.simple(Method::PATCH, endpoint, data)
    }

    pub fn delete(&mut self, endpoint: &str) -> Result<RequestOutcome> {
        self.simple(Method::DELETE, endpoint, None)
    }

    /// HEAD request; `Ok(false)` when the resource does not exist
    pub fn exists(&mut self, endpoint: &str) -> Result<bool> {
        let outcome = self.request(Method::HEAD, endpoint, RequestOptions::new().allow_missing())?;
        Ok(outcome.is_some())
    }

    fn simple(
        &mut self,
        method: Method,
        endpoint: &str,
        data: Option<Value>,
    ) -> Result<RequestOutcome> {
        let options = RequestOptions {
            data,
            ..Default::default()
        };
        // Without 404 tolerance a missing resource is already an error
        self.request(method, endpoint, options)?.ok_or_else(|| Error::NotFound {
            path: normalize_endpoint(endpoint),
            response: None,
        })
    }

    /// Revoke the issued token, best effort.
    ///
    /// Failures are reported through the warning handler and never returned.
    pub fn logout(&mut self) {
        if !self.authenticated {
            return;
        }
        let Some(token_id) = self.oauth_token_id.clone() else {
            return;
        };

        let (username, password) = self
            .settings
            .basic_credentials()
            .map(|(user, pass)| (user.to_string(), pass.to_string()))
            .unwrap_or_default();
        self.url.set_query(None);

        match auth::revoke_token(&self.http, &self.url, &username, &password, &token_id) {
            Ok(()) => {
                self.oauth_token_id = None;
                self.settings.oauth_token = None;
                self.authenticated = false;
            }
            Err(err) => self.warn(&err.to_string()),
        }
    }

    fn warn(&self, message: &str) {
        emit_warning(self.warning_handler.as_ref(), message);
    }

    fn netloc(&self) -> &str {
        &self.url[Position::BeforeHost..Position::AfterPort]
    }
}

/// Parse a method name; only the verbs the controller API uses are accepted
pub fn parse_method(name: &str) -> Result<Method> {
    let upper = name.trim().to_ascii_uppercase();
    match upper.as_str() {
        "" => Err(Error::config("An HTTP method must be provided")),
        "GET" => Ok(Method::GET),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "PATCH" => Ok(Method::PATCH),
        "DELETE" => Ok(Method::DELETE),
        "HEAD" => Ok(Method::HEAD),
        _ => Err(Error::config(format!("Unsupported HTTP method: {}", name))),
    }
}

fn emit_warning(handler: Option<&WarningHandler>, message: &str) {
    warn!("{}", message);
    if let Some(handler) = handler {
        handler(message);
    }
}

fn is_mutating(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

/// Flatten a JSON object into query parameters
fn query_pairs(data: &Value) -> Result<Vec<(String, String)>> {
    let object = data
        .as_object()
        .ok_or_else(|| Error::config("Query data must be a JSON object"))?;

    Ok(object
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (key.clone(), value)
        })
        .collect())
}
