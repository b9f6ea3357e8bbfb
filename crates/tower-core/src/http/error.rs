//! Classification of HTTP outcomes
//!
//! Maps transport failures and status codes onto the connector's error
//! taxonomy. Nothing here retries; every failure goes straight back to the
//! caller.

use crate::error::{Error, RawResponse, Result};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io;

/// Normalized result of one HTTP call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestOutcome {
    pub status_code: u16,
    /// Parsed body; an empty body becomes an empty object
    pub json: Value,
}

impl RequestOutcome {
    pub fn new(status_code: u16, json: Value) -> Self {
        Self { status_code, json }
    }
}

impl Default for RequestOutcome {
    fn default() -> Self {
        Self {
            status_code: 200,
            json: Value::Object(Default::default()),
        }
    }
}

/// How a status code is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusClass {
    /// 2xx: body returned
    Success,
    /// 5xx
    ServerError,
    /// 401
    Unauthorized,
    /// 403
    Forbidden,
    /// 404
    NotFound,
    /// 405
    MethodNotAllowed,
    /// Any other 4xx: body returned to the caller without raising
    ClientError,
    /// 1xx and 3xx
    Unexpected,
}

impl StatusClass {
    pub fn of(status: StatusCode) -> Self {
        match status.as_u16() {
            200..=299 => StatusClass::Success,
            401 => StatusClass::Unauthorized,
            403 => StatusClass::Forbidden,
            404 => StatusClass::NotFound,
            405 => StatusClass::MethodNotAllowed,
            400..=499 => StatusClass::ClientError,
            500..=599 => StatusClass::ServerError,
            _ => StatusClass::Unexpected,
        }
    }
}

/// Map a transport error onto TLS or network failure
pub fn classify_transport_error(err: &reqwest::Error, host: &str) -> Error {
    let message = error_chain(err);
    if is_tls_failure(err) {
        Error::Tls {
            host: host.to_string(),
            message,
        }
    } else {
        Error::Network {
            host: host.to_string(),
            message,
        }
    }
}

/// Classify a received reply.
///
/// `Ok(None)` is only returned for a 404 when `return_none_on_404` is set.
pub fn classify_response(
    method: &Method,
    url: &url::Url,
    status: StatusCode,
    body: String,
    return_none_on_404: bool,
) -> Result<Option<RequestOutcome>> {
    let code = status.as_u16();
    let path = url.path().to_string();
    let raw = || Some(RawResponse::new(Some(code), body.clone()));

    match StatusClass::of(status) {
        StatusClass::Success => parse_body(code, &body).map(Some),
        StatusClass::ServerError => Err(Error::Server {
            path,
            status: code,
            response: raw(),
        }),
        StatusClass::Unauthorized => Err(Error::Authentication {
            path,
            response: raw(),
        }),
        StatusClass::Forbidden => Err(Error::Forbidden {
            method: method.to_string(),
            path,
            response: raw(),
        }),
        StatusClass::NotFound if return_none_on_404 => Ok(None),
        StatusClass::NotFound => Err(Error::NotFound {
            path,
            response: raw(),
        }),
        StatusClass::MethodNotAllowed => Err(Error::MethodNotAllowed {
            method: method.to_string(),
            path,
            response: raw(),
        }),
        StatusClass::ClientError => match serde_json::from_str::<Value>(&body) {
            Ok(json) => Ok(Some(RequestOutcome::new(code, json))),
            Err(e) => Err(Error::ResponseParse {
                message: format!("Received an unparsable {} error from the server: {}", code, e),
                response: raw(),
            }),
        },
        StatusClass::Unexpected => Err(Error::UnexpectedStatus {
            url: url.to_string(),
            status: code,
            response: raw(),
        }),
    }
}

fn parse_body(code: u16, body: &str) -> Result<RequestOutcome> {
    if body.trim().is_empty() {
        return Ok(RequestOutcome::new(code, Value::Object(Default::default())));
    }
    serde_json::from_str(body)
        .map(|json| RequestOutcome::new(code, json))
        .map_err(|e| Error::ResponseParse {
            message: e.to_string(),
            response: Some(RawResponse::new(Some(code), body)),
        })
}

/// Render an error and all of its sources on one line
pub(crate) fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

/// Only the causes are inspected; the top-level text carries the request URL.
fn is_tls_failure(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut source = err.source();
    while let Some(cause) = source {
        // rustls reports handshake and certificate failures as InvalidData
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            if io_err.kind() == io::ErrorKind::InvalidData {
                return true;
            }
        }
        if mentions_tls(&cause.to_string()) {
            return true;
        }
        source = cause.source();
    }
    false
}

fn mentions_tls(message: &str) -> bool {
    let lower = message.to_lowercase();
    ["certificate", "tls", "ssl", "handshake"]
        .iter()
        .any(|needle| lower.contains(needle))
}
