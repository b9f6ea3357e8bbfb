//! HTTP side of the connector
//!
//! - Endpoint normalization under `/api/v2/`
//! - Token issuance and revocation with Basic credentials
//! - Request execution with bearer authentication
//! - Classification of every outcome into the error taxonomy

pub mod auth;
pub mod client;
pub mod endpoint;
pub mod error;

pub use auth::{Credential, TokenGrant, TokenId, TokenRequest};
pub use client::{
    parse_method, ControllerClient, ControllerClientBuilder, RequestOptions, WarningHandler,
};
pub use endpoint::normalize_endpoint;
pub use error::{RequestOutcome, StatusClass};

// Re-export commonly used types
pub use reqwest::{Method, StatusCode};
