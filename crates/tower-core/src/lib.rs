//! Tower Core - connector for the Tower/AWX automation controller REST API
//!
//! # Main Components
//!
//! - **Config**: layered discovery of `tower_cli.cfg` files plus explicit settings
//! - **Authentication**: Basic credentials exchanged once for a bearer token
//! - **Requests**: endpoint normalization and classification of every outcome
//! - **Teardown**: best-effort revocation of the issued token
//!
//! # Example
//!
//! ```no_run
//! use tower_core::{ControllerClient, Result};
//!
//! fn example() -> Result<()> {
//!     let mut client = ControllerClient::builder()
//!         .host("tower.example.org")
//!         .username("admin")
//!         .password("secret")
//!         .build()?;
//!
//!     let inventory = client.get("inventories/5", None)?;
//!     println!("{}", inventory.json["name"]);
//!
//!     client.logout();
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod http;

// Re-export main types for convenience
pub use config::{ConfigResolver, ConfigSource, ConnectionSettings, ResolvedConfig};
pub use error::{Error, ErrorKind, RawResponse, Result};
pub use http::{
    ControllerClient, ControllerClientBuilder, Credential, Method, RequestOptions,
    RequestOutcome, TokenId, WarningHandler,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_version() {
        assert!(!VERSION.is_empty());
    }
}
