//! Command handlers for CLI subcommands
//!
//! Commands that talk to the controller share one connected client; the
//! caller is responsible for logging it out afterwards.

mod completions;
mod config;
mod controller;
mod utils;

pub use completions::handle_completions;
pub use config::handle_config;
pub use controller::{handle_list, handle_lookup, handle_ping, handle_request};
pub use utils::connect;
