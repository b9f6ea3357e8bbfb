//! Shared utilities for command handlers

use crate::cli::ConnectionArgs;
use crate::error::{Error, Result};
use crate::output::print_warning;
use serde_json::{Map, Value};
use std::sync::Arc;
use tower_core::{ConfigResolver, ControllerClient, WarningHandler};
use tracing::debug;

/// Handler printing library warnings to stderr
pub fn warning_printer(use_color: bool) -> WarningHandler {
    Arc::new(move |message: &str| print_warning(message, use_color))
}

/// Build a controller client from config files and connection flags
pub fn connect(args: &ConnectionArgs, use_color: bool) -> Result<ControllerClient> {
    connect_with(args, use_color, ConfigResolver::new())
}

/// Same as [`connect`], discovering config files through `resolver`
pub fn connect_with(
    args: &ConnectionArgs,
    use_color: bool,
    resolver: ConfigResolver,
) -> Result<ControllerClient> {
    let mut builder = ControllerClient::builder()
        .resolver(resolver)
        .overrides(args.overrides())
        .warning_handler(warning_printer(use_color));
    if let Some(path) = &args.config_file {
        builder = builder.config_file(path);
    }

    let client = builder.build()?;
    debug!(host = %client.settings().host, "Connected client created");
    Ok(client)
}

/// Parse the `--data` argument
pub fn parse_data(data: Option<&str>) -> Result<Option<Value>> {
    match data {
        Some(raw) if !raw.trim().is_empty() => Ok(Some(serde_json::from_str(raw)?)),
        _ => Ok(None),
    }
}

/// Turn `--filter` pairs into query data
pub fn filters_to_data(filters: &[(String, String)]) -> Option<Value> {
    if filters.is_empty() {
        return None;
    }
    let map: Map<String, Value> = filters
        .iter()
        .map(|(key, value)| (key.clone(), Value::String(value.clone())))
        .collect();
    Some(Value::Object(map))
}

/// Reject data that is not a JSON object for non-mutating requests
pub fn ensure_query_object(data: &Option<Value>) -> Result<()> {
    match data {
        Some(value) if !value.is_object() => Err(Error::invalid_args(
            "--data must be a JSON object when used as query parameters",
        )),
        _ => Ok(()),
    }
}
