//! Handlers for commands that talk to the controller

use crate::cli::{ListArgs, LookupArgs, OutputFormat, RequestArgs};
use crate::error::Result;
use crate::handlers::utils::{ensure_query_object, filters_to_data, parse_data};
use crate::output::OutputWriter;
use serde_json::json;
use tower_core::http::parse_method;
use tower_core::{ControllerClient, Method, RequestOptions};
use tracing::{info, instrument};

/// Handle the ping command
pub fn handle_ping(client: &mut ControllerClient, output: &mut OutputWriter) -> Result<()> {
    let version = client.ping()?;
    info!(version = %version, "Controller answered ping");

    if output.format() == OutputFormat::Human {
        output.success(&format!("{} is running version {}", client.settings().host, version))
    } else {
        output.data(&json!({ "host": client.settings().host, "version": version }))
    }
}

/// Handle the request command
#[instrument(skip_all, fields(method = %args.method, endpoint = %args.endpoint))]
pub fn handle_request(
    args: RequestArgs,
    client: &mut ControllerClient,
    output: &mut OutputWriter,
) -> Result<()> {
    let method = parse_method(&args.method)?;
    let data = parse_data(args.data.as_deref())?;
    if !matches!(method, Method::POST | Method::PUT | Method::PATCH) {
        ensure_query_object(&data)?;
    }

    let mut options = RequestOptions::new();
    options.data = data;
    if args.allow_missing {
        options = options.allow_missing();
    }

    match client.request(method, &args.endpoint, options)? {
        Some(outcome) => output.outcome(&outcome),
        None => {
            info!("Resource not found, nothing to print");
            Ok(())
        }
    }
}

/// Handle the list command
#[instrument(skip_all, fields(endpoint = %args.endpoint))]
pub fn handle_list(
    args: ListArgs,
    client: &mut ControllerClient,
    output: &mut OutputWriter,
) -> Result<()> {
    let listing = client.get_all(&args.endpoint, filters_to_data(&args.filters))?;
    let results = listing.get("results").cloned().unwrap_or_else(|| json!([]));
    let count = results.as_array().map_or(0, Vec::len);
    info!(count, "Fetched list");

    output.info(&format!("{} item(s) from {}", count, args.endpoint))?;
    output.data(&results)
}

/// Handle the lookup command
pub fn handle_lookup(
    args: LookupArgs,
    client: &mut ControllerClient,
    output: &mut OutputWriter,
) -> Result<()> {
    let id = client.resolve_name_to_id(&args.resource, &args.name_or_id)?;

    if output.format() == OutputFormat::Human {
        output.writeln(&id.to_string())
    } else {
        output.data(&json!({
            "resource": args.resource,
            "name_or_id": args.name_or_id,
            "id": id,
        }))
    }
}
