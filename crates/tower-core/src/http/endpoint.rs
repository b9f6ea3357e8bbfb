//! Endpoint path normalization

/// Prefix every API path starts with
pub const API_PREFIX: &str = "/api/";

/// API version used for paths given without a prefix
pub const DEFAULT_API_VERSION: &str = "v2";

/// Token issuance endpoint
pub fn tokens_path() -> String {
    format!("{}{}/tokens/", API_PREFIX, DEFAULT_API_VERSION)
}

/// Endpoint of one issued token
pub fn token_path(token_id: &str) -> String {
    format!("{}{}/", tokens_path(), token_id)
}

/// Turn a caller-supplied endpoint into a full API path.
///
/// Ensures a leading `/`, prepends `/api/v2` unless the path is already under
/// `/api/`, and appends a trailing `/` unless the path carries a query.
pub fn normalize_endpoint(endpoint: &str) -> String {
    let mut path = if endpoint.starts_with('/') {
        endpoint.to_string()
    } else {
        format!("/{}", endpoint)
    };

    if !path.starts_with(API_PREFIX) {
        path = format!("{}{}{}", API_PREFIX, DEFAULT_API_VERSION, path);
    }

    if !path.ends_with('/') && !path.contains('?') {
        path.push('/');
    }

    path
}

/// Split a normalized endpoint into its path and optional query
pub fn split_query(endpoint: &str) -> (&str, Option<&str>) {
    match endpoint.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (endpoint, None),
    }
}
