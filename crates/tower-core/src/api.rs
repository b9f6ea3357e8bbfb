//! Resource helpers built on top of [`ControllerClient`]

use crate::error::{Error, Result};
use crate::http::ControllerClient;
use serde_json::{json, Value};
use url::Url;

/// Largest list `get_all` is willing to page through
pub const MAX_LIST_ITEMS: u64 = 10_000;

/// Job statuses that mean the job has not finished yet
pub const ACTIVE_JOB_STATUSES: [&str; 4] = ["new", "pending", "waiting", "running"];

/// Whether a job in `status` has finished
pub fn is_job_done(status: &str) -> bool {
    !ACTIVE_JOB_STATUSES.contains(&status)
}

/// List endpoint for a module parameter name
pub fn param_to_endpoint(name: &str) -> String {
    match name {
        "inventory" => "inventories".to_string(),
        "target_team" => "teams".to_string(),
        "workflow" => "workflow_job_templates".to_string(),
        other => format!("{}s", other),
    }
}

impl ControllerClient {
    /// Server version reported by `/ping/`
    pub fn ping(&mut self) -> Result<String> {
        let outcome = self.get("ping", None)?;
        outcome
            .json
            .get("version")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| Error::UnexpectedResponse {
                message: format!("ping response has no version: {}", outcome.json),
            })
    }

    /// GET a list endpoint and follow `next` links, concatenating `results`
    pub fn get_all(&mut self, endpoint: &str, data: Option<Value>) -> Result<Value> {
        let mut outcome = self.get(endpoint, data)?;

        let Some(next) = outcome.json.get("next") else {
            return Err(Error::UnexpectedResponse {
                message: format!("Expected list from API at {}, got: {}", endpoint, outcome.json),
            });
        };
        let mut next_page = next.as_str().map(String::from);

        let count = outcome.json.get("count").and_then(Value::as_u64).unwrap_or(0);
        if count > MAX_LIST_ITEMS {
            return Err(Error::UnexpectedResponse {
                message: format!(
                    "The number of items being queried for ({}) is higher than {}",
                    count, MAX_LIST_ITEMS
                ),
            });
        }

        let mut results = take_results(&mut outcome.json);
        while let Some(page) = next_page {
            let mut page_outcome = self.get(&page_endpoint(&page), None)?;
            results.extend(take_results(&mut page_outcome.json));
            next_page = page_outcome
                .json
                .get("next")
                .and_then(Value::as_str)
                .map(String::from);
        }

        outcome.json["results"] = Value::Array(results);
        outcome.json["next"] = Value::Null;
        Ok(outcome.json)
    }

    /// GET a filtered list and return its only item; `None` when empty
    pub fn get_one(&mut self, endpoint: &str, data: Option<Value>) -> Result<Option<Value>> {
        let mut outcome = self.get(endpoint, data)?;

        if outcome.status_code != 200 {
            let mut message = format!(
                "Got a {} response when trying to get one from {}",
                outcome.status_code, endpoint
            );
            if let Some(detail) = outcome.json.get("detail") {
                message.push_str(&format!(", detail: {}", detail));
            }
            return Err(Error::UnexpectedResponse { message });
        }

        let count = match (outcome.json.get("count"), outcome.json.get("results")) {
            (Some(count), Some(_)) => count.as_u64().unwrap_or(0),
            _ => {
                return Err(Error::UnexpectedResponse {
                    message: format!("The endpoint {} did not provide count and results", endpoint),
                })
            }
        };

        match count {
            0 => Ok(None),
            1 => Ok(take_results(&mut outcome.json).into_iter().next()),
            n => Err(Error::UnexpectedResponse {
                message: format!("An unexpected number of items was returned from the API ({})", n),
            }),
        }
    }

    /// Find the id of a named object, falling back to treating the input as an id
    pub fn resolve_name_to_id(&mut self, resource: &str, name_or_id: &str) -> Result<u64> {
        let name_field = if resource == "users" { "username" } else { "name" };
        let outcome = self.get(resource, Some(json!({ name_field: name_or_id })))?;

        if outcome.status_code == 400 {
            let detail = outcome.json.get("detail").cloned().unwrap_or(Value::Null);
            return Err(Error::Lookup {
                message: format!("Unable to resolve {} for {}: {}", resource, name_or_id, detail),
            });
        }

        let count = outcome.json.get("count").and_then(Value::as_u64).unwrap_or(0);
        match count {
            1 => outcome.json["results"][0]["id"]
                .as_u64()
                .ok_or_else(|| Error::UnexpectedResponse {
                    message: format!("The {} {} has no numeric id", resource, name_or_id),
                }),
            0 => {
                if let Ok(id) = name_or_id.parse::<u64>() {
                    if self.exists(&format!("{}/{}", resource, id))? {
                        return Ok(id);
                    }
                }
                Err(Error::Lookup {
                    message: format!("The {} {} was not found on the server", resource, name_or_id),
                })
            }
            _ => Err(Error::Lookup {
                message: format!(
                    "Found too many names {} at endpoint {}, try using an ID instead of a name",
                    name_or_id, resource
                ),
            }),
        }
    }
}

fn take_results(json: &mut Value) -> Vec<Value> {
    match json.get_mut("results").map(Value::take) {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    }
}

/// `next` links may be absolute URLs; keep only path and query
fn page_endpoint(next: &str) -> String {
    match Url::parse(next) {
        Ok(url) => match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        },
        Err(_) => next.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_to_endpoint() {
        assert_eq!(param_to_endpoint("inventory"), "inventories");
        assert_eq!(param_to_endpoint("target_team"), "teams");
        assert_eq!(param_to_endpoint("workflow"), "workflow_job_templates");
        assert_eq!(param_to_endpoint("project"), "projects");
    }

    #[test]
    fn test_job_done() {
        assert!(!is_job_done("running"));
        assert!(!is_job_done("pending"));
        assert!(is_job_done("successful"));
        assert!(is_job_done("failed"));
        assert!(is_job_done("canceled"));
    }

    #[test]
    fn test_page_endpoint() {
        assert_eq!(page_endpoint("/api/v2/hosts/?page=2"), "/api/v2/hosts/?page=2");
        assert_eq!(
            page_endpoint("https://tower.example/api/v2/hosts/?page=3"),
            "/api/v2/hosts/?page=3"
        );
    }

    #[test]
    fn test_take_results() {
        let mut json = json!({"results": [1, 2], "count": 2});
        assert_eq!(take_results(&mut json), vec![json!(1), json!(2)]);
        assert!(take_results(&mut json!({"count": 0})).is_empty());
    }
}
