//! End-to-end tests of the controller client against a mock controller

use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower_core::http::Method;
use tower_core::{ConfigResolver, ControllerClient, Error, ErrorKind, RequestOptions};

// base64("u:p")
const BASIC_U_P: &str = "Basic dTpw";

fn client_with_credentials(server: &ServerGuard) -> ControllerClient {
    ControllerClient::builder()
        .resolver(ConfigResolver::isolated())
        .host(server.url())
        .username("u")
        .password("p")
        .build()
        .expect("client should build")
}

fn client_with_token(server: &ServerGuard, token: &str) -> ControllerClient {
    ControllerClient::builder()
        .resolver(ConfigResolver::isolated())
        .host(server.url())
        .oauth_token(token)
        .build()
        .expect("client should build")
}

fn mock_token_issue(server: &mut ServerGuard) -> mockito::Mock {
    server
        .mock("POST", "/api/v2/tokens/")
        .match_header("authorization", BASIC_U_P)
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJson(json!({"application": null, "scope": "write"})))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": 7, "token": "abc"}"#)
        .create()
}

#[test]
fn test_first_request_issues_token_then_uses_bearer() {
    let mut server = Server::new();
    let token_mock = mock_token_issue(&mut server).expect(1);
    let get_mock = server
        .mock("GET", "/api/v2/inventories/5/")
        .match_header("authorization", "Bearer abc")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": 5, "name": "Demo Inventory"}"#)
        .create();

    let mut client = client_with_credentials(&server);
    let outcome = client.get("/inventories/5/", None).unwrap();

    assert_eq!(outcome.status_code, 200);
    assert_eq!(outcome.json["name"], "Demo Inventory");
    assert!(client.is_authenticated());
    assert_eq!(client.oauth_token_id().unwrap().as_str(), "7");
    token_mock.assert();
    get_mock.assert();
}

#[test]
fn test_authentication_happens_once() {
    let mut server = Server::new();
    let token_mock = mock_token_issue(&mut server).expect(1);
    let get_mock = server
        .mock("GET", "/api/v2/me/")
        .match_header("authorization", "Bearer abc")
        .with_status(200)
        .with_body(r#"{"count": 1}"#)
        .expect(3)
        .create();

    let mut client = client_with_credentials(&server);
    for _ in 0..3 {
        client.get("me", None).unwrap();
    }

    token_mock.assert();
    get_mock.assert();
}

#[test]
fn test_pre_supplied_token_skips_authentication() {
    let mut server = Server::new();
    let token_mock = server.mock("POST", "/api/v2/tokens/").expect(0).create();
    let launch_mock = server
        .mock("POST", "/api/v2/job_templates/3/launch/")
        .match_header("authorization", "Bearer xyz")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({"extra_vars": {"limit": "web"}})))
        .with_status(201)
        .with_body(r#"{"job": 42}"#)
        .create();

    let mut client = client_with_token(&server, "xyz");
    let outcome = client
        .post("/job_templates/3/launch/", Some(json!({"extra_vars": {"limit": "web"}})))
        .unwrap();

    assert_eq!(outcome.status_code, 201);
    assert_eq!(outcome.json["job"], 42);
    token_mock.assert();
    launch_mock.assert();
}

#[test]
fn test_post_without_data_sends_empty_object() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/api/v2/jobs/9/cancel/")
        .match_body(Matcher::Json(json!({})))
        .with_status(202)
        .create();

    let mut client = client_with_token(&server, "xyz");
    let outcome = client.post("jobs/9/cancel", None).unwrap();

    assert_eq!(outcome.status_code, 202);
    assert_eq!(outcome.json, json!({}));
    mock.assert();
}

#[test]
fn test_anonymous_access_without_credentials() {
    let mut server = Server::new();
    let token_mock = server.mock("POST", "/api/v2/tokens/").expect(0).create();
    let ping_mock = server
        .mock("GET", "/api/v2/ping/")
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_body(r#"{"version": "21.0.0"}"#)
        .create();

    let mut client = ControllerClient::builder()
        .resolver(ConfigResolver::isolated())
        .host(server.url())
        .build()
        .unwrap();

    assert_eq!(client.ping().unwrap(), "21.0.0");
    assert!(client.is_authenticated());
    token_mock.assert();
    ping_mock.assert();
}

#[test]
fn test_get_data_becomes_query_and_is_cleared() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/api/v2/hosts/?name=web01")
        .with_status(200)
        .with_body(r#"{"count": 0, "results": [], "next": null}"#)
        .create();

    let mut client = client_with_token(&server, "xyz");
    client.get("hosts", Some(json!({"name": "web01"}))).unwrap();

    assert!(client.url().query().is_none());
    mock.assert();
}

#[test]
fn test_query_cleared_after_failure() {
    let mut server = Server::new();
    server
        .mock("GET", "/api/v2/hosts/?page=2")
        .with_status(500)
        .with_body("boom")
        .create();

    let mut client = client_with_token(&server, "xyz");
    let err = client.get("/api/v2/hosts/?page=2", None).unwrap_err();

    assert!(matches!(err, Error::Server { status: 500, .. }));
    assert!(client.url().query().is_none());
}

#[test]
fn test_not_found_is_error_unless_tolerated() {
    let mut server = Server::new();
    server
        .mock("GET", "/api/v2/inventories/999/")
        .with_status(404)
        .with_body(r#"{"detail": "Not found."}"#)
        .expect(2)
        .create();

    let mut client = client_with_token(&server, "xyz");
    let err = client.get("inventories/999", None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(err.response().unwrap().body.contains("Not found."));

    let outcome = client
        .request(Method::GET, "inventories/999", RequestOptions::new().allow_missing())
        .unwrap();
    assert!(outcome.is_none());
}

#[test]
fn test_bad_request_is_returned_not_raised() {
    let mut server = Server::new();
    server
        .mock("POST", "/api/v2/projects/")
        .with_status(400)
        .with_body(r#"{"name": ["This field is required."]}"#)
        .create();
    server
        .mock("PATCH", "/api/v2/projects/1/")
        .with_status(400)
        .with_body("<html>bad</html>")
        .create();

    let mut client = client_with_token(&server, "xyz");
    let outcome = client.post("projects", Some(json!({}))).unwrap();
    assert_eq!(outcome.status_code, 400);
    assert_eq!(outcome.json["name"][0], "This field is required.");

    let err = client.patch("projects/1", Some(json!({"name": "x"}))).unwrap_err();
    assert!(matches!(err, Error::ResponseParse { .. }));
}

#[test]
fn test_unauthorized_always_raises() {
    let mut server = Server::new();
    server
        .mock("GET", "/api/v2/me/")
        .with_status(401)
        .with_body(r#"{"detail": "Invalid token."}"#)
        .create();

    let mut client = client_with_token(&server, "stale");
    let err = client
        .request(Method::GET, "me", RequestOptions::new().allow_missing())
        .unwrap_err();
    assert!(matches!(err, Error::Authentication { .. }));
}

#[test]
fn test_forbidden_and_method_not_allowed_carry_context() {
    let mut server = Server::new();
    server.mock("DELETE", "/api/v2/organizations/1/").with_status(403).create();
    server.mock("POST", "/api/v2/jobs/3/cancel/").with_status(405).create();

    let mut client = client_with_token(&server, "xyz");

    match client.delete("organizations/1").unwrap_err() {
        Error::Forbidden { method, path, .. } => {
            assert_eq!(method, "DELETE");
            assert_eq!(path, "/api/v2/organizations/1/");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let err = client.post("jobs/3/cancel", None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MethodNotAllowed);
}

#[test]
fn test_token_issue_failure_leaves_client_unauthenticated() {
    let mut server = Server::new();
    server
        .mock("POST", "/api/v2/tokens/")
        .with_status(401)
        .with_body(r#"{"detail": "Invalid username/password."}"#)
        .create();

    let mut client = client_with_credentials(&server);
    let err = client.get("me", None).unwrap_err();

    assert!(matches!(err, Error::TokenIssuance { .. }));
    assert!(err.response().unwrap().body.contains("Invalid username/password."));
    assert!(!client.is_authenticated());
}

#[test]
fn test_malformed_token_response() {
    let mut server = Server::new();
    server
        .mock("POST", "/api/v2/tokens/")
        .with_status(201)
        .with_body(r#"{"id": 7}"#)
        .create();

    let mut client = client_with_credentials(&server);
    let err = client.authenticate().unwrap_err();
    assert!(err.to_string().contains("Failed to extract token information"));
    assert!(!client.is_authenticated());
}

#[test]
fn test_logout_revokes_token_with_basic_auth() {
    let mut server = Server::new();
    mock_token_issue(&mut server);
    server.mock("GET", "/api/v2/me/").with_status(200).with_body("{}").create();
    let delete_mock = server
        .mock("DELETE", "/api/v2/tokens/7/")
        .match_header("authorization", BASIC_U_P)
        .with_status(204)
        .expect(1)
        .create();

    let mut client = client_with_credentials(&server);
    client.get("me", None).unwrap();
    client.logout();

    delete_mock.assert();
    assert!(!client.is_authenticated());
    assert!(client.oauth_token_id().is_none());
}

#[test]
fn test_logout_failure_only_warns() {
    let mut server = Server::new();
    mock_token_issue(&mut server);
    server.mock("GET", "/api/v2/me/").with_status(200).with_body("{}").create();
    server
        .mock("DELETE", "/api/v2/tokens/7/")
        .with_status(500)
        .with_body("internal error")
        .expect(1)
        .create();

    let warnings = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&warnings);
    let mut client = ControllerClient::builder()
        .resolver(ConfigResolver::isolated())
        .host(server.url())
        .username("u")
        .password("p")
        .warning_handler(Arc::new(move |_msg: &str| {
            counter.fetch_add(1, Ordering::SeqCst);
        }))
        .build()
        .unwrap();

    client.get("me", None).unwrap();
    client.logout();

    assert_eq!(warnings.load(Ordering::SeqCst), 1);
    assert!(client.is_authenticated());
    assert_eq!(client.oauth_token_id().unwrap().as_str(), "7");
}

#[test]
fn test_network_error_names_host() {
    // Port 9 (discard) is closed on test machines
    let mut client = ControllerClient::builder()
        .resolver(ConfigResolver::isolated())
        .host("http://127.0.0.1:9")
        .oauth_token("xyz")
        .build()
        .unwrap();

    let err = client.get("ping", None).unwrap_err();
    match err {
        Error::Network { host, .. } => assert_eq!(host, "127.0.0.1:9"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_connection_refused_with_ssl_in_url_is_network_error() {
    let mut client = ControllerClient::builder()
        .resolver(ConfigResolver::isolated())
        .host("http://127.0.0.1:9")
        .oauth_token("xyz")
        .build()
        .unwrap();

    let err = client.get("hosts/?name=ssl-proxy", None).unwrap_err();
    assert!(matches!(err, Error::Network { .. }), "unexpected error: {err:?}");
    assert_eq!(err.kind(), ErrorKind::Network);
}

#[test]
fn test_blank_token_in_config_file_still_authenticates() {
    let mut server = Server::new();
    let token_mock = mock_token_issue(&mut server).expect(1);
    let get_mock = server
        .mock("GET", "/api/v2/me/")
        .match_header("authorization", "Bearer abc")
        .with_status(200)
        .with_body("{}")
        .create();

    let dir = TempDir::new().unwrap();
    let config = dir.path().join("tower_cli.cfg");
    fs::write(
        &config,
        format!(
            "[general]\nhost = {}\nusername = u\npassword = p\noauth_token =\n",
            server.url()
        ),
    )
    .unwrap();

    let mut client = ControllerClient::builder()
        .resolver(ConfigResolver::isolated())
        .config_file(&config)
        .build()
        .unwrap();
    assert!(client.settings().oauth_token.is_none());

    client.get("me", None).unwrap();

    assert!(client.is_authenticated());
    assert_eq!(client.oauth_token_id().unwrap().as_str(), "7");
    token_mock.assert();
    get_mock.assert();
}

#[test]
fn test_blank_yaml_token_still_authenticates() {
    let mut server = Server::new();
    let token_mock = mock_token_issue(&mut server).expect(1);
    server
        .mock("GET", "/api/v2/me/")
        .match_header("authorization", "Bearer abc")
        .with_status(200)
        .with_body("{}")
        .create();

    let dir = TempDir::new().unwrap();
    let config = dir.path().join("tower.yml");
    fs::write(
        &config,
        format!(
            "host: {}\nusername: u\npassword: p\noauth_token: \"\"\n",
            server.url()
        ),
    )
    .unwrap();

    let mut client = ControllerClient::builder()
        .resolver(ConfigResolver::isolated())
        .config_file(&config)
        .build()
        .unwrap();
    client.get("me", None).unwrap();

    token_mock.assert();
}

#[test]
fn test_explicit_config_file_and_duplicate_warning() {
    let mut server = Server::new();
    server
        .mock("GET", "/api/v2/ping/")
        .match_header("authorization", "Bearer from-file")
        .with_status(200)
        .with_body(r#"{"version": "4.5.0"}"#)
        .create();

    let dir = TempDir::new().unwrap();
    let config = dir.path().join("tower.cfg");
    fs::write(
        &config,
        format!(
            "[general]\nhost = {}\noauth_token = from-file\nverify_ssl = false\n",
            server.url()
        ),
    )
    .unwrap();

    let messages = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink = Arc::clone(&messages);
    let mut client = ControllerClient::builder()
        .resolver(ConfigResolver::isolated())
        .config_file(&config)
        .host(server.url())
        .warning_handler(Arc::new(move |msg: &str| sink.lock().unwrap().push(msg.to_string())))
        .build()
        .unwrap();

    assert!(!client.settings().verify_ssl);
    assert_eq!(client.loaded_files(), &[config.clone()]);
    assert_eq!(client.ping().unwrap(), "4.5.0");

    let messages = messages.lock().unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("host"));
}

#[test]
fn test_get_all_follows_next_links() {
    let mut server = Server::new();
    server
        .mock("GET", "/api/v2/hosts/")
        .with_status(200)
        .with_body(
            r#"{"count": 3, "next": "/api/v2/hosts/?page=2", "results": [{"id": 1}, {"id": 2}]}"#,
        )
        .create();
    server
        .mock("GET", "/api/v2/hosts/?page=2")
        .with_status(200)
        .with_body(r#"{"count": 3, "next": null, "results": [{"id": 3}]}"#)
        .create();

    let mut client = client_with_token(&server, "xyz");
    let all = client.get_all("hosts", None).unwrap();

    let ids: Vec<u64> = all["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert!(all["next"].is_null());
}

#[test]
fn test_get_all_rejects_non_list() {
    let mut server = Server::new();
    server
        .mock("GET", "/api/v2/ping/")
        .with_status(200)
        .with_body(r#"{"version": "1"}"#)
        .create();

    let mut client = client_with_token(&server, "xyz");
    let err = client.get_all("ping", None).unwrap_err();
    assert!(err.to_string().contains("Expected list"));
}

#[test]
fn test_get_one() {
    let mut server = Server::new();
    server
        .mock("GET", "/api/v2/teams/?name=ops")
        .with_status(200)
        .with_body(r#"{"count": 1, "results": [{"id": 4, "name": "ops"}]}"#)
        .create();
    server
        .mock("GET", "/api/v2/teams/?name=ghost")
        .with_status(200)
        .with_body(r#"{"count": 0, "results": []}"#)
        .create();
    server
        .mock("GET", "/api/v2/teams/?name=dup")
        .with_status(200)
        .with_body(r#"{"count": 2, "results": [{"id": 1}, {"id": 2}]}"#)
        .create();

    let mut client = client_with_token(&server, "xyz");
    let team = client.get_one("teams", Some(json!({"name": "ops"}))).unwrap().unwrap();
    assert_eq!(team["id"], 4);
    assert!(client.get_one("teams", Some(json!({"name": "ghost"}))).unwrap().is_none());
    assert!(client.get_one("teams", Some(json!({"name": "dup"}))).is_err());
}

#[test]
fn test_resolve_name_to_id() {
    let mut server = Server::new();
    server
        .mock("GET", "/api/v2/users/?username=alice")
        .with_status(200)
        .with_body(r#"{"count": 1, "results": [{"id": 12}]}"#)
        .create();
    server
        .mock("GET", "/api/v2/inventories/?name=17")
        .with_status(200)
        .with_body(r#"{"count": 0, "results": []}"#)
        .create();
    let head_mock = server
        .mock("HEAD", "/api/v2/inventories/17/")
        .with_status(200)
        .create();
    server
        .mock("GET", "/api/v2/inventories/?name=nope")
        .with_status(200)
        .with_body(r#"{"count": 0, "results": []}"#)
        .create();

    let mut client = client_with_token(&server, "xyz");
    assert_eq!(client.resolve_name_to_id("users", "alice").unwrap(), 12);
    assert_eq!(client.resolve_name_to_id("inventories", "17").unwrap(), 17);
    head_mock.assert();

    let err = client.resolve_name_to_id("inventories", "nope").unwrap_err();
    assert!(matches!(err, Error::Lookup { .. }));
}
