//! Shared helpers for CLI integration tests.
#![allow(dead_code)]

use std::fs;
use std::path::Path;

use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Well-known development key (first default account of local test chains).
pub const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcb78d7f2c2ab3ff80";
pub const DEV_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

pub fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

/// Creates an isolated APIXLAB_HOME with a `dev` connector backed by a key file.
pub fn temp_home() -> TempDir {
    let home = TempDir::new().expect("create temp apixlab home");
    let key_path = home.path().join("dev.key");
    fs::write(&key_path, format!("{DEV_KEY}\n")).unwrap();

    let config = format!(
        r#"[log]
file = false

[[wallet.connectors]]
id = "dev"
name = "Dev key"
key_file = "{}"
"#,
        key_path.display()
    );
    fs::write(home.path().join("config.toml"), config).unwrap();
    home
}

/// Writes a session entry directly into the storage file.
pub fn write_session(home: &Path, session: &Value) {
    let entries = json!({ "apixlab.session": session.to_string() });
    fs::write(home.join("storage.json"), entries.to_string()).unwrap();
}

/// Reads the session entry from the storage file.
pub fn read_session(home: &Path) -> Value {
    let raw = fs::read_to_string(home.join("storage.json")).unwrap();
    let entries: Value = serde_json::from_str(&raw).unwrap();
    let session = entries["apixlab.session"].as_str().unwrap();
    serde_json::from_str(session).unwrap()
}

pub fn graphql(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(data)
}

pub async fn mount_nonce(server: &MockServer, nonce: &str) {
    Mock::given(method("POST"))
        .and(body_string_contains("query GetNonce"))
        .respond_with(graphql(json!({"data": {"getNonce": {"data": nonce}}})))
        .mount(server)
        .await;
}

pub async fn mount_login(server: &MockServer, user_id: Value, token: &str) {
    Mock::given(method("POST"))
        .and(body_string_contains("mutation Login"))
        .respond_with(graphql(json!({
            "data": {"login": {"data": {"userId": user_id, "token": token}}}
        })))
        .mount(server)
        .await;
}

pub async fn mount_profile(server: &MockServer, name: &str) {
    Mock::given(method("POST"))
        .and(body_string_contains("query GetUserDetail"))
        .respond_with(graphql(json!({
            "data": {"getUserDetail": {"data": {"name": name}}}
        })))
        .mount(server)
        .await;
}
