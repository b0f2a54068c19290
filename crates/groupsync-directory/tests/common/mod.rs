//! Common test utilities for groupsync-directory integration tests.

#![allow(dead_code)]

use groupsync_directory::{StaticToken, WorkspaceClient, WorkspaceConfig};
use serde_json::{json, Value};
use std::sync::{Arc, Once};
use std::time::Duration;
use wiremock::MockServer;

static INIT: Once = Once::new();

/// Initialize logging for tests (once). Set `RUST_LOG` to see client traces.
pub fn init_test_logging() {
    INIT.call_once(|| {
        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::fmt()
                .with_test_writer()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .try_init()
                .ok();
        }
    });
}

pub const TEST_TOKEN: &str = "test-token";
pub const ADMIN_PREFIX: &str = "/admin/directory/v1";
pub const SETTINGS_PREFIX: &str = "/groups/v1";

/// Group resource as returned by the Admin SDK.
pub fn group_json(id: &str, email: &str, name: &str) -> Value {
    json!({
        "kind": "admin#directory#group",
        "id": id,
        "email": email,
        "name": name,
        "description": format!("{name} group"),
        "directMembersCount": "0",
        "adminCreated": true
    })
}

pub fn member_json(id: &str, email: &str, role: &str) -> Value {
    json!({
        "kind": "admin#directory#member",
        "id": id,
        "email": email,
        "role": role,
        "type": "USER",
        "status": "ACTIVE"
    })
}

/// Wraps items into a list page under `key`.
pub fn page_json(key: &str, items: Vec<Value>, next_page_token: Option<&str>) -> Value {
    let mut page = serde_json::Map::new();
    page.insert(key.to_string(), Value::Array(items));
    if let Some(token) = next_page_token {
        page.insert("nextPageToken".to_string(), json!(token));
    }
    Value::Object(page)
}

/// Google API error envelope.
pub fn api_error_json(code: u16, status: &str, message: &str) -> Value {
    json!({
        "error": {
            "code": code,
            "message": message,
            "status": status,
            "errors": [{ "message": message, "domain": "global", "reason": "backendError" }]
        }
    })
}

pub fn settings_json(email: &str) -> Value {
    json!({
        "kind": "groupsSettings#groups",
        "email": email,
        "whoCanJoin": "CAN_REQUEST_TO_JOIN",
        "whoCanViewMembership": "ALL_IN_DOMAIN_CAN_VIEW",
        "allowExternalMembers": "false",
        "membersCanPostAsTheGroup": "false",
        "whoCanInvite": "ALL_MANAGERS_CAN_INVITE",
        "archiveOnly": "false"
    })
}

/// Client pointed at `server` with a small page size.
pub fn client_for(server: &MockServer) -> WorkspaceClient {
    init_test_logging();
    let config = WorkspaceConfig {
        admin_endpoint: format!("{}{ADMIN_PREFIX}", server.uri()),
        settings_endpoint: format!("{}{SETTINGS_PREFIX}", server.uri()),
        customer: "my_customer".to_string(),
        page_size: 2,
        request_timeout: Duration::from_secs(5),
    };
    WorkspaceClient::new(config, Arc::new(StaticToken::new(TEST_TOKEN))).unwrap()
}
