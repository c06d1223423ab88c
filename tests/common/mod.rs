//! Shared helpers for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use permgate::auth::CredentialResolver;
use permgate::remote::RemoteClient;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const PERMISSIONS_PATH: &str = "/api/users/me/permissions";

/// Client whose fixed credentials point at `server` with `token`
pub fn fixed_client(server: &MockServer, token: &str) -> Arc<RemoteClient> {
    let resolver =
        CredentialResolver::context_then_fixed(Some(server.uri()), Some(token.to_string()));
    Arc::new(RemoteClient::new(resolver).unwrap())
}

/// Client with no fixed credentials; only caller context can authenticate
pub fn context_only_client() -> Arc<RemoteClient> {
    Arc::new(RemoteClient::new(CredentialResolver::context_then_fixed(None, None)).unwrap())
}

/// Answer the permissions endpoint for `token` with `permissions`
pub async fn mount_permissions(server: &MockServer, token: &str, permissions: &[&str]) {
    Mock::given(method("GET"))
        .and(path(PERMISSIONS_PATH))
        .and(header("authorization", format!("Bearer {}", token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "permissions": permissions
        })))
        .mount(server)
        .await;
}
