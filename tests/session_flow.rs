//! End-to-end flows across the session manager, tenant selector, and the
//! request-authorization gate, wired exactly as a shell would wire them.

use std::time::Duration;

use aquafeed_core::models::Company;
use aquafeed_core::{ApiError, Core, SessionState};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use httpmock::prelude::*;

/// Unsigned compact JWT with the given expiry offset in seconds.
fn make_token(expires_in_secs: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        serde_json::json!({ "exp": Utc::now().timestamp() + expires_in_secs }).to_string(),
    );
    format!("{}.{}.sig", header, payload)
}

fn company() -> Company {
    serde_json::from_value(serde_json::json!({
        "id": 42,
        "name": "Coral Labs",
        "description": "Research tanks"
    }))
    .unwrap()
}

async fn settle() {
    // Let the listener tasks drain the broadcast channel
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn logout_cascades_to_tenant_selection() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/auth/login");
        then.status(200).json_body(serde_json::json!({
            "access_token": make_token(3600),
            "token_type": "bearer"
        }));
    });
    server.mock(|when, then| {
        when.method(POST).path("/auth/logout");
        then.status(200).json_body(serde_json::json!({ "message": "ok" }));
    });

    let dir = tempfile::tempdir().unwrap();
    let core = Core::bootstrap_in(dir.path().to_path_buf(), &server.base_url()).unwrap();
    core.spawn_listeners();
    tokio::task::yield_now().await;

    assert!(core.session.login("keeper@reef.example", "hunter2!").await);
    core.tenants.select(&company());
    assert_eq!(core.tenants.selected_id(), Some(42));

    core.session.logout().await;
    settle().await;

    assert_eq!(core.session.state(), SessionState::Unauthenticated);
    assert!(core.tenants.selected_value().is_none());
    assert!(!dir.path().join("tenant.json").exists());
    assert!(!dir.path().join("token.json").exists());
}

#[tokio::test]
async fn bootstrap_with_expired_token_clears_stale_tenant() {
    let dir = tempfile::tempdir().unwrap();
    // Simulate a previous run: expired token and a tenant selection on disk
    std::fs::write(
        dir.path().join("token.json"),
        serde_json::json!({
            "access_token": make_token(-3600),
            "token_type": "bearer"
        })
        .to_string(),
    )
    .unwrap();
    std::fs::write(
        dir.path().join("tenant.json"),
        serde_json::json!({ "id": 42, "name": "Coral Labs" }).to_string(),
    )
    .unwrap();

    // Base URL points nowhere; startup reconciliation is purely local.
    let core = Core::bootstrap_in(dir.path().to_path_buf(), "http://127.0.0.1:9").unwrap();

    // The expired token ended the session during bootstrap, so the restored
    // selection must not outlive it - even with no listener tasks running.
    assert_eq!(core.session.state(), SessionState::Unauthenticated);
    assert!(core.tenants.selected_value().is_none());
    assert!(!dir.path().join("token.json").exists());
    assert!(!dir.path().join("tenant.json").exists());
}

#[tokio::test]
async fn restored_tenant_survives_bootstrap_with_valid_token() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("token.json"),
        serde_json::json!({
            "access_token": make_token(3600),
            "token_type": "bearer"
        })
        .to_string(),
    )
    .unwrap();
    std::fs::write(
        dir.path().join("tenant.json"),
        serde_json::json!({ "id": 42, "name": "Coral Labs" }).to_string(),
    )
    .unwrap();

    let core = Core::bootstrap_in(dir.path().to_path_buf(), "http://127.0.0.1:9").unwrap();

    assert_eq!(core.session.state(), SessionState::Authenticated);
    assert_eq!(core.tenants.selected_id(), Some(42));
}

#[tokio::test]
async fn expired_token_on_any_request_logs_out_and_clears_tenant() {
    let server = MockServer::start_async().await;
    let companies = server.mock(|when, then| {
        when.method(GET).path("/companies");
        then.status(200).json_body(serde_json::json!([]));
    });

    let dir = tempfile::tempdir().unwrap();
    let core = Core::bootstrap_in(dir.path().to_path_buf(), &server.base_url()).unwrap();
    core.spawn_listeners();
    tokio::task::yield_now().await;

    core.tenants.select(&company());
    assert_eq!(core.tenants.selected_id(), Some(42));

    // Hostile case: a stale token lands in storage behind the running core
    std::fs::write(
        dir.path().join("token.json"),
        serde_json::json!({
            "access_token": make_token(-3600),
            "token_type": "bearer"
        })
        .to_string(),
    )
    .unwrap();

    let err = core.api.list_companies().await.unwrap_err();
    assert!(matches!(err, ApiError::TokenExpired));
    companies.assert_hits(0);

    settle().await;
    assert_eq!(core.session.state(), SessionState::Unauthenticated);
    assert!(core.tenants.selected_value().is_none());
    assert!(!dir.path().join("token.json").exists());
}

#[tokio::test]
async fn double_logout_settles_in_the_same_state() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/auth/login");
        then.status(200).json_body(serde_json::json!({
            "access_token": make_token(3600),
            "token_type": "bearer"
        }));
    });
    server.mock(|when, then| {
        when.method(POST).path("/auth/logout");
        then.status(200).json_body(serde_json::json!({ "message": "ok" }));
    });

    let dir = tempfile::tempdir().unwrap();
    let core = Core::bootstrap_in(dir.path().to_path_buf(), &server.base_url()).unwrap();
    core.spawn_listeners();
    tokio::task::yield_now().await;

    assert!(core.session.login("keeper@reef.example", "hunter2!").await);
    core.tenants.select(&company());

    core.session.logout().await;
    core.session.logout().await;
    settle().await;

    assert_eq!(core.session.state(), SessionState::Unauthenticated);
    assert!(core.session.error().is_none());
    assert!(core.tenants.selected_value().is_none());
    assert!(!dir.path().join("token.json").exists());
    assert!(!dir.path().join("tenant.json").exists());
}
