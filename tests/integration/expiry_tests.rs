//! Integration tests for session expiry: lazy checks on access and the
//! background sweep task.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use serial_test::serial;
use tokio_util::sync::CancellationToken;

use acp_gateway::config::GatewayConfig;
use acp_gateway::session::{spawn_sweep_task, SessionManager};

use super::common::{call, harness_with, new_session};

/// Accessing an expired session reports -32004 once, then -32003.
///
/// Serialized: sub-second timing windows are too tight to share a core
/// with the other timing tests.
#[tokio::test]
#[serial]
async fn expired_session_reports_expired_then_not_found() {
    let mut config = GatewayConfig::default();
    config.session_timeout_seconds = 1;
    let h = harness_with(config);
    let session_id = new_session(&h.engine).await;

    tokio::time::sleep(Duration::from_millis(1200)).await;

    let first = call(
        &h.engine,
        1,
        "session/prompt",
        json!({"session_id": session_id, "prompt": "hi"}),
    )
    .await;
    assert_eq!(first["error"]["code"], -32004, "first access sees expiry");

    let second = call(
        &h.engine,
        2,
        "session/prompt",
        json!({"session_id": session_id, "prompt": "hi"}),
    )
    .await;
    assert_eq!(
        second["error"]["code"], -32003,
        "the expired session is gone afterwards"
    );
}

/// Activity within the window keeps a session alive past its original
/// deadline.
#[tokio::test]
#[serial]
async fn activity_extends_the_window() {
    let mut config = GatewayConfig::default();
    config.session_timeout_seconds = 1;
    let h = harness_with(config);
    let session_id = new_session(&h.engine).await;

    for id in 1..=3 {
        tokio::time::sleep(Duration::from_millis(500)).await;
        let response = call(
            &h.engine,
            id,
            "session/prompt",
            json!({"session_id": session_id, "prompt": "ping"}),
        )
        .await;
        assert!(
            response.get("error").is_none(),
            "prompt {id} must keep the session alive: {response:?}"
        );
    }
}

/// The sweep task removes idle sessions on its own and stops on cancel.
#[tokio::test]
#[serial]
async fn sweep_task_removes_idle_sessions() {
    let manager = Arc::new(SessionManager::new(
        10,
        chrono::Duration::milliseconds(50),
    ));
    manager
        .create(PathBuf::from("/tmp"), "gpt-4".into(), json!({}))
        .await
        .expect("create");

    let cancel = CancellationToken::new();
    let handle = spawn_sweep_task(
        Arc::clone(&manager),
        Duration::from_millis(100),
        cancel.clone(),
    );

    tokio::time::sleep(Duration::from_millis(350)).await;
    assert!(
        manager.is_empty().await,
        "the sweep must have removed the idle session"
    );

    cancel.cancel();
    handle.await.expect("sweep task must stop cleanly");
}
