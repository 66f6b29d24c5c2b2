//! Unit tests for the outbound client role: id allocation, correlation,
//! timeouts, and notification forwarding.

use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;

use acp_gateway::rpc::RpcClient;
use acp_gateway::AppError;

fn client(timeout: Duration) -> (
    RpcClient,
    mpsc::Receiver<String>,
    mpsc::Receiver<(String, serde_json::Value)>,
) {
    let (sink_tx, sink_rx) = mpsc::channel(16);
    let (client, notif_rx) = RpcClient::new(sink_tx, timeout);
    (client, sink_rx, notif_rx)
}

/// A response with the matching id resolves the parked request.
#[tokio::test]
async fn response_resolves_pending_request() {
    let (client, mut sink_rx, _notif) = client(Duration::from_secs(5));

    let responder = client.clone();
    let pending = tokio::spawn(async move {
        responder
            .request("fs/read_text_file", json!({"path": "a.txt"}))
            .await
    });

    // Observe the outbound frame to learn the allocated id.
    let frame = sink_rx.recv().await.expect("request frame must be sent");
    let sent: serde_json::Value = serde_json::from_str(&frame).expect("frame must be JSON");
    assert_eq!(sent["jsonrpc"], "2.0");
    assert_eq!(sent["method"], "fs/read_text_file");
    let id = sent["id"].as_u64().expect("id must be an integer");

    client
        .handle_frame(&json!({"jsonrpc": "2.0", "id": id, "result": {"content": "hi"}}))
        .await;

    let result = pending
        .await
        .expect("task must not panic")
        .expect("request must resolve");
    assert_eq!(result["content"], "hi");
    assert_eq!(client.pending_count().await, 0);
}

/// An error response resolves the request as a failure.
#[tokio::test]
async fn error_response_resolves_as_failure() {
    let (client, mut sink_rx, _notif) = client(Duration::from_secs(5));

    let responder = client.clone();
    let pending = tokio::spawn(async move { responder.request("fs/write", json!({})).await });

    let frame = sink_rx.recv().await.expect("request frame must be sent");
    let sent: serde_json::Value = serde_json::from_str(&frame).expect("frame must be JSON");
    let id = sent["id"].as_u64().expect("id must be an integer");

    client
        .handle_frame(&json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": {"code": -32002, "message": "denied"},
        }))
        .await;

    let result = pending.await.expect("task must not panic");
    match result {
        Err(AppError::Rpc(msg)) => {
            assert!(msg.contains("-32002"), "got: {msg}");
            assert!(msg.contains("denied"), "got: {msg}");
        }
        other => panic!("expected Err(AppError::Rpc), got: {other:?}"),
    }
}

/// Ids are allocated monotonically, one per request.
#[tokio::test]
async fn ids_are_monotonic() {
    let (client, mut sink_rx, _notif) = client(Duration::from_millis(50));

    // Both requests will time out; only the allocated ids matter here.
    let c1 = client.clone();
    let c2 = client.clone();
    let r1 = tokio::spawn(async move { c1.request("a", json!({})).await });
    let r2 = tokio::spawn(async move { c2.request("b", json!({})).await });

    let f1 = sink_rx.recv().await.expect("first frame");
    let f2 = sink_rx.recv().await.expect("second frame");
    let id1 = serde_json::from_str::<serde_json::Value>(&f1).expect("json")["id"]
        .as_u64()
        .expect("int id");
    let id2 = serde_json::from_str::<serde_json::Value>(&f2).expect("json")["id"]
        .as_u64()
        .expect("int id");

    assert_ne!(id1, id2, "each request must get a fresh id");
    let _ = r1.await;
    let _ = r2.await;
}

/// The deadline elapsing yields a timeout and clears the pending entry.
#[tokio::test]
async fn timeout_removes_pending_entry() {
    let (client, mut sink_rx, _notif) = client(Duration::from_millis(20));

    let result = client.request("slow/method", json!({})).await;

    match result {
        Err(AppError::Timeout(msg)) => assert!(msg.contains("slow/method"), "got: {msg}"),
        other => panic!("expected Err(AppError::Timeout), got: {other:?}"),
    }
    assert_eq!(
        client.pending_count().await,
        0,
        "timed-out entries must be removed so late responses are dropped"
    );

    // The late response must be consumed without effect.
    let frame = sink_rx.recv().await.expect("request frame was sent");
    let id = serde_json::from_str::<serde_json::Value>(&frame).expect("json")["id"]
        .as_u64()
        .expect("int id");
    let consumed = client
        .handle_frame(&json!({"jsonrpc": "2.0", "id": id, "result": {}}))
        .await;
    assert!(consumed, "late responses are consumed, just not delivered");
}

/// Peer notifications are forwarded to the observer channel.
#[tokio::test]
async fn notifications_are_forwarded() {
    let (client, _sink_rx, mut notif_rx) = client(Duration::from_secs(1));

    let consumed = client
        .handle_frame(&json!({
            "jsonrpc": "2.0",
            "method": "session/update",
            "params": {"session_id": "s1"},
        }))
        .await;

    assert!(consumed);
    let (method, params) = notif_rx.recv().await.expect("notification must arrive");
    assert_eq!(method, "session/update");
    assert_eq!(params["session_id"], "s1");
}

/// `notify` writes a frame with no id.
#[tokio::test]
async fn notify_sends_id_less_frame() {
    let (client, mut sink_rx, _notif) = client(Duration::from_secs(1));

    client
        .notify("session/cancelled", json!({"session_id": "s1"}))
        .await
        .expect("notify must succeed while the sink is open");

    let frame = sink_rx.recv().await.expect("frame must be sent");
    let sent: serde_json::Value = serde_json::from_str(&frame).expect("frame must be JSON");
    assert!(sent.get("id").is_none(), "notifications carry no id");
    assert_eq!(sent["method"], "session/cancelled");
}
