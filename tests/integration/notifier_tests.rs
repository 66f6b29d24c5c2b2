//! Integration tests for the streaming notifier's frame shapes.

use serde_json::{json, Value};
use tokio::sync::mpsc;

use acp_gateway::protocol::{StopReason, StreamingNotifier};

async fn next_frame(rx: &mut mpsc::Receiver<String>) -> Value {
    let frame = rx.recv().await.expect("a frame must be enqueued");
    assert!(!frame.contains('\n'), "frames are single lines");
    serde_json::from_str(&frame).expect("frame must be valid JSON")
}

/// Every update is a `session/update` notification tagged with the
/// session id and carrying no request id.
#[tokio::test]
async fn updates_share_the_notification_envelope() {
    let (tx, mut rx) = mpsc::channel(8);
    let notifier = StreamingNotifier::new(tx, "sess-1");

    notifier.message("hello").await.expect("send");
    let frame = next_frame(&mut rx).await;

    assert_eq!(frame["jsonrpc"], "2.0");
    assert_eq!(frame["method"], "session/update");
    assert!(frame.get("id").is_none(), "notifications carry no id");
    assert_eq!(frame["params"]["session_id"], "sess-1");
}

/// Each update type carries its documented payload.
#[tokio::test]
async fn update_payload_shapes() {
    let (tx, mut rx) = mpsc::channel(8);
    let notifier = StreamingNotifier::new(tx, "sess-1");

    notifier.message("chunk").await.expect("message");
    notifier
        .tool_call("bash", &json!({"command": "ls"}))
        .await
        .expect("tool_call");
    notifier
        .tool_result("bash", "file.txt", false)
        .await
        .expect("tool_result");
    notifier.error("boom").await.expect("error");
    notifier.complete(StopReason::Completion).await.expect("complete");
    notifier.cancelled().await.expect("cancelled");

    let message = next_frame(&mut rx).await;
    assert_eq!(message["params"]["update"]["type"], "message");
    assert_eq!(
        message["params"]["update"]["content"][0],
        json!({"type": "text", "text": "chunk"})
    );

    let tool_call = next_frame(&mut rx).await;
    assert_eq!(tool_call["params"]["update"]["type"], "tool_call");
    assert_eq!(tool_call["params"]["update"]["tool_name"], "bash");
    assert_eq!(tool_call["params"]["update"]["arguments"]["command"], "ls");

    let tool_result = next_frame(&mut rx).await;
    assert_eq!(tool_result["params"]["update"]["type"], "tool_result");
    assert_eq!(tool_result["params"]["update"]["is_error"], false);

    let error = next_frame(&mut rx).await;
    assert_eq!(error["params"]["update"]["type"], "error");
    assert_eq!(error["params"]["update"]["message"], "boom");

    let complete = next_frame(&mut rx).await;
    assert_eq!(complete["params"]["update"]["type"], "complete");
    assert_eq!(complete["params"]["update"]["stop_reason"], "completion");

    let cancelled = next_frame(&mut rx).await;
    assert_eq!(cancelled["params"]["update"]["type"], "cancelled");
}

/// A closed sink surfaces as an error instead of a panic.
#[tokio::test]
async fn closed_sink_is_an_error() {
    let (tx, rx) = mpsc::channel(1);
    drop(rx);
    let notifier = StreamingNotifier::new(tx, "sess-1");

    let result = notifier.message("late").await;

    assert!(result.is_err(), "sending into a closed sink must fail");
}
