//! Integration tests for `session/prompt`: results, streamed updates,
//! and failure paths.

use serde_json::json;

use super::common::{call, drain_sink, harness, new_session};

/// A text prompt echoes back with a completion stop reason.
#[tokio::test]
async fn prompt_returns_echoed_content() {
    let mut h = harness();
    let session_id = new_session(&h.engine).await;

    let response = call(
        &h.engine,
        1,
        "session/prompt",
        json!({
            "session_id": session_id,
            "prompt": [{"type": "text", "text": "hello there"}],
        }),
    )
    .await;
    let result = &response["result"];

    assert_eq!(result["stop_reason"], "completion");
    assert_eq!(result["message"], "Echo: hello there");

    // The turn must have streamed a message update and a completion,
    // both tagged with the session id.
    let updates = drain_sink(&mut h.sink_rx);
    assert_eq!(updates.len(), 2, "expected message + complete, got: {updates:?}");
    for update in &updates {
        assert_eq!(update["method"], "session/update");
        assert_eq!(update["params"]["session_id"], json!(session_id));
    }
    assert_eq!(updates[0]["params"]["update"]["type"], "message");
    assert_eq!(updates[1]["params"]["update"]["type"], "complete");
    assert_eq!(updates[1]["params"]["update"]["stop_reason"], "completion");
}

/// A bare string prompt is accepted alongside the block form.
#[tokio::test]
async fn prompt_accepts_plain_string() {
    let h = harness();
    let session_id = new_session(&h.engine).await;

    let response = call(
        &h.engine,
        1,
        "session/prompt",
        json!({"session_id": session_id, "prompt": "plain"}),
    )
    .await;

    assert_eq!(response["result"]["message"], "Echo: plain");
}

/// Multiple text blocks join with newlines before reaching the runtime.
#[tokio::test]
async fn prompt_joins_text_blocks() {
    let h = harness();
    let session_id = new_session(&h.engine).await;

    let response = call(
        &h.engine,
        1,
        "session/prompt",
        json!({
            "session_id": session_id,
            "prompt": [
                {"type": "text", "text": "line one"},
                {"type": "text", "text": "line two"},
            ],
        }),
    )
    .await;

    assert_eq!(response["result"]["message"], "Echo: line one\nline two");
}

/// Prompts count against the session's message counter.
#[tokio::test]
async fn prompt_increments_message_count() {
    let h = harness();
    let session_id = new_session(&h.engine).await;

    for id in 1..=3 {
        call(
            &h.engine,
            id,
            "session/prompt",
            json!({"session_id": session_id, "prompt": "x"}),
        )
        .await;
    }

    let session = h.sessions.get(&session_id).await.expect("session lives");
    assert_eq!(session.message_count, 3);
}

/// Prompting an unknown session is -32003 and streams nothing.
#[tokio::test]
async fn prompt_unknown_session_is_not_found() {
    let mut h = harness();

    let response = call(
        &h.engine,
        1,
        "session/prompt",
        json!({"session_id": "ghost", "prompt": "hi"}),
    )
    .await;

    assert_eq!(response["error"]["code"], -32003);
    assert!(
        drain_sink(&mut h.sink_rx).is_empty(),
        "no updates may stream for a rejected prompt"
    );
}

/// A `!command` prompt streams tool_call and tool_result updates around
/// the shell execution.
#[tokio::test]
async fn bang_prompt_streams_tool_updates() {
    let mut h = harness();
    let session_id = new_session(&h.engine).await;

    let response = call(
        &h.engine,
        1,
        "session/prompt",
        json!({"session_id": session_id, "prompt": "!echo hi"}),
    )
    .await;

    assert_eq!(response["result"]["stop_reason"], "completion");
    assert_eq!(response["result"]["message"], "hi");

    let updates = drain_sink(&mut h.sink_rx);
    let kinds: Vec<&str> = updates
        .iter()
        .map(|u| u["params"]["update"]["type"].as_str().expect("typed update"))
        .collect();
    assert_eq!(kinds, vec!["tool_call", "tool_result", "complete"]);
    assert_eq!(updates[0]["params"]["update"]["tool_name"], "bash");
    assert_eq!(updates[1]["params"]["update"]["is_error"], false);
}

/// In plan mode the `!command` path proposes instead of executing.
#[tokio::test]
async fn bang_prompt_in_plan_mode_does_not_execute() {
    let mut h = harness();
    let session_id = new_session(&h.engine).await;
    call(
        &h.engine,
        1,
        "session/set_mode",
        json!({"session_id": session_id, "mode": "plan"}),
    )
    .await;

    let response = call(
        &h.engine,
        2,
        "session/prompt",
        json!({"session_id": session_id, "prompt": "!rm -rf /"}),
    )
    .await;

    let text = response["result"]["message"].as_str().expect("text message");
    assert!(text.contains("would run"), "got: {text}");

    let updates = drain_sink(&mut h.sink_rx);
    let kinds: Vec<&str> = updates
        .iter()
        .map(|u| u["params"]["update"]["type"].as_str().expect("typed update"))
        .collect();
    assert!(
        !kinds.contains(&"tool_call"),
        "plan mode must not invoke tools, got: {kinds:?}"
    );
}

/// Mode and model overrides in the prompt call update the session first.
#[tokio::test]
async fn prompt_overrides_update_session() {
    let h = harness();
    let session_id = new_session(&h.engine).await;

    let response = call(
        &h.engine,
        1,
        "session/prompt",
        json!({
            "session_id": session_id,
            "prompt": "!touch should-not-exist",
            "mode": "plan",
            "model": "gpt-4",
        }),
    )
    .await;

    let text = response["result"]["message"].as_str().expect("text message");
    assert!(text.contains("would run"), "plan override must hold: {text}");

    let session = h.sessions.get(&session_id).await.expect("session lives");
    assert_eq!(session.mode.as_str(), "plan");
    assert_eq!(session.model, "gpt-4");
}

/// An unknown model override fails the prompt before the turn runs.
#[tokio::test]
async fn prompt_rejects_unknown_model_override() {
    let mut h = harness();
    let session_id = new_session(&h.engine).await;

    let response = call(
        &h.engine,
        1,
        "session/prompt",
        json!({"session_id": session_id, "prompt": "hi", "model": "made-up"}),
    )
    .await;

    assert_eq!(response["error"]["code"], -32602);
    assert!(
        drain_sink(&mut h.sink_rx).is_empty(),
        "no updates may stream for a rejected prompt"
    );
}
