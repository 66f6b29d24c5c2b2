//! Unit tests for the session record and protocol wire types.

use std::path::PathBuf;

use chrono::{Duration, Utc};
use serde_json::json;

use acp_gateway::protocol::{AgentCapabilities, ContentItem, StopReason};
use acp_gateway::session::{Session, SessionMode};

// ── SessionMode ──────────────────────────────────────────────────────────────

/// Mode names round-trip through parse and render.
#[test]
fn mode_names_round_trip() {
    for mode in [SessionMode::Execute, SessionMode::Plan, SessionMode::Safe] {
        assert_eq!(SessionMode::from_name(mode.as_str()), Some(mode));
    }
    assert_eq!(SessionMode::from_name("yolo"), None);
}

// ── Session ──────────────────────────────────────────────────────────────────

/// New sessions start active, in execute mode, with zeroed counters.
#[test]
fn new_session_initial_state() {
    let now = Utc::now();
    let session = Session::new(PathBuf::from("/work"), "gpt-4".into(), json!({}), now);

    assert_eq!(session.mode, SessionMode::Execute);
    assert!(session.active);
    assert_eq!(session.message_count, 0);
    assert_eq!(session.tool_call_count, 0);
    assert_eq!(session.created_at, now);
    assert_eq!(session.last_activity, now);
    assert!(!session.id.is_empty());
}

/// Expiry compares idle time against the timeout, exclusive at the bound.
#[test]
fn expiry_is_relative_to_last_activity() {
    let now = Utc::now();
    let session = Session::new(PathBuf::from("/work"), "gpt-4".into(), json!({}), now);
    let timeout = Duration::seconds(60);

    assert!(!session.is_expired(timeout, now));
    assert!(!session.is_expired(timeout, now + Duration::seconds(60)));
    assert!(session.is_expired(timeout, now + Duration::seconds(61)));
}

/// The wire description carries the documented keys.
#[test]
fn describe_has_wire_keys() {
    let session = Session::new(
        PathBuf::from("/work"),
        "gpt-4".into(),
        json!({"label": "demo"}),
        Utc::now(),
    );
    let value = session.describe();

    assert_eq!(value["session_id"], json!(session.id));
    assert_eq!(value["model"], "gpt-4");
    assert_eq!(value["mode"], "execute");
    assert_eq!(value["working_directory"], "/work");
    assert_eq!(value["metadata"], json!({"label": "demo"}));
    assert_eq!(value["active"], true);
    assert_eq!(value["message_count"], 0);
    assert_eq!(value["tool_call_count"], 0);
    assert!(value["created_at"].is_string());
}

// ── Capabilities ─────────────────────────────────────────────────────────────

/// Intersection keeps only what both sides offer.
#[test]
fn capability_intersection() {
    let native = AgentCapabilities::native();
    let client = AgentCapabilities {
        streaming: true,
        tools: false,
        sessions: true,
        modes: vec!["execute".into(), "yolo".into()],
    };

    let effective = native.intersect(&client);

    assert!(effective.streaming);
    assert!(!effective.tools, "tools must drop when the client lacks them");
    assert_eq!(effective.modes, vec!["execute".to_owned()]);
}

// ── Content and stop reasons ─────────────────────────────────────────────────

/// Content items serialize with a `type` tag.
#[test]
fn content_items_are_type_tagged() {
    let text = serde_json::to_value(ContentItem::text("hi")).expect("serialize");
    assert_eq!(text, json!({"type": "text", "text": "hi"}));

    let resource = serde_json::to_value(ContentItem::Resource {
        uri: "file:///a.rs".into(),
        text: None,
    })
    .expect("serialize");
    assert_eq!(resource, json!({"type": "resource", "uri": "file:///a.rs"}));
}

/// `as_text` surfaces text from text and resource blocks only.
#[test]
fn as_text_extraction() {
    assert_eq!(ContentItem::text("hi").as_text(), Some("hi"));
    assert_eq!(
        ContentItem::Image {
            data: "AAAA".into(),
            mime_type: "image/png".into()
        }
        .as_text(),
        None
    );
}

/// Stop reasons use snake_case on the wire.
#[test]
fn stop_reasons_serialize_snake_case() {
    assert_eq!(
        serde_json::to_value(StopReason::Completion).expect("serialize"),
        json!("completion")
    );
    assert_eq!(
        serde_json::to_value(StopReason::UserStop).expect("serialize"),
        json!("user_stop")
    );
    assert_eq!(
        serde_json::to_value(StopReason::ToolCallLimit).expect("serialize"),
        json!("tool_call_limit")
    );
}
