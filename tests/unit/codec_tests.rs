//! Unit tests for NDJSON framing: the byte-stream codec and the
//! chunk-feed decoder.

use bytes::BytesMut;
use serde_json::json;
use tokio_util::codec::Decoder;

use acp_gateway::rpc::codec::{encode_batch, encode_frame, FrameCodec, FrameDecoder, MAX_LINE_BYTES};
use acp_gateway::AppError;

// ── FrameCodec: byte-stream framing ─────────────────────────────────────────

/// A complete newline-terminated line decodes to its content without the `\n`.
#[test]
fn codec_decodes_single_line() {
    let mut codec = FrameCodec::new();
    let mut buf = BytesMut::from("{\"jsonrpc\":\"2.0\",\"method\":\"initialize\",\"id\":1}\n");

    let result = codec.decode(&mut buf).expect("decode must succeed");

    assert_eq!(
        result,
        Some("{\"jsonrpc\":\"2.0\",\"method\":\"initialize\",\"id\":1}".to_owned()),
        "line content must be returned without the trailing newline"
    );
}

/// A line without its terminating newline is buffered, not emitted.
#[test]
fn codec_buffers_partial_line() {
    let mut codec = FrameCodec::new();
    let mut buf = BytesMut::from("{\"jsonrpc\":\"2.0\"");

    let result = codec.decode(&mut buf).expect("partial decode must not error");
    assert!(result.is_none(), "partial line must not be emitted yet");

    buf.extend_from_slice(b",\"method\":\"x\"}\n");
    let result = codec.decode(&mut buf).expect("decode must succeed");
    assert!(result.is_some(), "complete line must be emitted");
}

/// Two lines in one buffer decode as two items.
#[test]
fn codec_decodes_batched_lines() {
    let mut codec = FrameCodec::new();
    let mut buf = BytesMut::from("{\"a\":1}\n{\"b\":2}\n");

    assert!(codec.decode(&mut buf).expect("first decode").is_some());
    assert!(codec.decode(&mut buf).expect("second decode").is_some());
    assert!(codec.decode(&mut buf).expect("third decode").is_none());
}

/// A line past the limit returns `AppError::Codec("line too long …")`.
#[test]
fn codec_rejects_oversized_line() {
    let mut codec = FrameCodec::new();
    let big = "a".repeat(MAX_LINE_BYTES + 1) + "\n";
    let mut buf = BytesMut::from(big.as_str());

    match codec.decode(&mut buf) {
        Err(AppError::Codec(msg)) => assert!(
            msg.contains("line too long"),
            "error must mention 'line too long', got: {msg}"
        ),
        other => panic!("expected Err(AppError::Codec), got: {other:?}"),
    }
}

// ── FrameDecoder: chunk-feed decoding ────────────────────────────────────────

/// A frame split across two feeds is yielded only after the newline arrives.
#[test]
fn decoder_buffers_partial_across_feeds() {
    let mut decoder = FrameDecoder::new();

    let frames = decoder.feed("{\"jsonrpc\":\"2.0\",\"meth");
    assert!(frames.is_empty(), "no newline yet, nothing must be yielded");

    let frames = decoder.feed("od\":\"initialize\"}\n");
    assert_eq!(frames.len(), 1, "completed line must yield one frame");
    assert_eq!(frames[0].value["method"], "initialize");
    assert_eq!(frames[0].line_number, 1);
}

/// Multiple lines in one chunk each yield a frame, in order.
#[test]
fn decoder_yields_all_frames_in_chunk() {
    let mut decoder = FrameDecoder::new();

    let frames = decoder.feed("{\"n\":1}\n{\"n\":2}\n{\"n\":3}\n");

    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0].value["n"], 1);
    assert_eq!(frames[2].value["n"], 3);
    assert_eq!(frames[2].line_number, 3);
}

/// A malformed JSON line is skipped; lines after it still decode.
#[test]
fn decoder_skips_malformed_line_and_continues() {
    let mut decoder = FrameDecoder::new();

    let frames = decoder.feed("{\"ok\":1}\nnot-json{{{\n{\"ok\":2}\n");

    assert_eq!(frames.len(), 2, "malformed middle line must be skipped");
    assert_eq!(frames[0].value["ok"], 1);
    assert_eq!(frames[1].value["ok"], 2);
    assert_eq!(
        frames[1].line_number, 3,
        "line numbering must count the skipped line"
    );
}

/// Empty and whitespace-only lines are skipped without frames.
#[test]
fn decoder_skips_blank_lines() {
    let mut decoder = FrameDecoder::new();

    let frames = decoder.feed("\n   \n{\"ok\":true}\n");

    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].value["ok"], true);
}

/// `reset` clears buffered data and the line counter.
#[test]
fn decoder_reset_clears_state() {
    let mut decoder = FrameDecoder::new();
    decoder.feed("{\"a\":1}\n{\"partial");
    assert_eq!(decoder.lines_seen(), 1);

    decoder.reset();
    assert_eq!(decoder.lines_seen(), 0);

    // The stale partial must not bleed into the next feed.
    let frames = decoder.feed("{\"b\":2}\n");
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].value["b"], 2);
}

// ── Encoding ─────────────────────────────────────────────────────────────────

/// Encoded frames are compact single lines with exactly one trailing newline.
#[test]
fn encode_frame_is_single_line() {
    let line = encode_frame(&json!({"jsonrpc": "2.0", "id": 1, "result": {}}));

    assert!(line.ends_with('\n'), "frame must end with a newline");
    assert_eq!(
        line.matches('\n').count(),
        1,
        "frame must contain exactly one newline"
    );
}

/// A batch encodes as consecutive single-frame encodings.
#[test]
fn encode_batch_concatenates_frames() {
    let out = encode_batch(&[json!({"n": 1}), json!({"n": 2})]);

    assert_eq!(out, "{\"n\":1}\n{\"n\":2}\n");
}
