//! JSON-RPC 2.0 plumbing: framing, envelopes, inbound engine, client role.

pub mod client;
pub mod codec;
pub mod engine;
pub mod envelope;

pub use client::RpcClient;
pub use codec::{encode_batch, encode_frame, Frame, FrameCodec, FrameDecoder, MAX_LINE_BYTES};
pub use engine::{NotificationHandler, RpcEngine};
pub use envelope::{
    classify, Envelope, EnvelopeError, ErrorCode, Notification, Request, RequestId, Response,
    RpcError, JSONRPC_VERSION,
};

/// Outbound frame channel shared by the server and client roles.
///
/// Each string is one complete frame without its trailing newline; the
/// transport write half appends framing.
pub type FrameSink = tokio::sync::mpsc::Sender<String>;
