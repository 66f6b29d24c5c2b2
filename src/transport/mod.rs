//! Transports carrying NDJSON frames: stdio and WebSocket.

pub mod stdio;
pub mod ws;

pub use stdio::run_stdio;
pub use ws::{router, run_ws};
