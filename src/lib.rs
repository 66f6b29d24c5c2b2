//! `acp-gateway` — JSON-RPC 2.0 broker between an editor client and a
//! tool-using agent runtime.
//!
//! Frames travel as NDJSON over stdio or WebSocket. The library layers
//! are, bottom up: [`rpc`] (framing, envelopes, dispatch engine, client
//! role), [`session`] (lifecycle registry), [`tools`] (execution
//! boundary), [`agent`] (runtime seam), [`protocol`] (the ACP method
//! surface and streaming updates), and [`transport`] (stdio and
//! WebSocket servers).

pub mod agent;
pub mod config;
pub mod errors;
pub mod protocol;
pub mod rpc;
pub mod session;
pub mod tools;
pub mod transport;

pub use errors::{AppError, Result};
