//! Stdio transport: NDJSON over stdin/stdout.
//!
//! Frames are processed strictly in arrival order; the response to one
//! request is written before the next line is read. Streamed
//! `session/update` frames emitted during a turn interleave through the
//! shared outbound channel.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::protocol::GatewayMethods;
use crate::rpc::codec::FrameCodec;
use crate::rpc::envelope::{ErrorCode, Response, RpcError};
use crate::rpc::RpcEngine;
use crate::{AppError, Result};

/// Serve ACP on stdin/stdout until EOF or shutdown.
///
/// # Errors
///
/// Returns `AppError::Io` when stdin fails mid-stream; EOF and shutdown
/// are clean exits.
pub async fn run_stdio(methods: Arc<GatewayMethods>, shutdown: CancellationToken) -> Result<()> {
    info!("stdio transport started");

    let (sink_tx, mut sink_rx) = mpsc::channel::<String>(256);
    let engine = RpcEngine::new(methods, sink_tx.clone());

    // Single writer task owns stdout so responses and streamed updates
    // never interleave within a line.
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(frame) = sink_rx.recv().await {
            if stdout.write_all(frame.as_bytes()).await.is_err()
                || stdout.write_all(b"\n").await.is_err()
                || stdout.flush().await.is_err()
            {
                error!("stdout closed, stopping writer");
                break;
            }
        }
    });

    let mut reader = FramedRead::new(tokio::io::stdin(), FrameCodec::new());
    let outcome = loop {
        tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                info!("stdio transport shutting down");
                break Ok(());
            }
            line = reader.next() => match line {
                Some(Ok(line)) => {
                    if let Some(response) = engine.process(&line).await {
                        if sink_tx.send(response).await.is_err() {
                            break Err(AppError::Io("stdout writer stopped".into()));
                        }
                    }
                }
                Some(Err(AppError::Codec(msg))) => {
                    // Oversized line: answer like any other unparseable
                    // frame and keep reading.
                    warn!(error = %msg, "dropping oversized input line");
                    let response =
                        Response::failure(None, RpcError::new(ErrorCode::ParseError, msg));
                    if sink_tx.send(response.to_frame()).await.is_err() {
                        break Err(AppError::Io("stdout writer stopped".into()));
                    }
                }
                Some(Err(e)) => break Err(e),
                None => {
                    info!("stdin reached EOF, stopping");
                    break Ok(());
                }
            },
        }
    };

    // Release all sink handles so the writer drains and exits.
    drop(engine);
    drop(sink_tx);
    let _ = writer.await;

    outcome
}
