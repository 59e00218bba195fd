//! The host-facing read/dispatch/write loop, grounded on the teacher's
//! `CrucibleAcpHost::run` event loop, generalized per §5: one task per
//! in-flight host request, so a slow call to one upstream never blocks
//! responses to unrelated, healthy upstreams on the same connection.
//! Malformed JSON on a line is answered with a parse-error response
//! rather than terminating the session.

use std::sync::Arc;
use std::time::Duration;

use router_core::{JsonRpcRequest, JsonRpcResponse, RouterError};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::router::{parse_error_response, RouterServer};

/// Serve the host MCP session over `reader`/`writer` until EOF or
/// `shutdown` is triggered. Every non-notification request is
/// dispatched on its own task so independent upstreams never block one
/// another; on EOF or shutdown, no further requests are accepted and
/// whatever is still in flight gets `drain_deadline` to finish naturally
/// before being cancelled, per §5's shutdown contract.
pub async fn serve(
    server: Arc<RouterServer>,
    mut reader: impl AsyncBufRead + Unpin,
    mut writer: impl AsyncWrite + Unpin,
    shutdown: CancellationToken,
    drain_deadline: Duration,
) -> Result<(), RouterError> {
    tracing::info!("starting host event loop");

    let drain_token = CancellationToken::new();
    let mut tasks: JoinSet<Option<JsonRpcResponse>> = JoinSet::new();

    loop {
        let mut line = String::new();
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                tracing::info!("host loop cancelled");
                break;
            }

            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                if let Ok(Some(response)) = joined {
                    write_response(&mut writer, &response).await?;
                }
            }

            result = reader.read_line(&mut line) => {
                let bytes_read = result?;
                if bytes_read == 0 {
                    tracing::info!("host closed the connection (EOF)");
                    break;
                }

                let trimmed = line.trim_end();
                if trimmed.is_empty() {
                    continue;
                }

                match serde_json::from_str::<JsonRpcRequest>(trimmed) {
                    Ok(request) => {
                        if request.is_notification() {
                            tracing::debug!(method = %request.method, "received notification");
                            continue;
                        }

                        let id = request.id.clone().unwrap_or(Value::Null);
                        let server = Arc::clone(&server);
                        let cancel = drain_token.clone();
                        tasks.spawn(async move { dispatch(&server, request, id, cancel).await });
                    }
                    Err(err) => {
                        write_response(
                            &mut writer,
                            &parse_error_response(
                                Value::Null,
                                format!("invalid JSON-RPC request: {err}"),
                            ),
                        )
                        .await?;
                    }
                }
            }
        }
    }

    drain(tasks, drain_token, &mut writer, drain_deadline).await
}

/// Run one request to completion, or fail it with `Cancelled` if
/// `cancel` fires first (host shutdown past the drain deadline).
async fn dispatch(
    server: &RouterServer,
    request: JsonRpcRequest,
    id: Value,
    cancel: CancellationToken,
) -> Option<JsonRpcResponse> {
    tokio::select! {
        response = server.handle_request(request) => response,
        _ = cancel.cancelled() => Some(JsonRpcResponse::failure(
            id,
            RouterError::Cancelled.to_jsonrpc_error(None),
        )),
    }
}

/// Stop accepting new requests and let whatever is in flight finish
/// within `deadline`; anything still running past it is cancelled and
/// its `Cancelled` response is written out before returning.
async fn drain(
    mut tasks: JoinSet<Option<JsonRpcResponse>>,
    drain_token: CancellationToken,
    writer: &mut (impl AsyncWrite + Unpin),
    deadline: Duration,
) -> Result<(), RouterError> {
    if tasks.is_empty() {
        return Ok(());
    }

    tracing::info!(count = tasks.len(), "draining in-flight requests before shutdown");
    match tokio::time::timeout(deadline, drain_all(&mut tasks, writer)).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!("drain deadline elapsed, cancelling remaining in-flight requests");
            drain_token.cancel();
            drain_all(&mut tasks, writer).await
        }
    }
}

async fn drain_all(
    tasks: &mut JoinSet<Option<JsonRpcResponse>>,
    writer: &mut (impl AsyncWrite + Unpin),
) -> Result<(), RouterError> {
    while let Some(joined) = tasks.join_next().await {
        if let Ok(Some(response)) = joined {
            write_response(writer, &response).await?;
        }
    }
    Ok(())
}

async fn write_response(
    writer: &mut (impl AsyncWrite + Unpin),
    response: &JsonRpcResponse,
) -> Result<(), RouterError> {
    let mut payload = serde_json::to_string(response)?;
    payload.push('\n');
    writer.write_all(payload.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}
