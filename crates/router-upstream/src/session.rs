//! The Upstream Session: one transport to one upstream MCP server, with
//! correlation, absolute deadlines, and the degrade/reconnect state
//! machine from §4.3.
//!
//! Traffic to a single upstream is serialized behind the session's
//! transport lock rather than true request pipelining — matching the
//! teacher client's own send-then-read-one-line discipline in
//! `client.rs`. The correlation id is still attached to every request
//! so the wire format stays forward-compatible with a pipelined
//! transport; see DESIGN.md for the tradeoff.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use router_core::{NativeTool, RouterError, SessionStatus, UpstreamDescriptor};
use serde_json::{json, Value};
use tokio::sync::{Mutex, RwLock};

use crate::transport::{HttpTransport, SseTransport, StdioTransport, Transport, TransportError};

/// One live connection to an upstream MCP server.
pub struct UpstreamSession {
    descriptor: UpstreamDescriptor,
    transport: Mutex<Box<dyn Transport>>,
    status: RwLock<SessionStatus>,
    next_id: AtomicU64,
    reconnect_attempts_used: AtomicU64,
}

impl UpstreamSession {
    /// Opens the transport, performs the MCP handshake, and fetches the
    /// upstream's tool list. On success the session is `ready` and the
    /// native tool list is returned alongside it.
    pub async fn start(
        descriptor: UpstreamDescriptor,
    ) -> Result<(Arc<Self>, Vec<NativeTool>), RouterError> {
        let transport = open_transport(&descriptor).await?;
        Self::start_with_transport(descriptor, transport).await
    }

    /// Same as `start`, but with a caller-supplied transport. Exists so
    /// tests can exercise the handshake and call path against an
    /// in-process mock instead of a real child process, the way the
    /// teacher's ACP client accepts a boxed transport for its own tests.
    pub async fn start_with_transport(
        descriptor: UpstreamDescriptor,
        transport: Box<dyn Transport>,
    ) -> Result<(Arc<Self>, Vec<NativeTool>), RouterError> {
        let session = Arc::new(Self {
            descriptor,
            transport: Mutex::new(transport),
            status: RwLock::new(SessionStatus::Connecting),
            next_id: AtomicU64::new(1),
            reconnect_attempts_used: AtomicU64::new(0),
        });

        let tools = session.handshake_and_list_tools().await?;
        *session.status.write().await = SessionStatus::Ready;
        tracing::info!(upstream_id = %session.descriptor.id, "upstream session ready");

        Ok((session, tools))
    }

    pub fn upstream_id(&self) -> &str {
        &self.descriptor.id
    }

    pub async fn status(&self) -> SessionStatus {
        *self.status.read().await
    }

    /// Submit a `tools/call` and await the correlated response, failing
    /// with `UpstreamTimeout` if `deadline` elapses first.
    ///
    /// `native_name` is what goes out on the wire to the upstream;
    /// `public_name` is what every wire error reports back to the host,
    /// per §7 ("every wire error carries an identifying name — the
    /// public tool name when applicable").
    pub async fn call(
        &self,
        native_name: &str,
        public_name: &str,
        arguments: Value,
        deadline: Instant,
    ) -> Result<Value, RouterError> {
        if *self.status.read().await == SessionStatus::Degraded {
            self.reconnect(public_name).await?;
        }

        if *self.status.read().await != SessionStatus::Ready {
            return Err(RouterError::UpstreamClosed {
                upstream_id: self.descriptor.id.clone(),
                name: public_name.to_string(),
            });
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "tools/call",
            "params": { "name": native_name, "arguments": arguments },
        });

        match self.send_and_receive(&request, deadline).await {
            Ok(response) => self.extract_result(response, public_name),
            Err(RouterError::UpstreamTimeout { .. }) => Err(RouterError::UpstreamTimeout {
                upstream_id: self.descriptor.id.clone(),
                name: public_name.to_string(),
            }),
            Err(_) => {
                self.reconnect(public_name).await?;
                Err(RouterError::UpstreamClosed {
                    upstream_id: self.descriptor.id.clone(),
                    name: public_name.to_string(),
                })
            }
        }
    }

    /// Graceful shutdown: close the transport and mark the session
    /// closed. Any subsequent `call` fails with `UpstreamClosed`.
    pub async fn stop(&self) {
        *self.status.write().await = SessionStatus::Closed;
        let mut transport = self.transport.lock().await;
        if let Err(err) = transport.close().await {
            tracing::warn!(upstream_id = %self.descriptor.id, error = %err, "error closing transport");
        }
    }

    async fn handshake_and_list_tools(&self) -> Result<Vec<NativeTool>, RouterError> {
        let init_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let initialize = json!({
            "jsonrpc": "2.0",
            "id": init_id,
            "method": "initialize",
            "params": { "protocolVersion": "2024-11-05", "capabilities": {} },
        });

        let deadline = Instant::now() + std::time::Duration::from_secs(30);
        let response = self
            .send_and_receive(&initialize, deadline)
            .await
            .map_err(|e| RouterError::HandshakeFailed(e.to_string()))?;
        if response.get("error").is_some() {
            return Err(RouterError::HandshakeFailed(format!(
                "upstream '{}' rejected initialize",
                self.descriptor.id
            )));
        }

        let list_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let list_tools = json!({
            "jsonrpc": "2.0",
            "id": list_id,
            "method": "tools/list",
            "params": {},
        });
        let response = self
            .send_and_receive(&list_tools, deadline)
            .await
            .map_err(|e| RouterError::ListToolsFailed(e.to_string()))?;

        let tools = response
            .get("result")
            .and_then(|r| r.get("tools"))
            .and_then(|t| t.as_array())
            .ok_or_else(|| {
                RouterError::ListToolsFailed(format!(
                    "upstream '{}' returned a malformed tools/list response",
                    self.descriptor.id
                ))
            })?;

        tools
            .iter()
            .map(|tool| {
                let name = tool
                    .get("name")
                    .and_then(|n| n.as_str())
                    .ok_or_else(|| {
                        RouterError::ListToolsFailed(format!(
                            "upstream '{}' returned a tool with no name",
                            self.descriptor.id
                        ))
                    })?
                    .to_string();
                let description = tool
                    .get("description")
                    .and_then(|d| d.as_str())
                    .unwrap_or_default()
                    .to_string();
                let input_schema = tool
                    .get("inputSchema")
                    .cloned()
                    .unwrap_or_else(|| json!({"type": "object"}));
                Ok(NativeTool {
                    name,
                    description,
                    input_schema,
                    upstream_id: self.descriptor.id.clone(),
                })
            })
            .collect()
    }

    async fn send_and_receive(
        &self,
        request: &Value,
        deadline: Instant,
    ) -> Result<Value, RouterError> {
        let mut transport = self.transport.lock().await;
        transport
            .send(request)
            .await
            .map_err(|e| RouterError::UpstreamUnreachable(e.to_string()))?;

        let timeout = deadline.saturating_duration_since(Instant::now());
        match tokio::time::timeout(timeout, transport.recv()).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(RouterError::UpstreamUnreachable(e.to_string())),
            Err(_) => Err(RouterError::UpstreamTimeout {
                upstream_id: self.descriptor.id.clone(),
                name: request
                    .get("method")
                    .and_then(|m| m.as_str())
                    .unwrap_or("unknown")
                    .to_string(),
            }),
        }
    }

    fn extract_result(&self, response: Value, public_name: &str) -> Result<Value, RouterError> {
        if let Some(error) = response.get("error") {
            let code = error.get("code").and_then(|c| c.as_i64()).unwrap_or(-1);
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown upstream error")
                .to_string();
            let data = error.get("data").cloned();
            return Err(RouterError::UpstreamError {
                upstream_id: self.descriptor.id.clone(),
                name: public_name.to_string(),
                code,
                message,
                data,
            });
        }
        Ok(response.get("result").cloned().unwrap_or(Value::Null))
    }

    /// Attempt the one reconnect the session is allowed after a
    /// transient failure: reopen the transport and replay the
    /// handshake. A second failure is terminal.
    async fn reconnect(&self, public_name: &str) -> Result<(), RouterError> {
        *self.status.write().await = SessionStatus::Degraded;

        let attempts = self.reconnect_attempts_used.fetch_add(1, Ordering::SeqCst);
        if attempts >= self.descriptor.max_reconnect_attempts as u64 {
            *self.status.write().await = SessionStatus::Closed;
            return Err(RouterError::UpstreamClosed {
                upstream_id: self.descriptor.id.clone(),
                name: public_name.to_string(),
            });
        }

        tracing::warn!(upstream_id = %self.descriptor.id, "attempting reconnect");
        match open_transport(&self.descriptor).await {
            Ok(new_transport) => {
                *self.transport.lock().await = new_transport;
                self.next_id.store(1, Ordering::SeqCst);
                match self.handshake_and_list_tools().await {
                    Ok(_) => {
                        *self.status.write().await = SessionStatus::Ready;
                        tracing::info!(upstream_id = %self.descriptor.id, "reconnect succeeded");
                        Ok(())
                    }
                    Err(err) => {
                        *self.status.write().await = SessionStatus::Closed;
                        tracing::error!(upstream_id = %self.descriptor.id, error = %err, "reconnect handshake failed");
                        Err(RouterError::UpstreamClosed {
                            upstream_id: self.descriptor.id.clone(),
                            name: public_name.to_string(),
                        })
                    }
                }
            }
            Err(err) => {
                *self.status.write().await = SessionStatus::Closed;
                tracing::error!(upstream_id = %self.descriptor.id, error = %err, "reconnect transport failed");
                Err(RouterError::UpstreamClosed {
                    upstream_id: self.descriptor.id.clone(),
                    name: public_name.to_string(),
                })
            }
        }
    }
}

async fn open_transport(
    descriptor: &UpstreamDescriptor,
) -> Result<Box<dyn Transport>, RouterError> {
    use router_core::Transport as TransportKind;

    match descriptor.transport {
        TransportKind::Stdio => {
            let command = descriptor.command.as_ref().ok_or_else(|| {
                RouterError::InvalidConfig(format!(
                    "upstream '{}' uses stdio but has no command",
                    descriptor.id
                ))
            })?;
            StdioTransport::spawn(command, &descriptor.args)
                .await
                .map(|t| Box::new(t) as Box<dyn Transport>)
                .map_err(|e| RouterError::UpstreamUnreachable(e.to_string()))
        }
        TransportKind::Sse => {
            let endpoint = descriptor.endpoint.clone().ok_or_else(|| {
                RouterError::InvalidConfig(format!(
                    "upstream '{}' uses sse but has no endpoint",
                    descriptor.id
                ))
            })?;
            Ok(Box::new(SseTransport::new(endpoint)))
        }
        TransportKind::Http => {
            let endpoint = descriptor.endpoint.clone().ok_or_else(|| {
                RouterError::InvalidConfig(format!(
                    "upstream '{}' uses http but has no endpoint",
                    descriptor.id
                ))
            })?;
            Ok(Box::new(HttpTransport::new(endpoint)))
        }
    }
}

impl From<TransportError> for RouterError {
    fn from(err: TransportError) -> Self {
        RouterError::UpstreamUnreachable(err.to_string())
    }
}
