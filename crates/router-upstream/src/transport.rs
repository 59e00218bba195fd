//! Duck-typed transports for talking to one upstream MCP server.
//!
//! `StdioTransport` is the one fully-implemented, tested variant,
//! grounded on the `write_request`/`read_response_line` pair in the
//! teacher's ACP client: a child process, newline-delimited JSON over
//! piped stdin/stdout, one line in, one line out. `SseTransport` and
//! `HttpTransport` complete the enum named in the wire protocol but are
//! not exercised by the test suite.

use std::process::Stdio;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to spawn upstream process: {0}")]
    Spawn(String),

    #[error("transport write failed: {0}")]
    Write(String),

    #[error("transport read failed: {0}")]
    Read(String),

    #[error("upstream closed the connection")]
    Closed,

    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("{0} transport is not implemented")]
    Unimplemented(&'static str),
}

/// The capability every Upstream Session needs from its wire: send one
/// JSON value, receive one JSON value, and close cleanly.
#[async_trait]
pub trait Transport: Send {
    async fn send(&mut self, msg: &Value) -> Result<(), TransportError>;
    async fn recv(&mut self) -> Result<Value, TransportError>;
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// A child process speaking newline-delimited JSON over piped stdio.
pub struct StdioTransport {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl StdioTransport {
    pub async fn spawn(command: &str, args: &[String]) -> Result<Self, TransportError> {
        let mut cmd = Command::new(command);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| TransportError::Spawn(e.to_string()))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| TransportError::Spawn("no stdin handle".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TransportError::Spawn("no stdout handle".to_string()))?;

        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn send(&mut self, msg: &Value) -> Result<(), TransportError> {
        let mut line = serde_json::to_string(msg)?;
        line.push('\n');
        self.stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| TransportError::Write(e.to_string()))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| TransportError::Write(e.to_string()))?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Value, TransportError> {
        let mut line = String::new();
        let bytes = self
            .stdout
            .read_line(&mut line)
            .await
            .map_err(|e| TransportError::Read(e.to_string()))?;
        if bytes == 0 {
            return Err(TransportError::Closed);
        }
        let value: Value = serde_json::from_str(line.trim_end())?;
        Ok(value)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        let _ = self.child.start_kill();
        let _ = self.child.wait().await;
        Ok(())
    }
}

/// Server-Sent Events transport for upstreams reached over HTTP.
///
/// A production implementation would drive `reqwest`'s streaming body
/// to read the event stream and a second POST endpoint to send
/// requests, the way `crucible-acp`'s SSE server side uses `axum`'s
/// streaming response. Not required by any configured upstream in this
/// workspace's test suite.
pub struct SseTransport {
    #[allow(dead_code)]
    endpoint: String,
}

impl SseTransport {
    pub fn new(endpoint: String) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl Transport for SseTransport {
    async fn send(&mut self, _msg: &Value) -> Result<(), TransportError> {
        Err(TransportError::Unimplemented("sse"))
    }

    async fn recv(&mut self) -> Result<Value, TransportError> {
        Err(TransportError::Unimplemented("sse"))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Plain request/response HTTP transport.
pub struct HttpTransport {
    #[allow(dead_code)]
    endpoint: String,
    #[allow(dead_code)]
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&mut self, _msg: &Value) -> Result<(), TransportError> {
        Err(TransportError::Unimplemented("http"))
    }

    async fn recv(&mut self) -> Result<Value, TransportError> {
        Err(TransportError::Unimplemented("http"))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}
