//! Transport and session management for one upstream MCP server.

pub mod session;
pub mod transport;

pub use session::UpstreamSession;
pub use transport::{HttpTransport, SseTransport, StdioTransport, Transport, TransportError};
