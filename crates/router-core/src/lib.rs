//! Shared types for the MCP router workspace.
//!
//! This crate holds nothing that talks to a socket or a child process —
//! it is the vocabulary every other `router-*` crate builds on, in the
//! same role `crucible-core` plays for the rest of that workspace.

pub mod config;
pub mod error;
pub mod jsonrpc;
pub mod tool;

pub use config::{RouterConfig, Transport, UpstreamDescriptor};
pub use error::{ErrorKind, RouterError};
pub use jsonrpc::JsonRpcError;
pub use tool::{NativeTool, PublicTool, SessionStatus};
