//! The host-facing MCP server: search service, router dispatch, host
//! I/O loop, and startup/shutdown orchestration.

pub mod host;
pub mod orchestrator;
pub mod router;
pub mod search;

pub use router::RouterServer;
pub use search::SearchResult;
