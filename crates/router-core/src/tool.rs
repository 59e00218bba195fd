//! Tool entities shared between `router-catalog`, `router-index`, and
//! `router-server`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle state of one Upstream Session, per §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Init,
    Connecting,
    Ready,
    Degraded,
    Closed,
}

/// A tool exactly as reported by an upstream, before namespacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NativeTool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub upstream_id: String,
}

/// A tool as it appears in the aggregated catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicTool {
    pub public_name: String,
    pub native_name: String,
    pub upstream_id: String,
    pub description: String,
    pub input_schema: Value,
    pub embedding_text: String,
}

impl PublicTool {
    /// Split a public name at the first period into (prefix, rest).
    ///
    /// Native names containing a period are preserved as-is in `rest`;
    /// routing only ever splits at the first separator.
    pub fn split_public_name(public_name: &str) -> Option<(&str, &str)> {
        public_name.split_once('.')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_keeps_remainder_intact_when_native_name_has_a_period() {
        let (prefix, rest) = PublicTool::split_public_name("docs.v1.search").unwrap();
        assert_eq!(prefix, "docs");
        assert_eq!(rest, "v1.search");
    }

    #[test]
    fn split_returns_none_without_a_separator() {
        assert!(PublicTool::split_public_name("search_tools").is_none());
    }
}
