//! Configuration types consumed by the Orchestrator.
//!
//! Parsing these from TOML/JSON/env is the CLI's job (`router-cli`); this
//! crate only defines the structured value the core accepts, per the
//! external-loader boundary drawn in the specification.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How the router reaches a single upstream MCP server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Stdio,
    Sse,
    Http,
}

/// Static description of one upstream, as supplied by configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamDescriptor {
    /// Unique key for this upstream across the whole configuration.
    pub id: String,
    pub transport: Transport,

    /// Executable and arguments, required when `transport == Stdio`.
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,

    /// URL, required when `transport` is `Sse` or `Http`.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Namespace prefix for this upstream's tools. Defaults to `id`.
    #[serde(default, rename = "semantic_prefix")]
    pub prefix: Option<String>,

    /// Appended to the embedding text of every tool from this upstream.
    #[serde(default)]
    pub category_description: Option<String>,

    /// Reconnect attempts allowed after a `degraded` transition.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
}

fn default_max_reconnect_attempts() -> u32 {
    1
}

impl UpstreamDescriptor {
    /// The namespace prefix to use for this upstream's public tool names.
    pub fn effective_prefix(&self) -> &str {
        self.prefix.as_deref().unwrap_or(&self.id)
    }
}

/// Top-level configuration handed to the Orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    #[serde(rename = "upstream", default)]
    pub upstreams: Vec<UpstreamDescriptor>,

    #[serde(default = "default_subset_size")]
    pub default_subset_size: usize,

    #[serde(default = "default_search_k")]
    pub search_default_k: usize,

    #[serde(default = "default_startup_deadline", with = "duration_secs")]
    pub startup_deadline: Duration,

    #[serde(default = "default_call_deadline", with = "duration_secs")]
    pub call_deadline_default: Duration,
}

fn default_subset_size() -> usize {
    20
}

fn default_search_k() -> usize {
    10
}

fn default_startup_deadline() -> Duration {
    Duration::from_secs(60)
}

fn default_call_deadline() -> Duration {
    Duration::from_secs(30)
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            upstreams: Vec::new(),
            default_subset_size: default_subset_size(),
            search_default_k: default_search_k(),
            startup_deadline: default_startup_deadline(),
            call_deadline_default: default_call_deadline(),
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(de)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_prefix_falls_back_to_id() {
        let descriptor = UpstreamDescriptor {
            id: "docs".to_string(),
            transport: Transport::Stdio,
            command: Some("docs-mcp".to_string()),
            args: vec![],
            endpoint: None,
            prefix: None,
            category_description: None,
            max_reconnect_attempts: 1,
        };
        assert_eq!(descriptor.effective_prefix(), "docs");
    }

    #[test]
    fn explicit_prefix_overrides_id() {
        let descriptor = UpstreamDescriptor {
            id: "docs".to_string(),
            transport: Transport::Stdio,
            command: Some("docs-mcp".to_string()),
            args: vec![],
            endpoint: None,
            prefix: Some("d".to_string()),
            category_description: None,
            max_reconnect_attempts: 1,
        };
        assert_eq!(descriptor.effective_prefix(), "d");
    }

    #[test]
    fn default_config_matches_spec_defaults() {
        let config = RouterConfig::default();
        assert_eq!(config.default_subset_size, 20);
        assert_eq!(config.search_default_k, 10);
        assert_eq!(config.startup_deadline, Duration::from_secs(60));
        assert_eq!(config.call_deadline_default, Duration::from_secs(30));
        assert!(config.upstreams.is_empty());
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = RouterConfig {
            upstreams: vec![UpstreamDescriptor {
                id: "a".to_string(),
                transport: Transport::Stdio,
                command: Some("a-mcp".to_string()),
                args: vec!["--stdio".to_string()],
                endpoint: None,
                prefix: None,
                category_description: Some("cat".to_string()),
                max_reconnect_attempts: 1,
            }],
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: RouterConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.upstreams.len(), 1);
        assert_eq!(parsed.upstreams[0].id, "a");
    }
}
