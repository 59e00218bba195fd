//! A minimal TOML loader into `RouterConfig`, the ambient "config
//! layer" every teacher binary carries even though the core crate only
//! ever consumes the already-structured value.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use router_core::RouterConfig;

const DEFAULT_CONFIG_PATH: &str = "mcp-router.toml";

pub struct CliConfig {
    pub router: RouterConfig,
}

impl CliConfig {
    /// Load from an explicit path, or `./mcp-router.toml` if present, or
    /// fall back to an upstream-less default configuration.
    pub fn load(explicit_path: Option<PathBuf>) -> Result<Self> {
        let path = explicit_path.or_else(|| {
            let default = PathBuf::from(DEFAULT_CONFIG_PATH);
            default.exists().then_some(default)
        });

        let router = match path {
            Some(path) => Self::read_from(&path)?,
            None => RouterConfig::default(),
        };

        Ok(Self { router })
    }

    fn read_from(path: &Path) -> Result<RouterConfig> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}
