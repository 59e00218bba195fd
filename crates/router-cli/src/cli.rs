//! Command-line surface, mirroring the teacher's `clap::Parser` CLI.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "mcp-router", about = "Routes and aggregates MCP tool servers")]
pub struct Cli {
    /// Path to a TOML configuration file. Defaults to `./mcp-router.toml`
    /// if present, otherwise an upstream-less router is started.
    #[arg(short, long, env = "MCP_ROUTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug-level logging.
    #[arg(short, long)]
    pub verbose: bool,
}
