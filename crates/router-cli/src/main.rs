use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use router_cli::{cli::Cli, config::CliConfig};
use router_embed::LocalHashEmbedder;
use router_server::{host, orchestrator};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = format!("router_cli={log_level},router_server={log_level},router_upstream={log_level}");
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(env_filter))
        .with_writer(std::io::stderr)
        .init();

    let config = CliConfig::load(cli.config)?;

    let provider: Arc<dyn router_embed::EmbeddingProvider> = Arc::new(LocalHashEmbedder::new());

    let server = match orchestrator::start(config.router, provider).await {
        Ok(server) => Arc::new(server),
        Err(err) => {
            tracing::error!(error = %err, "fatal error during startup");
            std::process::exit(1);
        }
    };

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received ctrl-c, shutting down");
            signal_token.cancel();
        }
    });

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();

    let drain_deadline = std::time::Duration::from_secs(5);
    let result = host::serve(Arc::clone(&server), stdin, stdout, shutdown, drain_deadline).await;

    orchestrator::shutdown(&server).await;

    result.map_err(anyhow::Error::from)
}
