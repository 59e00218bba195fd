//! Startup and shutdown sequencing, per §4.7.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use router_catalog::Catalog;
use router_core::{NativeTool, RouterConfig, RouterError, UpstreamDescriptor};
use router_embed::EmbeddingProvider;
use router_index::{IndexEntry, ToolIndex};
use router_upstream::UpstreamSession;

use crate::router::RouterServer;

/// Brings up every configured upstream, builds the Catalog and Index,
/// and hands back a `RouterServer` ready to serve the host transport.
///
/// Sessions that fail to reach `ready` are logged and excluded; startup
/// only aborts if every configured upstream failed.
pub async fn start(
    config: RouterConfig,
    provider: Arc<dyn EmbeddingProvider>,
) -> Result<RouterServer, RouterError> {
    let attempted = config.upstreams.len();

    let starts = config.upstreams.iter().cloned().map(|descriptor| {
        let deadline = config.startup_deadline;
        async move {
            let id = descriptor.id.clone();
            match tokio::time::timeout(deadline, UpstreamSession::start(descriptor.clone())).await
            {
                Ok(Ok((session, tools))) => Some((descriptor, session, tools)),
                Ok(Err(err)) => {
                    tracing::error!(upstream_id = %id, error = %err, "upstream failed to start");
                    None
                }
                Err(_) => {
                    tracing::error!(upstream_id = %id, "upstream start timed out");
                    None
                }
            }
        }
    });

    let started: Vec<_> = join_all(starts).await.into_iter().flatten().collect();

    if attempted > 0 && started.is_empty() {
        return Err(RouterError::AllUpstreamsFailed);
    }

    let mut sessions = HashMap::new();
    let mut for_catalog: Vec<(UpstreamDescriptor, Vec<NativeTool>)> = Vec::new();
    for (descriptor, session, tools) in started {
        sessions.insert(descriptor.id.clone(), session);
        for_catalog.push((descriptor, tools));
    }

    let catalog = Catalog::build(&for_catalog)?;

    let entries: Vec<IndexEntry> = catalog
        .index_entries()
        .into_iter()
        .map(|(public_name, upstream_id, embedding_text)| IndexEntry {
            public_name,
            upstream_id,
            embedding_text,
        })
        .collect();
    let index = ToolIndex::build(provider.as_ref(), entries)
        .await
        .map_err(|e| RouterError::EmbeddingUnavailable(e.to_string()))?;

    Ok(RouterServer::new(catalog, index, provider, sessions, config))
}

/// Stop every session in parallel. Per §4.7: stop accepting new host
/// requests before calling this (the caller's responsibility — once
/// the host reader loop exits, no further `handle_request` calls are
/// made).
pub async fn shutdown(server: &RouterServer) {
    let stops = server.sessions().values().map(|session| session.stop());
    join_all(stops).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use router_core::Transport;
    use router_embed::LocalHashEmbedder;

    #[tokio::test]
    async fn start_with_no_upstreams_yields_a_server_with_only_search_tools() {
        let config = RouterConfig {
            upstreams: vec![],
            ..Default::default()
        };
        let provider = Arc::new(LocalHashEmbedder::new());
        let server = start(config, provider).await.unwrap();
        assert_eq!(server.catalog().len(), 1);
    }

    #[tokio::test]
    async fn start_is_fatal_when_every_upstream_is_unreachable() {
        let config = RouterConfig {
            upstreams: vec![UpstreamDescriptor {
                id: "broken".to_string(),
                transport: Transport::Stdio,
                command: Some("definitely-not-a-real-binary-xyz".to_string()),
                args: vec![],
                endpoint: None,
                prefix: None,
                category_description: None,
                max_reconnect_attempts: 1,
            }],
            ..Default::default()
        };
        let provider = Arc::new(LocalHashEmbedder::new());
        let err = start(config, provider).await.unwrap_err();
        assert!(matches!(err, RouterError::AllUpstreamsFailed));
    }
}
