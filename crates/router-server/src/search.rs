//! The Search Service: turns a `search_tools` call into a ranked list
//! of catalog entries.

use router_catalog::{Catalog, SEARCH_TOOLS_NAME};
use router_core::RouterError;
use router_embed::EmbeddingProvider;
use router_index::ToolIndex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub public_name: String,
    pub description: String,
    pub similarity: f32,
}

/// `search_tools(query, context?)`, per §4.5: concatenate `query` with
/// each `context` entry (line-separated), embed it, rank against the
/// index excluding the built-in tool itself, and return descending by
/// similarity.
pub async fn search_tools(
    provider: &dyn EmbeddingProvider,
    index: &ToolIndex,
    catalog: &Catalog,
    query: &str,
    context: &[String],
    k: usize,
) -> Result<Vec<SearchResult>, RouterError> {
    if query.trim().is_empty() {
        return Err(RouterError::InvalidParams(
            "search_tools requires a non-empty query".to_string(),
        ));
    }

    let mut parts = vec![query.to_string()];
    parts.extend(context.iter().cloned());
    let query_text = parts.join("\n");

    let query_vector = provider
        .embed(&query_text)
        .await
        .map_err(|e| RouterError::SearchUnavailable(e.to_string()))?;

    let ranked = index.rank_scored(&query_vector, k, |name| name != SEARCH_TOOLS_NAME);

    Ok(ranked
        .into_iter()
        .map(|(public_name, similarity)| {
            let description = catalog
                .describe(&public_name)
                .map(|tool| tool.description.clone())
                .unwrap_or_default();
            SearchResult {
                public_name,
                description,
                similarity,
            }
        })
        .collect())
}
