//! The Tool Index: a deterministic, in-memory vector store over the
//! aggregated catalog.
//!
//! Built once at startup from `(public_name, embedding_text)` pairs and
//! never mutated afterward, so readers — including concurrent
//! `search_tools` calls — need no synchronization.

use router_embed::EmbeddingProvider;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("failed to embed '{public_name}': {source}")]
    EmbedFailed {
        public_name: String,
        #[source]
        source: router_embed::EmbeddingError,
    },
}

/// One entry ready to be embedded and stored.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub public_name: String,
    pub upstream_id: String,
    pub embedding_text: String,
}

#[derive(Debug, Clone)]
struct StoredEntry {
    public_name: String,
    upstream_id: String,
    vector: Vec<f32>,
}

/// A built, immutable tool index.
#[derive(Debug, Clone, Default)]
pub struct ToolIndex {
    entries: Vec<StoredEntry>,
}

impl ToolIndex {
    /// Embed every entry and store the result sorted by `public_name`,
    /// per §4.2: "result order must be deterministic (sort by
    /// public_name before storing)". Embedding itself may run
    /// concurrently; only the final storage order is fixed.
    pub async fn build(
        provider: &dyn EmbeddingProvider,
        mut entries: Vec<IndexEntry>,
    ) -> Result<Self, IndexError> {
        entries.sort_by(|a, b| a.public_name.cmp(&b.public_name));

        let texts: Vec<&str> = entries.iter().map(|e| e.embedding_text.as_str()).collect();
        let vectors = provider.embed_batch(&texts).await.map_err(|source| {
            let public_name = entries
                .first()
                .map(|e| e.public_name.clone())
                .unwrap_or_default();
            tracing::error!(public_name = %public_name, error = %source, "failed to embed catalog entries while building tool index");
            IndexError::EmbedFailed {
                public_name,
                source,
            }
        })?;

        let stored = entries
            .into_iter()
            .zip(vectors)
            .map(|(entry, vector)| StoredEntry {
                public_name: entry.public_name,
                upstream_id: entry.upstream_id,
                vector,
            })
            .collect();

        Ok(Self { entries: stored })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Top-`k` public names by cosine similarity (dot product on unit
    /// vectors). Ties break lexicographically. `filter` narrows the
    /// candidate set before ranking, e.g. to exclude `search_tools`
    /// from its own results.
    pub fn rank(
        &self,
        query_vector: &[f32],
        k: usize,
        filter: impl Fn(&str) -> bool,
    ) -> Vec<String> {
        self.rank_scored(query_vector, k, filter)
            .into_iter()
            .map(|(name, _)| name)
            .collect()
    }

    /// Same as `rank`, but also returns each result's cosine similarity.
    pub fn rank_scored(
        &self,
        query_vector: &[f32],
        k: usize,
        filter: impl Fn(&str) -> bool,
    ) -> Vec<(String, f32)> {
        let mut scored: Vec<(f32, &str)> = self
            .entries
            .iter()
            .filter(|entry| filter(&entry.public_name))
            .map(|entry| (dot(query_vector, &entry.vector), entry.public_name.as_str()))
            .collect();

        scored.sort_by(|a, b| match b.0.partial_cmp(&a.0) {
            Some(std::cmp::Ordering::Equal) | None => a.1.cmp(b.1),
            Some(order) => order,
        });

        scored
            .into_iter()
            .take(k)
            .map(|(score, name)| (name.to_string(), score))
            .collect()
    }

    /// A deterministic, diversity-oriented subset of size `min(n,
    /// catalog_size)`: partition by `upstream_id`, then round-robin one
    /// per upstream in sorted order, picking the smallest
    /// not-yet-chosen public name on each upstream's turn. `filter`
    /// narrows the candidate set before partitioning, e.g. to exclude
    /// the built-in tool from the upstream-diversity rotation.
    pub fn default_subset(&self, n: usize, filter: impl Fn(&str) -> bool) -> Vec<String> {
        use std::collections::BTreeMap;

        let mut by_upstream: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for entry in self.entries.iter().filter(|e| filter(&e.public_name)) {
            by_upstream
                .entry(entry.upstream_id.as_str())
                .or_default()
                .push(entry.public_name.as_str());
        }
        for names in by_upstream.values_mut() {
            names.sort();
        }

        let mut cursors: Vec<usize> = vec![0; by_upstream.len()];
        let mut result = Vec::with_capacity(n.min(self.entries.len()));

        'outer: loop {
            let mut made_progress = false;
            for (upstream_index, names) in by_upstream.values().enumerate() {
                if result.len() >= n {
                    break 'outer;
                }
                let cursor = &mut cursors[upstream_index];
                if let Some(name) = names.get(*cursor) {
                    result.push(name.to_string());
                    *cursor += 1;
                    made_progress = true;
                }
            }
            if !made_progress {
                break;
            }
        }

        result
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use router_embed::LocalHashEmbedder;

    fn entry(public_name: &str, upstream_id: &str, text: &str) -> IndexEntry {
        IndexEntry {
            public_name: public_name.to_string(),
            upstream_id: upstream_id.to_string(),
            embedding_text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn build_stores_entries_sorted_by_public_name() {
        let provider = LocalHashEmbedder::new();
        let index = ToolIndex::build(
            &provider,
            vec![
                entry("z.tool", "z", "zebra"),
                entry("a.tool", "a", "apple"),
            ],
        )
        .await
        .unwrap();
        assert_eq!(index.len(), 2);
    }

    #[tokio::test]
    async fn rank_returns_exact_match_first() {
        let provider = LocalHashEmbedder::new();
        let index = ToolIndex::build(
            &provider,
            vec![
                entry("docs.search", "docs", "search the documentation"),
                entry("web.fetch", "web", "fetch a web page over http"),
            ],
        )
        .await
        .unwrap();

        let query = provider.embed("search the documentation").await.unwrap();
        let ranked = index.rank(&query, 2, |_| true);
        assert_eq!(ranked[0], "docs.search");
    }

    #[tokio::test]
    async fn rank_respects_filter() {
        let provider = LocalHashEmbedder::new();
        let index = ToolIndex::build(
            &provider,
            vec![
                entry("search_tools", "builtin", "search for tools"),
                entry("docs.search", "docs", "search the documentation"),
            ],
        )
        .await
        .unwrap();

        let query = provider.embed("search the documentation").await.unwrap();
        let ranked = index.rank(&query, 10, |name| name != "search_tools");
        assert!(!ranked.contains(&"search_tools".to_string()));
    }

    #[tokio::test]
    async fn rank_handles_k_greater_than_catalog_size() {
        let provider = LocalHashEmbedder::new();
        let index = ToolIndex::build(&provider, vec![entry("a.one", "a", "alpha")])
            .await
            .unwrap();
        let query = provider.embed("alpha").await.unwrap();
        let ranked = index.rank(&query, 50, |_| true);
        assert_eq!(ranked.len(), 1);
    }

    #[tokio::test]
    async fn default_subset_round_robins_across_upstreams() {
        let provider = LocalHashEmbedder::new();
        let index = ToolIndex::build(
            &provider,
            vec![
                entry("a.one", "a", "alpha one"),
                entry("a.two", "a", "alpha two"),
                entry("b.one", "b", "bravo one"),
            ],
        )
        .await
        .unwrap();

        let subset = index.default_subset(3, |_| true);
        // Round-robin order: a's smallest, b's smallest, then a's next.
        assert_eq!(subset, vec!["a.one", "b.one", "a.two"]);
    }

    #[tokio::test]
    async fn default_subset_caps_at_catalog_size() {
        let provider = LocalHashEmbedder::new();
        let index = ToolIndex::build(&provider, vec![entry("a.one", "a", "alpha")])
            .await
            .unwrap();
        let subset = index.default_subset(20, |_| true);
        assert_eq!(subset.len(), 1);
    }

    #[tokio::test]
    async fn default_subset_is_deterministic_across_runs() {
        let provider = LocalHashEmbedder::new();
        let entries = vec![
            entry("b.two", "b", "bravo two"),
            entry("a.one", "a", "alpha one"),
            entry("b.one", "b", "bravo one"),
            entry("a.two", "a", "alpha two"),
        ];
        let index_a = ToolIndex::build(&provider, entries.clone()).await.unwrap();
        let index_b = ToolIndex::build(&provider, entries).await.unwrap();
        assert_eq!(
            index_a.default_subset(4, |_| true),
            index_b.default_subset(4, |_| true)
        );
    }

    #[tokio::test]
    async fn default_subset_excludes_filtered_entries_from_rotation() {
        let provider = LocalHashEmbedder::new();
        let index = ToolIndex::build(
            &provider,
            vec![
                entry("search_tools", "", "search for tools"),
                entry("a.one", "a", "alpha one"),
            ],
        )
        .await
        .unwrap();
        let subset = index.default_subset(5, |name| name != "search_tools");
        assert_eq!(subset, vec!["a.one"]);
    }
}
