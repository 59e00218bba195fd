//! The Tool Catalog: aggregates every ready upstream's native tools
//! under namespaced public names, plus the built-in `search_tools`
//! entry, and serves lookups for the Router Server.

use std::collections::HashMap;

use router_core::{NativeTool, PublicTool, RouterError, UpstreamDescriptor};
use serde_json::{json, Value};

pub const SEARCH_TOOLS_NAME: &str = "search_tools";

fn search_tools_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "query": { "type": "string" },
            "context": { "type": "array", "items": { "type": "string" } }
        },
        "required": ["query"]
    })
}

fn search_tools_embedding_text() -> String {
    "search_tools\nSemantically search the aggregated tool catalog for tools matching a natural-language query.\nparams: query:string, context:array\n".to_string()
}

/// Render the frozen `embedding_text` template: public name, then
/// description, then required-parameter names and types, then the
/// category description — each on its own line, omitted (not blank)
/// when the corresponding field is absent.
pub fn render_embedding_text(
    public_name: &str,
    description: &str,
    input_schema: &Value,
    category_description: Option<&str>,
) -> String {
    let mut text = String::new();
    text.push_str(public_name);
    text.push('\n');
    text.push_str(description);
    text.push('\n');

    let required = input_schema
        .get("required")
        .and_then(|r| r.as_array())
        .cloned()
        .unwrap_or_default();
    if !required.is_empty() {
        let properties = input_schema.get("properties");
        let rendered: Vec<String> = required
            .iter()
            .filter_map(|name| name.as_str())
            .map(|name| {
                let type_name = properties
                    .and_then(|p| p.get(name))
                    .and_then(|p| p.get("type"))
                    .and_then(|t| t.as_str())
                    .unwrap_or("any");
                format!("{name}:{type_name}")
            })
            .collect();
        text.push_str("params: ");
        text.push_str(&rendered.join(", "));
        text.push('\n');
    }

    if let Some(category) = category_description {
        text.push_str("category: ");
        text.push_str(category);
        text.push('\n');
    }

    text
}

/// One resolved catalog entry: enough to dispatch a `tools/call`
/// without re-parsing the public name.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub tool: PublicTool,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: HashMap<String, CatalogEntry>,
}

impl Catalog {
    /// Aggregate native tools from every ready session into namespaced
    /// public tools, plus the built-in `search_tools` entry. Duplicate
    /// public names are fatal; an empty catalog is not.
    pub fn build(
        sessions: &[(UpstreamDescriptor, Vec<NativeTool>)],
    ) -> Result<Self, RouterError> {
        let mut entries = HashMap::new();

        for (descriptor, tools) in sessions {
            let prefix = descriptor.effective_prefix();
            for tool in tools {
                let public_name = format!("{prefix}.{}", tool.name);
                if entries.contains_key(&public_name) {
                    tracing::error!(public_name = %public_name, "duplicate public tool name during catalog build");
                    return Err(RouterError::CatalogConflict(public_name));
                }
                let embedding_text = render_embedding_text(
                    &public_name,
                    &tool.description,
                    &tool.input_schema,
                    descriptor.category_description.as_deref(),
                );
                entries.insert(
                    public_name.clone(),
                    CatalogEntry {
                        tool: PublicTool {
                            public_name,
                            native_name: tool.name.clone(),
                            upstream_id: tool.upstream_id.clone(),
                            description: tool.description.clone(),
                            input_schema: tool.input_schema.clone(),
                            embedding_text,
                        },
                    },
                );
            }
        }

        if entries.contains_key(SEARCH_TOOLS_NAME) {
            tracing::error!("an upstream tool collided with the built-in search_tools name");
            return Err(RouterError::CatalogConflict(SEARCH_TOOLS_NAME.to_string()));
        }
        entries.insert(
            SEARCH_TOOLS_NAME.to_string(),
            CatalogEntry {
                tool: PublicTool {
                    public_name: SEARCH_TOOLS_NAME.to_string(),
                    native_name: SEARCH_TOOLS_NAME.to_string(),
                    upstream_id: String::new(),
                    description: "Semantically search the aggregated tool catalog".to_string(),
                    input_schema: search_tools_schema(),
                    embedding_text: search_tools_embedding_text(),
                },
            },
        );

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a public name to the upstream id and native name the
    /// Router Server should call.
    pub fn lookup(&self, public_name: &str) -> Option<(&str, &str)> {
        self.entries
            .get(public_name)
            .map(|entry| (entry.tool.upstream_id.as_str(), entry.tool.native_name.as_str()))
    }

    pub fn describe(&self, public_name: &str) -> Option<&PublicTool> {
        self.entries.get(public_name).map(|entry| &entry.tool)
    }

    /// All entries plus their `embedding_text`, ready for `ToolIndex::build`.
    pub fn index_entries(&self) -> Vec<(String, String, String)> {
        self.entries
            .values()
            .map(|entry| {
                (
                    entry.tool.public_name.clone(),
                    entry.tool.upstream_id.clone(),
                    entry.tool.embedding_text.clone(),
                )
            })
            .collect()
    }

    pub fn tools(&self) -> impl Iterator<Item = &PublicTool> {
        self.entries.values().map(|entry| &entry.tool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use router_core::Transport;

    fn descriptor(id: &str, prefix: Option<&str>) -> UpstreamDescriptor {
        UpstreamDescriptor {
            id: id.to_string(),
            transport: Transport::Stdio,
            command: Some("mock".to_string()),
            args: vec![],
            endpoint: None,
            prefix: prefix.map(str::to_string),
            category_description: None,
            max_reconnect_attempts: 1,
        }
    }

    fn native(name: &str, upstream_id: &str, schema: Value) -> NativeTool {
        NativeTool {
            name: name.to_string(),
            description: format!("does {name}"),
            input_schema: schema,
            upstream_id: upstream_id.to_string(),
        }
    }

    #[test]
    fn public_name_joins_prefix_and_native_name_with_one_period() {
        let sessions = vec![(
            descriptor("docs", None),
            vec![native("search", "docs", json!({"type": "object"}))],
        )];
        let catalog = Catalog::build(&sessions).unwrap();
        assert!(catalog.describe("docs.search").is_some());
    }

    #[test]
    fn native_name_with_embedded_period_is_preserved() {
        let sessions = vec![(
            descriptor("docs", None),
            vec![native("v1.search", "docs", json!({"type": "object"}))],
        )];
        let catalog = Catalog::build(&sessions).unwrap();
        let (_, native_name) = catalog.lookup("docs.v1.search").unwrap();
        assert_eq!(native_name, "v1.search");
    }

    #[test]
    fn duplicate_public_name_is_a_catalog_conflict() {
        let sessions = vec![
            (
                descriptor("a", Some("x")),
                vec![native("one", "a", json!({"type": "object"}))],
            ),
            (
                descriptor("b", Some("x")),
                vec![native("one", "b", json!({"type": "object"}))],
            ),
        ];
        let err = Catalog::build(&sessions).unwrap_err();
        assert!(matches!(err, RouterError::CatalogConflict(_)));
    }

    #[test]
    fn empty_catalog_still_contains_search_tools() {
        let catalog = Catalog::build(&[]).unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.describe(SEARCH_TOOLS_NAME).is_some());
    }

    #[test]
    fn embedding_text_includes_required_params_and_category() {
        let schema = json!({
            "type": "object",
            "properties": { "query": { "type": "string" } },
            "required": ["query"]
        });
        let text = render_embedding_text("docs.search", "search the docs", &schema, Some("documentation"));
        assert_eq!(
            text,
            "docs.search\nsearch the docs\nparams: query:string\ncategory: documentation\n"
        );
    }

    #[test]
    fn embedding_text_omits_params_line_when_no_required_fields() {
        let schema = json!({"type": "object"});
        let text = render_embedding_text("docs.search", "search the docs", &schema, None);
        assert_eq!(text, "docs.search\nsearch the docs\n");
    }
}
