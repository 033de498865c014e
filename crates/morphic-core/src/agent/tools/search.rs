//! `search` tool: web search through the configured provider.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use morphic_types::error::ToolError;
use morphic_types::search::{SearchInput, SearchRequest, SearchResults, SearchType};

use super::{AgentTool, ToolContext, parse_input, schema_of, to_output};
use crate::search::SearchProvider;

/// Providers are always asked for at least this many results.
const MIN_RESULTS: usize = 10;

pub struct SearchTool {
    provider: Arc<dyn SearchProvider>,
    force_optimized: bool,
}

impl SearchTool {
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self {
            provider,
            force_optimized: false,
        }
    }

    /// Ignore the requested search type and always return content snippets.
    pub fn force_optimized(mut self, force: bool) -> Self {
        self.force_optimized = force;
        self
    }

    fn request(&self, input: SearchInput) -> SearchRequest {
        SearchRequest {
            query: input.query,
            max_results: input.max_results.max(MIN_RESULTS),
            search_depth: input.search_depth,
            include_domains: input.include_domains,
            exclude_domains: input.exclude_domains,
            content_types: input.content_types,
            search_type: if self.force_optimized {
                SearchType::Optimized
            } else {
                input.search_type
            },
        }
    }
}

/// Number each result from 1 so the model can cite `[n](#toolCallId)`.
fn with_citations(mut results: SearchResults, tool_call_id: &str) -> SearchResults {
    let map: BTreeMap<u32, _> = results
        .results
        .iter()
        .enumerate()
        .map(|(i, item)| (i as u32 + 1, item.clone()))
        .collect();
    results.citation_map = Some(map);
    results.tool_call_id = Some(tool_call_id.to_string());
    results
}

#[async_trait]
impl AgentTool for SearchTool {
    fn name(&self) -> &'static str {
        "search"
    }

    fn description(&self) -> &'static str {
        "Search the web for information"
    }

    fn input_schema(&self) -> Value {
        schema_of::<SearchInput>()
    }

    #[tracing::instrument(name = "tool.search", skip_all, fields(provider = self.provider.name(), tool_call_id = %ctx.tool_call_id))]
    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let input: SearchInput = parse_input(input)?;
        let request = self.request(input);

        let results = match self.provider.search(&request).await {
            Ok(mut results) => {
                results.number_of_results = results.results.len();
                results
            }
            Err(e) => {
                tracing::warn!(query = %request.query, error = %e, "search failed, returning no results");
                SearchResults::empty(&request.query)
            }
        };

        to_output(&with_citations(results, &ctx.tool_call_id))
    }
}
