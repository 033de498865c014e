//! `fetch` tool: retrieve a single page.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use morphic_types::error::ToolError;
use morphic_types::search::FetchInput;

use super::{AgentTool, ToolContext, parse_input, schema_of, to_output};
use crate::fetch::PageFetcher;

pub struct FetchTool {
    fetcher: Arc<dyn PageFetcher>,
}

impl FetchTool {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl AgentTool for FetchTool {
    fn name(&self) -> &'static str {
        "fetch"
    }

    fn description(&self) -> &'static str {
        "Fetch content from any URL. By default uses \"regular\" type which fetches the HTML \
         directly and extracts text without any external API. Use \"api\" type for PDFs or \
         JavaScript-heavy pages. The \"api\" type requires Jina or Tavily API keys."
    }

    fn input_schema(&self) -> Value {
        schema_of::<FetchInput>()
    }

    #[tracing::instrument(name = "tool.fetch", skip_all, fields(tool_call_id = %ctx.tool_call_id))]
    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let input: FetchInput = parse_input(input)?;
        tracing::debug!(url = %input.url, fetch_type = ?input.fetch_type, "fetching page");
        let results = self.fetcher.fetch(&input.url, input.fetch_type).await?;
        to_output(&results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use morphic_types::error::FetchError;
    use morphic_types::search::{FetchType, SearchResultItem, SearchResults};
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct StubFetcher {
        seen: Mutex<Vec<(String, FetchType)>>,
    }

    #[async_trait]
    impl PageFetcher for StubFetcher {
        async fn fetch(&self, url: &str, fetch_type: FetchType) -> Result<SearchResults, FetchError> {
            self.seen.lock().unwrap().push((url.to_string(), fetch_type));
            if url.contains("broken") {
                return Err(FetchError::Status(404));
            }
            Ok(SearchResults {
                results: vec![SearchResultItem {
                    title: "Example".into(),
                    url: url.to_string(),
                    content: "Body".into(),
                }],
                ..Default::default()
            })
        }
    }

    fn ctx() -> ToolContext {
        ToolContext {
            tool_call_id: "call_9".into(),
        }
    }

    #[tokio::test]
    async fn test_defaults_to_regular_fetch() {
        let fetcher = Arc::new(StubFetcher::default());
        let tool = FetchTool::new(fetcher.clone());
        let output = tool
            .execute(json!({"url": "https://example.com"}), &ctx())
            .await
            .unwrap();
        assert_eq!(output["results"][0]["title"], "Example");
        assert_eq!(output["query"], "");
        assert_eq!(fetcher.seen.lock().unwrap()[0].1, FetchType::Regular);
    }

    #[tokio::test]
    async fn test_api_type_is_forwarded() {
        let fetcher = Arc::new(StubFetcher::default());
        let tool = FetchTool::new(fetcher.clone());
        tool.execute(json!({"url": "https://example.com/a.pdf", "type": "api"}), &ctx())
            .await
            .unwrap();
        assert_eq!(fetcher.seen.lock().unwrap()[0].1, FetchType::Api);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_tool_error() {
        let tool = FetchTool::new(Arc::new(StubFetcher::default()));
        let err = tool
            .execute(json!({"url": "https://broken.example"}), &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Fetch(FetchError::Status(404))));
    }
}
