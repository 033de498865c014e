//! Web search port.
//!
//! Implementations (Tavily, Brave, Exa, SearXNG, Firecrawl) live in morphic-infra.

use async_trait::async_trait;

use morphic_types::error::SearchError;
use morphic_types::search::{SearchRequest, SearchResults};

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Short provider name for logs (e.g. "tavily").
    fn name(&self) -> &str;

    async fn search(&self, request: &SearchRequest) -> Result<SearchResults, SearchError>;
}
