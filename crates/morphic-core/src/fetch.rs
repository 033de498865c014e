//! Page fetch port used by the `fetch` tool.

use async_trait::async_trait;

use morphic_types::error::FetchError;
use morphic_types::search::{FetchType, SearchResults};

/// Retrieves one page and returns it as a single-result `SearchResults`.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, fetch_type: FetchType) -> Result<SearchResults, FetchError>;
}
