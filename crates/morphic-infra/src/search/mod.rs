//! Web search providers: Tavily, Brave, Exa, SearXNG and Firecrawl, plus
//! Serper for videos.
//!
//! [`create_search_provider`] picks the primary backend named by
//! `SEARCH_API` and wraps it in a [`SearchRouter`] that sends `general`
//! searches to Brave when `BRAVE_SEARCH_API_KEY` is set. A backend whose
//! credentials are missing still gets a provider, one that fails every
//! search with `MissingConfig`, so the search tool degrades to empty results
//! instead of the server refusing to start.

pub mod brave;
pub mod exa;
pub mod firecrawl;
pub mod router;
pub mod searxng;
pub mod serper;
pub mod tavily;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use morphic_core::search::SearchProvider;
use morphic_types::config::SearchSettings;
use morphic_types::error::SearchError;
use morphic_types::search::{SearchProviderKind, SearchRequest, SearchResults};

use crate::config::ProviderCredentials;

pub use brave::BraveSearch;
pub use exa::ExaSearch;
pub use firecrawl::FirecrawlSearch;
pub use router::SearchRouter;
pub use searxng::SearxngSearch;
pub use serper::SerperVideoSearch;
pub use tavily::TavilySearch;

const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(SEARCH_TIMEOUT)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default HTTP client");
            reqwest::Client::new()
        })
}

pub(crate) fn request_error(e: reqwest::Error) -> SearchError {
    SearchError::Request(e.to_string())
}

/// Pass a successful response through, or turn its status into `SearchError::Http`.
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SearchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(SearchError::Http {
        status: status.as_u16(),
        message,
    })
}

pub(crate) async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, SearchError> {
    response
        .json()
        .await
        .map_err(|e| SearchError::Deserialization(e.to_string()))
}

/// Stand-in for a provider whose credentials are not configured.
struct UnconfiguredSearch {
    name: &'static str,
    missing: &'static str,
}

#[async_trait]
impl SearchProvider for UnconfiguredSearch {
    fn name(&self) -> &str {
        self.name
    }

    async fn search(&self, _request: &SearchRequest) -> Result<SearchResults, SearchError> {
        Err(SearchError::MissingConfig(format!(
            "{} is not set in the environment variables",
            self.missing
        )))
    }
}

fn unconfigured(name: &'static str, missing: &'static str) -> Arc<dyn SearchProvider> {
    tracing::warn!(provider = name, missing, "search provider is not configured; searches will return no results");
    Arc::new(UnconfiguredSearch { name, missing })
}

/// Build the search provider for the search tool.
///
/// The primary backend is the one selected by `settings.provider`. Brave
/// serves `general` searches when its key is set and it is not already the
/// primary; Serper adds video results when `SERPER_API_KEY` is set.
pub fn create_search_provider(
    settings: &SearchSettings,
    credentials: &ProviderCredentials,
) -> Arc<dyn SearchProvider> {
    let mut router = SearchRouter::new(primary_provider(settings, credentials));

    if settings.provider != SearchProviderKind::Brave
        && let Some(key) = &credentials.brave_api_key
    {
        router = router.with_general(Arc::new(BraveSearch::new(key.clone())));
    }
    if let Some(key) = &credentials.serper_api_key {
        router = router.with_videos(SerperVideoSearch::new(key.clone()));
    }
    Arc::new(router)
}

fn primary_provider(settings: &SearchSettings, credentials: &ProviderCredentials) -> Arc<dyn SearchProvider> {
    match settings.provider {
        SearchProviderKind::Tavily => match &credentials.tavily_api_key {
            Some(key) => Arc::new(TavilySearch::new(key.clone())),
            None => unconfigured("tavily", "TAVILY_API_KEY"),
        },
        SearchProviderKind::Exa => match &credentials.exa_api_key {
            Some(key) => Arc::new(ExaSearch::new(key.clone())),
            None => unconfigured("exa", "EXA_API_KEY"),
        },
        SearchProviderKind::Brave => match &credentials.brave_api_key {
            Some(key) => Arc::new(BraveSearch::new(key.clone())),
            None => unconfigured("brave", "BRAVE_SEARCH_API_KEY"),
        },
        SearchProviderKind::Searxng => match &settings.searxng_api_url {
            Some(url) => Arc::new(SearxngSearch::new(url).with_default_depth(settings.searxng_default_depth)),
            None => unconfigured("searxng", "SEARXNG_API_URL"),
        },
        SearchProviderKind::Firecrawl => match &credentials.firecrawl_api_key {
            Some(key) => Arc::new(FirecrawlSearch::new(key.clone())),
            None => unconfigured("firecrawl", "FIRECRAWL_API_KEY"),
        },
    }
}

#[cfg(test)]
pub(crate) fn test_request(query: &str) -> SearchRequest {
    use morphic_types::search::{ContentType, SearchDepth, SearchType};

    SearchRequest {
        query: query.to_string(),
        max_results: 10,
        search_depth: SearchDepth::Basic,
        include_domains: Vec::new(),
        exclude_domains: Vec::new(),
        content_types: vec![ContentType::Web],
        search_type: SearchType::Optimized,
    }
}
