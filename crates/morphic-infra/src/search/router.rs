//! Dispatch between the primary search backend and the dedicated ones.
//!
//! `type: "general"` searches go to the general provider (Brave) when one is
//! configured and to the primary provider otherwise. Requests that ask for
//! video content on the primary path get Serper video results merged in.

use std::sync::Arc;

use async_trait::async_trait;

use morphic_core::search::SearchProvider;
use morphic_types::error::SearchError;
use morphic_types::search::{ContentType, SearchRequest, SearchResults, SearchType};

use super::serper::SerperVideoSearch;

pub struct SearchRouter {
    primary: Arc<dyn SearchProvider>,
    general: Option<Arc<dyn SearchProvider>>,
    videos: Option<SerperVideoSearch>,
}

impl SearchRouter {
    pub fn new(primary: Arc<dyn SearchProvider>) -> Self {
        Self {
            primary,
            general: None,
            videos: None,
        }
    }

    pub fn with_general(mut self, provider: Arc<dyn SearchProvider>) -> Self {
        self.general = Some(provider);
        self
    }

    pub fn with_videos(mut self, videos: SerperVideoSearch) -> Self {
        self.videos = Some(videos);
        self
    }

    fn general_for(&self, request: &SearchRequest) -> Option<&Arc<dyn SearchProvider>> {
        match request.search_type {
            SearchType::General => self.general.as_ref(),
            SearchType::Optimized => None,
        }
    }
}

#[async_trait]
impl SearchProvider for SearchRouter {
    fn name(&self) -> &str {
        self.primary.name()
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchResults, SearchError> {
        if let Some(general) = self.general_for(request) {
            tracing::debug!(provider = general.name(), "routing general search");
            return general.search(request).await;
        }

        let Some(videos) = self
            .videos
            .as_ref()
            .filter(|_| request.content_types.contains(&ContentType::Video))
        else {
            return self.primary.search(request).await;
        };

        let (results, found) = tokio::join!(
            self.primary.search(request),
            videos.search_videos(&request.query, request.max_results)
        );
        let mut results = results?;
        match found {
            Ok(found) => results.videos = found,
            Err(e) => tracing::warn!(error = %e, "video search failed"),
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::test_request;
    use morphic_core::agent::tools::{AgentTool, SearchTool, ToolContext};
    use morphic_types::search::SearchResultItem;
    use secrecy::SecretString;
    use serde_json::json;
    use std::sync::Mutex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Answers with one result titled after itself and remembers the calls.
    struct Named {
        name: &'static str,
        calls: Mutex<u32>,
    }

    impl Named {
        fn new(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl SearchProvider for Named {
        fn name(&self) -> &str {
            self.name
        }

        async fn search(&self, request: &SearchRequest) -> Result<SearchResults, SearchError> {
            *self.calls.lock().unwrap() += 1;
            Ok(SearchResults {
                results: vec![SearchResultItem {
                    title: self.name.to_string(),
                    url: format!("https://{}.dev", self.name),
                    content: String::new(),
                }],
                query: request.query.clone(),
                ..Default::default()
            })
        }
    }

    fn general_request() -> SearchRequest {
        SearchRequest {
            search_type: SearchType::General,
            ..test_request("rust news")
        }
    }

    #[tokio::test]
    async fn test_general_search_goes_to_general_provider() {
        let primary = Named::new("tavily");
        let brave = Named::new("brave");
        let router = SearchRouter::new(primary.clone()).with_general(brave.clone());

        let results = router.search(&general_request()).await.unwrap();
        assert_eq!(results.results[0].title, "brave");

        let results = router.search(&test_request("rust")).await.unwrap();
        assert_eq!(results.results[0].title, "tavily");
        assert_eq!((primary.calls(), brave.calls()), (1, 1));
        assert_eq!(router.name(), "tavily");
    }

    #[tokio::test]
    async fn test_general_search_without_general_provider_uses_primary() {
        let router = SearchRouter::new(Named::new("exa"));
        let results = router.search(&general_request()).await.unwrap();
        assert_eq!(results.results[0].title, "exa");
    }

    #[tokio::test]
    async fn test_quick_mode_search_tool_stays_on_primary() {
        let primary = Named::new("tavily");
        let brave = Named::new("brave");
        let router = Arc::new(SearchRouter::new(primary.clone()).with_general(brave.clone()));
        let tool = SearchTool::new(router).force_optimized(true);

        let ctx = ToolContext {
            tool_call_id: "call_1".into(),
        };
        let output = tool
            .execute(json!({"query": "latest rust release", "type": "general"}), &ctx)
            .await
            .unwrap();

        assert_eq!(output["results"][0]["title"], "tavily");
        assert_eq!(brave.calls(), 0);
    }

    #[tokio::test]
    async fn test_video_content_merges_serper_results() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/videos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "videos": [{"title": "Rust in 100 seconds", "link": "https://www.youtube.com/watch?v=5C_HPTJg5ek", "position": 1}]
            })))
            .mount(&server)
            .await;
        let serper = SerperVideoSearch::new(SecretString::from("k")).with_base_url(server.uri());
        let router = SearchRouter::new(Named::new("tavily")).with_videos(serper);

        let mut request = test_request("rust");
        request.content_types = vec![ContentType::Web, ContentType::Video];
        let results = router.search(&request).await.unwrap();
        assert_eq!(results.results[0].title, "tavily");
        assert_eq!(results.videos[0].title, "Rust in 100 seconds");

        let results = router.search(&test_request("rust")).await.unwrap();
        assert!(results.videos.is_empty());
        assert_eq!(server.received_requests().await.map(|r| r.len()), Some(1));
    }

    #[tokio::test]
    async fn test_failed_video_search_keeps_primary_results() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let serper = SerperVideoSearch::new(SecretString::from("k")).with_base_url(server.uri());
        let router = SearchRouter::new(Named::new("tavily")).with_videos(serper);

        let mut request = test_request("rust");
        request.content_types = vec![ContentType::Video];
        let results = router.search(&request).await.unwrap();
        assert_eq!(results.results.len(), 1);
        assert!(results.videos.is_empty());
    }
}
