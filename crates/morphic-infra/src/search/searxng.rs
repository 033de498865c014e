//! Self-hosted SearXNG metasearch.
//!
//! Depth selects the engine set and filtering profile. Results carrying an
//! `img_src` are images; the rest are general results.

use async_trait::async_trait;
use serde::Deserialize;

use morphic_core::search::SearchProvider;
use morphic_types::error::SearchError;
use morphic_types::search::{SearchDepth, SearchImage, SearchRequest, SearchResultItem, SearchResults};

use super::{check_status, decode, http_client, request_error};

pub struct SearxngSearch {
    client: reqwest::Client,
    api_url: String,
    default_depth: Option<SearchDepth>,
}

#[derive(Deserialize)]
struct SearxngResponse {
    #[serde(default)]
    query: String,
    #[serde(default)]
    number_of_results: usize,
    #[serde(default)]
    results: Vec<SearxngResult>,
}

#[derive(Deserialize)]
struct SearxngResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
    img_src: Option<String>,
}

impl SearxngSearch {
    pub fn new(api_url: &str) -> Self {
        Self {
            client: http_client(),
            api_url: api_url.trim_end_matches('/').to_string(),
            default_depth: None,
        }
    }

    /// Depth forced for every request (`SEARXNG_DEFAULT_DEPTH`).
    pub fn with_default_depth(mut self, depth: Option<SearchDepth>) -> Self {
        self.default_depth = depth;
        self
    }

    fn query_params(&self, request: &SearchRequest) -> Vec<(&'static str, String)> {
        let depth = self.default_depth.unwrap_or(request.search_depth);
        let (time_range, safesearch, engines) = match depth {
            SearchDepth::Advanced => ("", "0", "google,bing,duckduckgo,wikipedia"),
            SearchDepth::Basic => ("year", "1", "google,bing"),
        };

        let mut params = vec![
            ("q", request.query.clone()),
            ("format", "json".to_string()),
            ("categories", "general,images".to_string()),
            ("time_range", time_range.to_string()),
            ("safesearch", safesearch.to_string()),
            ("engines", engines.to_string()),
        ];
        if !request.include_domains.is_empty() {
            params.push(("site", request.include_domains.join(",")));
        }
        params
    }

    fn absolute_image_url(&self, src: &str) -> String {
        if src.starts_with("http") {
            src.to_string()
        } else {
            format!("{}{}", self.api_url, src)
        }
    }
}

#[async_trait]
impl SearchProvider for SearxngSearch {
    fn name(&self) -> &str {
        "searxng"
    }

    #[tracing::instrument(level = "debug", skip_all, fields(query = %request.query))]
    async fn search(&self, request: &SearchRequest) -> Result<SearchResults, SearchError> {
        let response = self
            .client
            .get(format!("{}/search", self.api_url))
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&self.query_params(request))
            .send()
            .await
            .map_err(request_error)?;
        let data: SearxngResponse = decode(check_status(response).await?).await?;

        let (image_results, general_results): (Vec<SearxngResult>, Vec<SearxngResult>) = data
            .results
            .into_iter()
            .partition(|r| r.img_src.as_deref().is_some_and(|s| !s.is_empty()));

        let results = general_results
            .into_iter()
            .take(request.max_results)
            .map(|r| SearchResultItem {
                title: r.title,
                url: r.url,
                content: r.content,
            })
            .collect();

        let images = image_results
            .into_iter()
            .take(request.max_results)
            .filter_map(|r| r.img_src)
            .map(|src| SearchImage {
                url: self.absolute_image_url(&src),
                description: None,
                title: None,
                thumbnail_url: None,
            })
            .collect();

        Ok(SearchResults {
            results,
            images,
            query: if data.query.is_empty() { request.query.clone() } else { data.query },
            number_of_results: data.number_of_results,
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::test_request;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_depth_profiles() {
        let provider = SearxngSearch::new("http://searx.local/");
        let mut request = test_request("rust");
        request.include_domains = vec!["rust-lang.org".into(), "docs.rs".into()];

        let params = provider.query_params(&request);
        assert!(params.contains(&("engines", "google,bing".to_string())));
        assert!(params.contains(&("time_range", "year".to_string())));
        assert!(params.contains(&("site", "rust-lang.org,docs.rs".to_string())));

        let forced = SearxngSearch::new("http://searx.local").with_default_depth(Some(SearchDepth::Advanced));
        let params = forced.query_params(&request);
        assert!(params.contains(&("safesearch", "0".to_string())));
        assert!(params.contains(&("engines", "google,bing,duckduckgo,wikipedia".to_string())));
    }

    #[tokio::test]
    async fn test_splits_images_and_limits_results() {
        let server = MockServer::start().await;
        let mut results: Vec<serde_json::Value> = (0..12)
            .map(|i| serde_json::json!({"title": format!("r{i}"), "url": format!("https://r{i}.dev"), "content": "c"}))
            .collect();
        results.push(serde_json::json!({"title": "img", "url": "https://i.dev", "img_src": "/image_proxy?x=1"}));
        results.push(serde_json::json!({"title": "img2", "url": "https://j.dev", "img_src": "https://cdn.dev/a.png"}));

        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("format", "json"))
            .and(query_param("q", "rust"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "query": "rust",
                "number_of_results": 1200,
                "results": results
            })))
            .mount(&server)
            .await;

        let provider = SearxngSearch::new(&server.uri());
        let out = provider.search(&test_request("rust")).await.unwrap();

        assert_eq!(out.results.len(), 10);
        assert_eq!(out.number_of_results, 1200);
        assert_eq!(out.images.len(), 2);
        assert_eq!(out.images[0].url, format!("{}/image_proxy?x=1", server.uri()));
        assert_eq!(out.images[1].url, "https://cdn.dev/a.png");
    }
}
