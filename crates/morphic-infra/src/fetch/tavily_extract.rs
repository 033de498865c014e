//! Tavily extract API, the fallback extraction service when Jina is not
//! configured.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use morphic_types::error::FetchError;
use morphic_types::search::{SearchResultItem, SearchResults};

use super::{CONTENT_CHAR_LIMIT, TITLE_CHAR_LIMIT, api_client, take_chars, transport_error};

pub struct TavilyExtract {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

#[derive(Serialize)]
struct ExtractRequest<'a> {
    api_key: &'a str,
    urls: [&'a str; 1],
}

#[derive(Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    results: Vec<ExtractResult>,
}

#[derive(Deserialize)]
struct ExtractResult {
    #[serde(default)]
    url: String,
    #[serde(default)]
    raw_content: String,
}

impl TavilyExtract {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            client: api_client(),
            api_key,
            base_url: "https://api.tavily.com".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn fetch(&self, url: &str) -> Result<SearchResults, FetchError> {
        let response = self
            .client
            .post(format!("{}/extract", self.base_url))
            .json(&ExtractRequest {
                api_key: self.api_key.expose_secret(),
                urls: [url],
            })
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body: ExtractResponse = response.json().await.map_err(transport_error)?;
        let result = body
            .results
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::Request("no results returned from Tavily extract".to_string()))?;

        let content = take_chars(&result.raw_content, CONTENT_CHAR_LIMIT);
        Ok(SearchResults {
            results: vec![SearchResultItem {
                // Extract returns no title; the opening text stands in.
                title: take_chars(&content, TITLE_CHAR_LIMIT),
                url: if result.url.is_empty() { url.to_string() } else { result.url },
                content,
            }],
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_extract_uses_content_prefix_as_title() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/extract"))
            .and(body_json(serde_json::json!({
                "api_key": "tvly-test",
                "urls": ["https://example.com/a"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{"url": "https://example.com/a", "raw_content": "a".repeat(300)}],
                "failed_results": []
            })))
            .mount(&server)
            .await;

        let extract = TavilyExtract::new(SecretString::from("tvly-test")).with_base_url(server.uri());
        let results = extract.fetch("https://example.com/a").await.unwrap();
        assert_eq!(results.results[0].title.len(), 100);
        assert_eq!(results.results[0].content.len(), 300);
    }

    #[tokio::test]
    async fn test_empty_results_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"results": []})))
            .mount(&server)
            .await;

        let extract = TavilyExtract::new(SecretString::from("k")).with_base_url(server.uri());
        assert!(extract.fetch("https://example.com").await.is_err());
    }
}
