//! Jina reader (`https://r.jina.ai/{url}`): server-side rendering and
//! extraction for PDFs and JavaScript-heavy pages.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use morphic_types::error::FetchError;
use morphic_types::search::{SearchResultItem, SearchResults};

use super::{CONTENT_CHAR_LIMIT, api_client, take_chars, transport_error};

pub struct JinaReader {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

#[derive(Deserialize)]
struct JinaResponse {
    data: Option<JinaPage>,
}

#[derive(Deserialize)]
struct JinaPage {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    url: String,
}

impl JinaReader {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            client: api_client(),
            api_key,
            base_url: "https://r.jina.ai".to_string(),
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
            .get(format!("{}/{url}", self.base_url))
            .header(reqwest::header::ACCEPT, "application/json")
            .header("X-With-Generated-Alt", "true")
            .bearer_auth(self.api_key.expose_secret())
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body: JinaResponse = response.json().await.map_err(transport_error)?;
        let page = body
            .data
            .ok_or_else(|| FetchError::Request("no data returned from Jina reader".to_string()))?;

        Ok(SearchResults {
            results: vec![SearchResultItem {
                title: page.title,
                content: take_chars(&page.content, CONTENT_CHAR_LIMIT),
                url: if page.url.is_empty() { url.to_string() } else { page.url },
            }],
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_reader_maps_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/https://example.com/paper.pdf"))
            .and(header("authorization", "Bearer jina-test"))
            .and(header("x-with-generated-alt", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 200,
                "data": {"title": "Paper", "content": "x".repeat(12_000), "url": "https://example.com/paper.pdf"}
            })))
            .mount(&server)
            .await;

        let reader = JinaReader::new(SecretString::from("jina-test")).with_base_url(server.uri());
        let results = reader.fetch("https://example.com/paper.pdf").await.unwrap();
        assert_eq!(results.results[0].title, "Paper");
        assert_eq!(results.results[0].content.len(), 10_000);
    }

    #[tokio::test]
    async fn test_missing_data_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"code": 200})))
            .mount(&server)
            .await;

        let reader = JinaReader::new(SecretString::from("k")).with_base_url(server.uri());
        assert!(matches!(
            reader.fetch("https://example.com").await,
            Err(FetchError::Request(_))
        ));
    }
}
