//! Exa neural search API (`searchAndContents` with highlights).

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use morphic_core::search::SearchProvider;
use morphic_types::error::SearchError;
use morphic_types::search::{SearchRequest, SearchResultItem, SearchResults};

use super::{check_status, decode, http_client, request_error};

pub struct ExaSearch {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExaRequest<'a> {
    query: &'a str,
    num_results: usize,
    #[serde(skip_serializing_if = "is_empty")]
    include_domains: &'a [String],
    #[serde(skip_serializing_if = "is_empty")]
    exclude_domains: &'a [String],
    contents: ExaContents,
}

fn is_empty(domains: &&[String]) -> bool {
    domains.is_empty()
}

#[derive(Serialize)]
struct ExaContents {
    text: bool,
    highlights: bool,
}

#[derive(Deserialize)]
struct ExaResponse {
    #[serde(default)]
    results: Vec<ExaResult>,
}

#[derive(Deserialize)]
struct ExaResult {
    #[serde(default)]
    title: Option<String>,
    url: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    highlights: Vec<String>,
}

impl ExaSearch {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            client: http_client(),
            api_key,
            base_url: "https://api.exa.ai".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl SearchProvider for ExaSearch {
    fn name(&self) -> &str {
        "exa"
    }

    #[tracing::instrument(level = "debug", skip_all, fields(query = %request.query))]
    async fn search(&self, request: &SearchRequest) -> Result<SearchResults, SearchError> {
        let body = ExaRequest {
            query: &request.query,
            num_results: request.max_results,
            include_domains: &request.include_domains,
            exclude_domains: &request.exclude_domains,
            contents: ExaContents {
                text: true,
                highlights: true,
            },
        };

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .header("x-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(request_error)?;
        let data: ExaResponse = decode(check_status(response).await?).await?;

        let results: Vec<SearchResultItem> = data
            .results
            .into_iter()
            .map(|r| {
                // Highlights are the relevant excerpts; fall back to full text.
                let content = if r.highlights.is_empty() {
                    r.text.unwrap_or_default()
                } else {
                    r.highlights.join(" ")
                };
                SearchResultItem {
                    title: r.title.unwrap_or_default(),
                    url: r.url,
                    content,
                }
            })
            .collect();

        Ok(SearchResults {
            number_of_results: results.len(),
            results,
            query: request.query.clone(),
            ..Default::default()
        })
    }
}
