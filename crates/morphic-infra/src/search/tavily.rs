//! Tavily search API.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use morphic_core::search::SearchProvider;
use morphic_types::error::SearchError;
use morphic_types::search::{SearchDepth, SearchImage, SearchRequest, SearchResultItem, SearchResults};

use super::{check_status, decode, http_client, request_error};

/// Tavily rejects queries shorter than this.
const MIN_QUERY_CHARS: usize = 5;
const MIN_RESULTS: usize = 5;

pub struct TavilySearch {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

#[derive(Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: String,
    max_results: usize,
    search_depth: SearchDepth,
    include_images: bool,
    include_image_descriptions: bool,
    include_answers: bool,
    include_domains: &'a [String],
    exclude_domains: &'a [String],
}

#[derive(Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    query: String,
    #[serde(default)]
    results: Vec<TavilyResult>,
    #[serde(default)]
    images: Vec<TavilyImage>,
}

#[derive(Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    url: String,
    #[serde(default)]
    content: String,
}

/// Image entries are objects when descriptions are requested, but older
/// responses carry bare URLs.
#[derive(Deserialize)]
#[serde(untagged)]
enum TavilyImage {
    Described {
        url: String,
        #[serde(default)]
        description: Option<String>,
    },
    Url(String),
}

impl TavilySearch {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            client: http_client(),
            api_key,
            base_url: "https://api.tavily.com".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Right-pad with spaces to Tavily's minimum query length.
fn pad_query(query: &str) -> String {
    let len = query.chars().count();
    if len < MIN_QUERY_CHARS {
        format!("{query}{}", " ".repeat(MIN_QUERY_CHARS - len))
    } else {
        query.to_string()
    }
}

fn sanitize_url(url: &str) -> String {
    url.replace(' ', "%20")
}

#[async_trait]
impl SearchProvider for TavilySearch {
    fn name(&self) -> &str {
        "tavily"
    }

    #[tracing::instrument(level = "debug", skip_all, fields(query = %request.query))]
    async fn search(&self, request: &SearchRequest) -> Result<SearchResults, SearchError> {
        let body = TavilyRequest {
            api_key: self.api_key.expose_secret(),
            query: pad_query(&request.query),
            max_results: request.max_results.max(MIN_RESULTS),
            search_depth: request.search_depth,
            include_images: true,
            include_image_descriptions: true,
            include_answers: true,
            include_domains: &request.include_domains,
            exclude_domains: &request.exclude_domains,
        };

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(request_error)?;
        let data: TavilyResponse = decode(check_status(response).await?).await?;

        let images = data
            .images
            .into_iter()
            .filter_map(|image| match image {
                TavilyImage::Described {
                    url,
                    description: Some(description),
                } if !description.is_empty() => Some(SearchImage {
                    url: sanitize_url(&url),
                    description: Some(description),
                    title: None,
                    thumbnail_url: None,
                }),
                _ => None,
            })
            .collect();

        let results: Vec<SearchResultItem> = data
            .results
            .into_iter()
            .map(|r| SearchResultItem {
                title: r.title,
                url: r.url,
                content: r.content,
            })
            .collect();

        Ok(SearchResults {
            number_of_results: results.len(),
            results,
            images,
            query: if data.query.is_empty() { request.query.clone() } else { data.query },
            ..Default::default()
        })
    }
}
