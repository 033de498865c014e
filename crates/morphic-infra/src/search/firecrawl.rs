//! Firecrawl search API (v2).
//!
//! One call covers several sources: web and images always, news as well for
//! advanced searches. Web hits are scraped to markdown, which becomes the
//! result content. Firecrawl has no domain filters, so include/exclude
//! domains are ignored.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use morphic_core::search::SearchProvider;
use morphic_types::error::SearchError;
use morphic_types::search::{SearchDepth, SearchImage, SearchRequest, SearchResultItem, SearchResults};

use super::{check_status, decode, http_client, request_error};

/// Scraped markdown is cut to this many chars.
const MARKDOWN_CHAR_LIMIT: usize = 1000;

pub struct FirecrawlSearch {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FirecrawlRequest<'a> {
    query: &'a str,
    sources: Vec<&'static str>,
    limit: usize,
    scrape_options: ScrapeOptions,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScrapeOptions {
    formats: [&'static str; 1],
    proxy: &'static str,
    block_ads: bool,
}

#[derive(Deserialize)]
struct FirecrawlResponse {
    #[serde(default)]
    data: FirecrawlData,
}

#[derive(Deserialize, Default)]
struct FirecrawlData {
    #[serde(default)]
    web: Vec<WebHit>,
    #[serde(default)]
    news: Vec<NewsHit>,
    #[serde(default)]
    images: Vec<ImageHit>,
}

#[derive(Deserialize)]
struct WebHit {
    url: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    markdown: Option<String>,
}

#[derive(Deserialize)]
struct NewsHit {
    url: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageHit {
    image_url: String,
    #[serde(default)]
    title: Option<String>,
}

impl FirecrawlSearch {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            client: http_client(),
            api_key,
            base_url: "https://api.firecrawl.dev/v2".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

fn sources_for(depth: SearchDepth) -> Vec<&'static str> {
    match depth {
        SearchDepth::Basic => vec!["web", "images"],
        SearchDepth::Advanced => vec!["web", "news", "images"],
    }
}

impl From<WebHit> for SearchResultItem {
    fn from(hit: WebHit) -> Self {
        let markdown: String = hit.markdown.unwrap_or_default().chars().take(MARKDOWN_CHAR_LIMIT).collect();
        let content = if markdown.is_empty() {
            hit.description.unwrap_or_default()
        } else {
            markdown
        };
        SearchResultItem {
            title: hit.title.unwrap_or_default(),
            url: hit.url,
            content,
        }
    }
}

impl From<NewsHit> for SearchResultItem {
    fn from(hit: NewsHit) -> Self {
        SearchResultItem {
            title: hit.title.unwrap_or_default(),
            url: hit.url,
            content: hit.snippet.unwrap_or_default(),
        }
    }
}

#[async_trait]
impl SearchProvider for FirecrawlSearch {
    fn name(&self) -> &str {
        "firecrawl"
    }

    #[tracing::instrument(level = "debug", skip_all, fields(query = %request.query))]
    async fn search(&self, request: &SearchRequest) -> Result<SearchResults, SearchError> {
        let body = FirecrawlRequest {
            query: &request.query,
            sources: sources_for(request.search_depth),
            limit: request.max_results,
            scrape_options: ScrapeOptions {
                formats: ["markdown"],
                proxy: "auto",
                block_ads: true,
            },
        };

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(request_error)?;
        let data = decode::<FirecrawlResponse>(check_status(response).await?).await?.data;

        let results: Vec<SearchResultItem> = data
            .web
            .into_iter()
            .map(SearchResultItem::from)
            .chain(data.news.into_iter().map(SearchResultItem::from))
            .collect();

        let images = data
            .images
            .into_iter()
            .map(|image| SearchImage {
                url: image.image_url,
                description: Some(image.title.unwrap_or_default()),
                title: None,
                thumbnail_url: None,
            })
            .collect();

        Ok(SearchResults {
            number_of_results: results.len(),
            results,
            images,
            query: request.query.clone(),
            ..Default::default()
        })
    }
}
