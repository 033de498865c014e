//! Brave Search API: web, video and image verticals.
//!
//! Each requested content type is a separate endpoint; they are queried
//! concurrently and a failing vertical contributes nothing rather than
//! failing the whole search.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use morphic_core::search::SearchProvider;
use morphic_types::error::SearchError;
use morphic_types::search::{
    ContentType, SearchImage, SearchRequest, SearchResultItem, SearchResults, VideoResult,
};

use super::{check_status, decode, http_client, request_error};

const NO_TITLE: &str = "No title";
const NO_DESCRIPTION: &str = "No description available";

pub struct BraveSearch {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

#[derive(Deserialize, Default)]
struct WebResponse {
    #[serde(default)]
    web: Option<WebSection>,
}

#[derive(Deserialize, Default)]
struct WebSection {
    #[serde(default)]
    results: Vec<WebResult>,
}

#[derive(Deserialize)]
struct WebResult {
    title: Option<String>,
    description: Option<String>,
    url: String,
}

#[derive(Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Deserialize, Default)]
struct Thumbnail {
    src: Option<String>,
}

#[derive(Deserialize)]
struct VideoItem {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    #[serde(default)]
    thumbnail: Option<Thumbnail>,
    #[serde(default)]
    video: Option<VideoMeta>,
    duration: Option<String>,
    date: Option<String>,
    publisher: Option<String>,
}

#[derive(Deserialize)]
struct VideoMeta {
    duration: Option<String>,
}

#[derive(Deserialize)]
struct ImageItem {
    title: Option<String>,
    source: Option<String>,
    url: Option<String>,
    #[serde(default)]
    thumbnail: Option<Thumbnail>,
    #[serde(default)]
    properties: Option<ImageProperties>,
}

#[derive(Deserialize)]
struct ImageProperties {
    thumbnail: Option<String>,
}

impl BraveSearch {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            client: http_client(),
            api_key,
            base_url: "https://api.search.brave.com/res/v1".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get<T: DeserializeOwned>(&self, vertical: &str, query: &str, count: usize) -> Result<T, SearchError> {
        let response = self
            .client
            .get(format!("{}/{vertical}", self.base_url))
            .header(reqwest::header::ACCEPT, "application/json")
            .header("X-Subscription-Token", self.api_key.expose_secret())
            .query(&[("q", query.to_string()), ("count", count.to_string())])
            .send()
            .await
            .map_err(request_error)?;
        decode(check_status(response).await?).await
    }

    async fn web(&self, query: &str, count: usize) -> Result<Vec<SearchResultItem>, SearchError> {
        let data: WebResponse = self.get("web/search", query, count).await?;
        Ok(data
            .web
            .unwrap_or_default()
            .results
            .into_iter()
            .take(count)
            .map(|r| SearchResultItem {
                title: r.title.unwrap_or_else(|| NO_TITLE.to_string()),
                url: r.url,
                content: r.description.unwrap_or_else(|| NO_DESCRIPTION.to_string()),
            })
            .collect())
    }

    async fn videos(&self, query: &str, count: usize) -> Result<Vec<VideoResult>, SearchError> {
        let data: ListResponse<VideoItem> = self.get("videos/search", query, count).await?;
        Ok(data
            .results
            .into_iter()
            .take(count)
            .map(|v| {
                let publisher = v.publisher.unwrap_or_default();
                VideoResult {
                    title: v.title.unwrap_or_else(|| NO_TITLE.to_string()),
                    link: v.url.unwrap_or_default(),
                    snippet: v.description.unwrap_or_else(|| NO_DESCRIPTION.to_string()),
                    image_url: v.thumbnail.and_then(|t| t.src),
                    duration: v.video.and_then(|m| m.duration).or(v.duration),
                    source: publisher.clone(),
                    channel: publisher,
                    date: v.date.unwrap_or_default(),
                    position: 0,
                }
            })
            .collect())
    }

    async fn images(&self, query: &str, count: usize) -> Result<Vec<SearchImage>, SearchError> {
        let data: ListResponse<ImageItem> = self.get("images/search", query, count).await?;
        Ok(data
            .results
            .into_iter()
            .take(count)
            .filter_map(|i| {
                let url = i.url.or(i.source)?;
                Some(SearchImage {
                    url,
                    description: None,
                    title: i.title,
                    thumbnail_url: i.thumbnail.and_then(|t| t.src).or_else(|| i.properties.and_then(|p| p.thumbnail)),
                })
            })
            .collect())
    }
}

/// Log a failed vertical and substitute an empty list.
fn or_empty<T>(vertical: &str, result: Result<Vec<T>, SearchError>) -> Vec<T> {
    result.unwrap_or_else(|e| {
        tracing::warn!(vertical, error = %e, "brave search vertical failed");
        Vec::new()
    })
}

#[async_trait]
impl SearchProvider for BraveSearch {
    fn name(&self) -> &str {
        "brave"
    }

    #[tracing::instrument(level = "debug", skip_all, fields(query = %request.query))]
    async fn search(&self, request: &SearchRequest) -> Result<SearchResults, SearchError> {
        let wants = |t: ContentType| request.content_types.contains(&t);
        let query = request.query.as_str();
        let count = request.max_results;

        let web = async {
            if wants(ContentType::Web) {
                or_empty("web", self.web(query, count).await)
            } else {
                Vec::new()
            }
        };
        let videos = async {
            if wants(ContentType::Video) {
                or_empty("videos", self.videos(query, count).await)
            } else {
                Vec::new()
            }
        };
        let images = async {
            if wants(ContentType::Image) {
                or_empty("images", self.images(query, count).await)
            } else {
                Vec::new()
            }
        };

        let (results, videos, images) = tokio::join!(web, videos, images);

        Ok(SearchResults {
            number_of_results: results.len(),
            results,
            images,
            videos,
            query: request.query.clone(),
            ..Default::default()
        })
    }
}
