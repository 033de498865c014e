//! Serper video search (`google.serper.dev/videos`), the video backend when
//! no Brave key is configured.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use morphic_types::error::SearchError;
use morphic_types::search::VideoResult;

use super::{check_status, decode, http_client, request_error};

pub struct SerperVideoSearch {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

#[derive(Serialize)]
struct VideoQuery<'a> {
    q: &'a str,
}

#[derive(Deserialize)]
struct VideoResponse {
    #[serde(default)]
    videos: Vec<SerperVideo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SerperVideo {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
    image_url: Option<String>,
    duration: Option<String>,
    #[serde(default)]
    source: String,
    #[serde(default)]
    channel: String,
    #[serde(default)]
    date: String,
    #[serde(default)]
    position: u32,
}

impl From<SerperVideo> for VideoResult {
    fn from(v: SerperVideo) -> Self {
        VideoResult {
            title: v.title,
            link: v.link,
            snippet: v.snippet,
            image_url: v.image_url,
            duration: v.duration,
            source: v.source,
            channel: v.channel,
            date: v.date,
            position: v.position,
        }
    }
}

impl SerperVideoSearch {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            client: http_client(),
            api_key,
            base_url: "https://google.serper.dev".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn search_videos(&self, query: &str, limit: usize) -> Result<Vec<VideoResult>, SearchError> {
        let response = self
            .client
            .post(format!("{}/videos", self.base_url))
            .header("X-API-KEY", self.api_key.expose_secret())
            .json(&VideoQuery { q: query })
            .send()
            .await
            .map_err(request_error)?;
        let data: VideoResponse = decode(check_status(response).await?).await?;
        Ok(data.videos.into_iter().take(limit).map(VideoResult::from).collect())
    }
}
