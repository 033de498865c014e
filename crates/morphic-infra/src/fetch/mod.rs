//! Page fetchers behind the `fetch` tool.
//!
//! [`WebFetcher`] routes `regular` fetches to [`html::HtmlFetcher`] and
//! `api` fetches to the Jina reader when `JINA_API_KEY` is set, otherwise
//! to Tavily extract.

pub mod html;
pub mod jina;
pub mod tavily_extract;

use std::time::Duration;

use async_trait::async_trait;

use morphic_core::fetch::PageFetcher;
use morphic_types::error::FetchError;
use morphic_types::search::{FetchType, SearchResults};

use crate::config::ProviderCredentials;

use self::html::HtmlFetcher;
use self::jina::JinaReader;
use self::tavily_extract::TavilyExtract;

pub(crate) const CONTENT_CHAR_LIMIT: usize = 10_000;
pub(crate) const TITLE_CHAR_LIMIT: usize = 100;

const API_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) fn api_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(API_TIMEOUT)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default HTTP client");
            reqwest::Client::new()
        })
}

pub(crate) fn transport_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Request(e.to_string())
    }
}

/// The first `limit` chars of `s`.
pub(crate) fn take_chars(s: &str, limit: usize) -> String {
    s.chars().take(limit).collect()
}

/// `s` cut to `limit` chars with `suffix` appended, or `s` unchanged when it fits.
pub(crate) fn truncate_chars(s: &str, limit: usize, suffix: &str) -> String {
    if s.chars().count() > limit {
        format!("{}{suffix}", take_chars(s, limit))
    } else {
        s.to_string()
    }
}

/// Only absolute http(s) URLs are fetched.
fn parse_url(raw: &str) -> Result<url::Url, FetchError> {
    let url = url::Url::parse(raw.trim()).map_err(|e| FetchError::InvalidUrl(format!("{raw}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(FetchError::InvalidUrl(format!("unsupported scheme '{other}'"))),
    }
}

enum ExtractionApi {
    Jina(JinaReader),
    Tavily(TavilyExtract),
    None,
}

pub struct WebFetcher {
    html: HtmlFetcher,
    api: ExtractionApi,
}

impl WebFetcher {
    pub fn new(credentials: &ProviderCredentials) -> Self {
        let api = match (&credentials.jina_api_key, &credentials.tavily_api_key) {
            (Some(key), _) => ExtractionApi::Jina(JinaReader::new(key.clone())),
            (None, Some(key)) => ExtractionApi::Tavily(TavilyExtract::new(key.clone())),
            (None, None) => ExtractionApi::None,
        };
        Self {
            html: HtmlFetcher::new(),
            api,
        }
    }
}

#[async_trait]
impl PageFetcher for WebFetcher {
    async fn fetch(&self, url: &str, fetch_type: FetchType) -> Result<SearchResults, FetchError> {
        let parsed = parse_url(url)?;
        let result = match (fetch_type, &self.api) {
            (FetchType::Regular, _) => self.html.fetch(&parsed).await,
            (FetchType::Api, ExtractionApi::Jina(reader)) => reader.fetch(parsed.as_str()).await,
            (FetchType::Api, ExtractionApi::Tavily(extract)) => extract.fetch(parsed.as_str()).await,
            (FetchType::Api, ExtractionApi::None) => Err(FetchError::Request(
                "api fetch requires JINA_API_KEY or TAVILY_API_KEY".to_string(),
            )),
        };

        if let Err(e) = &result {
            tracing::warn!(url, ?fetch_type, error = %e, "page fetch failed");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    #[test]
    fn test_parse_url_rejects_non_http() {
        assert!(parse_url("https://example.com/a").is_ok());
        assert!(matches!(parse_url("ftp://example.com"), Err(FetchError::InvalidUrl(_))));
        assert!(matches!(parse_url("not a url"), Err(FetchError::InvalidUrl(_))));
    }

    #[test]
    fn test_truncate_chars_counts_chars() {
        assert_eq!(truncate_chars("héllo", 3, "..."), "hél...");
        assert_eq!(truncate_chars("hi", 3, "..."), "hi");
    }

    #[test]
    fn test_jina_preferred_over_tavily() {
        let credentials = ProviderCredentials {
            jina_api_key: Some(SecretString::from("j")),
            tavily_api_key: Some(SecretString::from("t")),
            ..Default::default()
        };
        assert!(matches!(WebFetcher::new(&credentials).api, ExtractionApi::Jina(_)));

        let credentials = ProviderCredentials {
            tavily_api_key: Some(SecretString::from("t")),
            ..Default::default()
        };
        assert!(matches!(WebFetcher::new(&credentials).api, ExtractionApi::Tavily(_)));
    }

    #[tokio::test]
    async fn test_api_fetch_without_keys_fails() {
        let fetcher = WebFetcher::new(&ProviderCredentials::default());
        let err = fetcher.fetch("https://example.com", FetchType::Api).await.unwrap_err();
        assert!(matches!(err, FetchError::Request(msg) if msg.contains("JINA_API_KEY")));
    }
}
