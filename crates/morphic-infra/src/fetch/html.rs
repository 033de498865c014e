//! Direct HTML fetch with regex-based text extraction.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use morphic_types::error::FetchError;
use morphic_types::search::{SearchResultItem, SearchResults};

use super::{CONTENT_CHAR_LIMIT, TITLE_CHAR_LIMIT, truncate_chars, transport_error};

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = "Mozilla/5.0 (compatible; Morphic/1.0)";
const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<title[^>]*>([^<]*)</title>").expect("title regex is valid"));
static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("script regex is valid"));
static STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style[^>]*>.*?</style>").expect("style regex is valid"));
static IMG_ALT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<img[^>]+alt\s*=\s*["']([^"']+)["'][^>]*>"#).expect("img alt regex is valid")
});
static IMG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<img[^>]*>").expect("img regex is valid"));
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag regex is valid"));
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex is valid"));

/// Fetches pages directly, without any extraction service.
#[derive(Clone)]
pub struct HtmlFetcher {
    client: reqwest::Client,
}

impl HtmlFetcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "falling back to default HTTP client");
                reqwest::Client::new()
            });
        Self { client }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn fetch(&self, url: &url::Url) -> Result<SearchResults, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, ACCEPT)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.contains("text/html") && !content_type.contains("text/plain") {
            return Err(FetchError::UnsupportedContentType(content_type));
        }

        let html = response.text().await.map_err(transport_error)?;
        let page = extract_page(&html, url.host_str().unwrap_or_default());

        Ok(SearchResults {
            results: vec![SearchResultItem {
                title: page.title,
                url: url.to_string(),
                content: page.content,
            }],
            ..Default::default()
        })
    }
}

impl Default for HtmlFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, PartialEq)]
pub(crate) struct ExtractedPage {
    pub title: String,
    pub content: String,
}

/// Title and plain text of an HTML document.
///
/// The title falls back to `hostname` when the document has none.
pub(crate) fn extract_page(html: &str, hostname: &str) -> ExtractedPage {
    let raw_title = TITLE_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or(hostname);
    let title = truncate_chars(raw_title, TITLE_CHAR_LIMIT, "...");

    let text = SCRIPT_RE.replace_all(html, "");
    let text = STYLE_RE.replace_all(&text, "");
    let text = IMG_ALT_RE.replace_all(&text, " [IMAGE: $1] ");
    let text = IMG_RE.replace_all(&text, " [IMAGE] ");
    let text = TAG_RE.replace_all(&text, " ");
    let text = WHITESPACE_RE.replace_all(&text, " ");
    let content = truncate_chars(text.trim(), CONTENT_CHAR_LIMIT, "...[truncated]");

    ExtractedPage { title, content }
}
