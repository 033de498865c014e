//! Web search and page fetch types: provider results and tool inputs.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchDepth {
    #[default]
    Basic,
    Advanced,
}

impl fmt::Display for SearchDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchDepth::Basic => write!(f, "basic"),
            SearchDepth::Advanced => write!(f, "advanced"),
        }
    }
}

impl FromStr for SearchDepth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "basic" => Ok(SearchDepth::Basic),
            "advanced" => Ok(SearchDepth::Advanced),
            other => Err(format!("invalid search depth: '{other}'")),
        }
    }
}

/// `optimized` returns content snippets ready for answering; `general`
/// returns links that need a follow-up fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    #[default]
    Optimized,
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Web,
    Video,
    Image,
}

/// Which backend serves web searches (`SEARCH_API`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchProviderKind {
    #[default]
    Tavily,
    Exa,
    Searxng,
    Brave,
    Firecrawl,
}

impl fmt::Display for SearchProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchProviderKind::Tavily => write!(f, "tavily"),
            SearchProviderKind::Exa => write!(f, "exa"),
            SearchProviderKind::Searxng => write!(f, "searxng"),
            SearchProviderKind::Brave => write!(f, "brave"),
            SearchProviderKind::Firecrawl => write!(f, "firecrawl"),
        }
    }
}

impl FromStr for SearchProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tavily" => Ok(SearchProviderKind::Tavily),
            "exa" => Ok(SearchProviderKind::Exa),
            "searxng" => Ok(SearchProviderKind::Searxng),
            "brave" => Ok(SearchProviderKind::Brave),
            "firecrawl" => Ok(SearchProviderKind::Firecrawl),
            other => Err(format!("invalid search provider: '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultItem {
    pub title: String,
    pub url: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchImage {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    pub source: String,
    pub channel: String,
    pub date: String,
    pub position: u32,
}

/// Output of the search and fetch tools.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub results: Vec<SearchResultItem>,
    #[serde(default)]
    pub images: Vec<SearchImage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub videos: Vec<VideoResult>,
    pub query: String,
    #[serde(default)]
    pub number_of_results: usize,
    /// 1-based citation number to result, used to resolve `[n](#id)` links.
    #[serde(default, rename = "citationMap", skip_serializing_if = "Option::is_none")]
    pub citation_map: Option<BTreeMap<u32, SearchResultItem>>,
    #[serde(default, rename = "toolCallId", skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl SearchResults {
    pub fn empty(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }
}

/// Normalized request handed to a search provider.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub max_results: usize,
    pub search_depth: SearchDepth,
    pub include_domains: Vec<String>,
    pub exclude_domains: Vec<String>,
    pub content_types: Vec<ContentType>,
    pub search_type: SearchType,
}

fn default_max_results() -> usize {
    20
}

fn default_content_types() -> Vec<ContentType> {
    vec![ContentType::Web]
}

/// Input of the `search` tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchInput {
    /// The query to search for
    pub query: String,
    /// "optimized" returns content snippets; "general" returns links for follow-up fetches
    #[serde(default, rename = "type")]
    pub search_type: SearchType,
    /// Kinds of results to return
    #[serde(default = "default_content_types")]
    pub content_types: Vec<ContentType>,
    /// The maximum number of results to return (at least 10)
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// The depth of the search
    #[serde(default)]
    pub search_depth: SearchDepth,
    /// Only return results from these domains
    #[serde(default)]
    pub include_domains: Vec<String>,
    /// Never return results from these domains
    #[serde(default)]
    pub exclude_domains: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum FetchType {
    /// Direct HTML fetch, no external API.
    #[default]
    Regular,
    /// Extraction API (Jina reader or Tavily extract) for PDFs and JS-heavy pages.
    Api,
}

/// Input of the `fetch` tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FetchInput {
    /// The URL to retrieve content from
    pub url: String,
    /// "regular" (default) fetches HTML directly; "api" uses an extraction service for PDFs and complex pages
    #[serde(default, rename = "type")]
    pub fetch_type: FetchType,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QuestionOption {
    /// Option identifier (always in English)
    pub value: String,
    /// Display text for the option
    pub label: String,
}

/// Input of the client-side `askQuestion` tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionInput {
    /// The main question to ask the user
    pub question: String,
    /// List of predefined options
    pub options: Vec<QuestionOption>,
    /// Whether to allow free-form text input
    pub allows_input: bool,
    /// Label for free-form input field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_label: Option<String>,
    /// Placeholder text for input field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_placeholder: Option<String>,
}
