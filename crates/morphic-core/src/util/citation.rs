//! Citation link resolution.
//!
//! The researcher cites search results as `[n](#toolCallId)` while
//! streaming. Once the search outputs are known, `[n](#)` placeholders can be
//! rewritten to point at the real result URL.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use url::Url;

use morphic_types::message::{MessagePart, ToolState, UiMessage};
use morphic_types::search::{SearchResultItem, SearchResults};

static CITATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\s*(\d+)\s*\]\(#\)").expect("citation regex is valid"));

const MAX_CITATION: u32 = 100;

pub type CitationMap = BTreeMap<u32, SearchResultItem>;

/// Merge the citation maps of all completed `search` tool parts.
///
/// Later searches win on number collisions. Returns `None` when no search
/// produced citations.
pub fn extract_citation_map(message: &UiMessage) -> Option<CitationMap> {
    let mut merged = CitationMap::new();
    for part in &message.parts {
        let MessagePart::Tool {
            tool_name,
            state: ToolState::OutputAvailable,
            output: Some(output),
            ..
        } = part
        else {
            continue;
        };
        if tool_name != "search" {
            continue;
        }
        if let Ok(SearchResults {
            citation_map: Some(map),
            ..
        }) = serde_json::from_value::<SearchResults>(output.clone())
        {
            merged.extend(map);
        }
    }
    (!merged.is_empty()).then_some(merged)
}

/// Replace `[n](#)` with `[n](url)` for every `n` in 1..=100 that has a
/// citation with a valid URL. Other matches are left untouched.
pub fn process_citations(content: &str, citations: Option<&CitationMap>) -> String {
    let Some(citations) = citations else {
        return content.to_string();
    };

    CITATION_RE
        .replace_all(content, |caps: &Captures<'_>| {
            let original = caps[0].to_string();
            let Ok(number) = caps[1].parse::<u32>() else {
                return original;
            };
            if !(1..=MAX_CITATION).contains(&number) {
                return original;
            }
            match citations.get(&number).and_then(|item| Url::parse(&item.url).ok()) {
                Some(url) => format!("[{}]({})", &caps[1], url),
                None => original,
            }
        })
        .into_owned()
}
