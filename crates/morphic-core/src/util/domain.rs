//! Human-friendly source names for URLs.

use url::Url;

/// Site name without subdomain or TLD.
///
/// `https://www.google.com` gives `google`, `https://docs.github.com` gives
/// `github`, `https://example.com` gives `example`. Invalid URLs give
/// `source`.
pub fn display_url_name(url: &str) -> String {
    let Some(host) = Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_string)) else {
        return "source".to_string();
    };
    let parts: Vec<&str> = host.split('.').collect();
    if parts.len() > 2 {
        parts[1..parts.len() - 1].join(".")
    } else {
        parts[0].to_string()
    }
}
