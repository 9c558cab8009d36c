//! Source URL checks performed before a build is requested.
//!
//! Parsing is done by the `url` crate; only the Wikipedia host rule is a
//! regex.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::error::{RagError, RagResult};

/// English Wikipedia hosts accepted as article sources.
static WIKIPEDIA_HOST_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(en\.)?wikipedia\.org$").expect("Invalid Wikipedia host regex"));

const WIKI_SEGMENT: &str = "wiki";

/// Parse an absolute http(s) URL that names a host.
fn parse_http_url(url: &str) -> RagResult<Url> {
    let parsed = Url::parse(url).map_err(|e| RagError::invalid_url(url, e.to_string()))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(RagError::invalid_url(
            url,
            format!("unsupported scheme '{}', expected http or https", parsed.scheme()),
        ));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(RagError::invalid_url(url, "missing host"));
    }
    Ok(parsed)
}

/// Require an absolute http(s) URL with a host.
///
/// Returns the trimmed URL on success.
pub fn validate_source_url(url: &str) -> RagResult<&str> {
    let url = url.trim();
    if url.is_empty() {
        return Err(RagError::invalid_url(url, "a URL is required"));
    }
    parse_http_url(url)?;
    Ok(url)
}

/// Title segment of a `/wiki/<title>` path on an English Wikipedia host,
/// still percent-encoded.
fn wiki_title_segment(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    if !WIKIPEDIA_HOST_REGEX.is_match(host)
        || url.port().is_some()
        || !url.username().is_empty()
        || url.password().is_some()
    {
        return None;
    }

    let mut segments = url.path_segments()?;
    if segments.next()? != WIKI_SEGMENT {
        return None;
    }
    let title = segments.next()?;
    (!title.is_empty()).then(|| title.to_string())
}

/// Whether `url` points at an English Wikipedia article.
///
/// The host must be exactly `wikipedia.org` or `en.wikipedia.org` with no
/// explicit non-default port or credentials, and the path must be
/// `/wiki/<title>` with a non-empty title.
pub fn is_wikipedia_article_url(url: &str) -> bool {
    parse_http_url(url.trim())
        .ok()
        .and_then(|parsed| wiki_title_segment(&parsed))
        .is_some()
}

/// Article title from an English Wikipedia `/wiki/<title>` URL,
/// percent-decoded, with underscores turned into spaces. Empty when the URL
/// has no such segment.
pub fn article_title_from_url(url: &str) -> String {
    let Some(raw) = parse_http_url(url.trim())
        .ok()
        .and_then(|parsed| wiki_title_segment(&parsed))
    else {
        return String::new();
    };

    let decoded = urlencoding::decode(&raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.clone());
    decoded.replace('_', " ")
}
