//! Web utility endpoints: search and scrape.
//!
//! Thin glue, deliberately forgiving: both endpoints degrade to an empty
//! result with an `error` field instead of failing the request, since the
//! UI treats them as optional helpers.

use std::sync::OnceLock;

use axum::{
    extract::{Query, State},
    Json,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::state::AppState;

const SEARCH_URL: &str = "https://html.duckduckgo.com/html/";
const SCRAPE_MAX_CHARS: usize = 10_000;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub q: String,
    #[serde(default)]
    pub max_results: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchResult {
    pub title: String,
    pub href: String,
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Json<SearchResponse> {
    let limit = req.max_results.unwrap_or(8);
    match run_search(&state.http, &req.q, limit).await {
        Ok(results) => Json(SearchResponse {
            results,
            error: None,
        }),
        Err(err) => {
            warn!("search failed: {err}");
            Json(SearchResponse {
                results: Vec::new(),
                error: Some(err.to_string()),
            })
        }
    }
}

async fn run_search(
    client: &reqwest::Client,
    query: &str,
    limit: usize,
) -> anyhow::Result<Vec<SearchResult>> {
    let html = client
        .get(SEARCH_URL)
        .query(&[("q", query)])
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    Ok(parse_search_results(&html, limit))
}

fn result_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)<a[^>]*class="result__a"[^>]*href="([^"]+)"[^>]*>(.*?)</a>"#)
            .expect("static regex")
    })
}

fn result_snippet_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)class="result__snippet"[^>]*>(.*?)</a>"#).expect("static regex")
    })
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("static regex"))
}

fn parse_search_results(html: &str, limit: usize) -> Vec<SearchResult> {
    let snippets: Vec<String> = result_snippet_re()
        .captures_iter(html)
        .map(|cap| clean_fragment(&cap[1]))
        .collect();

    result_link_re()
        .captures_iter(html)
        .take(limit)
        .enumerate()
        .map(|(idx, cap)| SearchResult {
            href: resolve_href(&cap[1]),
            title: clean_fragment(&cap[2]),
            body: snippets.get(idx).cloned().unwrap_or_default(),
        })
        .collect()
}

/// DuckDuckGo wraps result links in a redirect carrying the target in the
/// `uddg` query parameter; unwrap it so callers get the real URL.
fn resolve_href(raw: &str) -> String {
    let href = decode_entities(raw);
    if let Some(pos) = href.find("uddg=") {
        let encoded = &href[pos + 5..];
        let encoded = encoded.split('&').next().unwrap_or(encoded);
        if let Ok(decoded) = urlencoding::decode(encoded) {
            return decoded.into_owned();
        }
    }
    href
}

fn clean_fragment(fragment: &str) -> String {
    let stripped = tag_re().replace_all(fragment, "");
    decode_entities(stripped.trim())
}

fn decode_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
}

#[derive(Debug, Deserialize)]
pub struct ScrapeQuery {
    pub url: String,
    /// Accepted for wire compatibility; this build always uses the plain
    /// HTTP fetcher.
    #[serde(default)]
    #[allow(dead_code)]
    pub use_browser: bool,
}

#[derive(Debug, Serialize)]
pub struct ScrapeResponse {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn scrape(
    State(state): State<AppState>,
    Query(query): Query<ScrapeQuery>,
) -> Json<ScrapeResponse> {
    match fetch_page_text(&state.http, &query.url).await {
        Ok(content) => Json(ScrapeResponse {
            content,
            error: None,
        }),
        Err(err) => {
            warn!("scrape of {} failed: {err}", query.url);
            Json(ScrapeResponse {
                content: String::new(),
                error: Some(err.to_string()),
            })
        }
    }
}

async fn fetch_page_text(client: &reqwest::Client, url: &str) -> anyhow::Result<String> {
    let html = client.get(url).send().await?.text().await?;
    let text = html2text::from_read(html.as_bytes(), 120);
    Ok(truncate_chars(&text, SCRAPE_MAX_CHARS).to_string())
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"
        <div class="result">
          <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fpage&amp;rut=abc">First <b>Result</b></a>
          <a class="result__snippet" href="#">A short &amp; useful snippet</a>
        </div>
        <div class="result">
          <a rel="nofollow" class="result__a" href="https://plain.example/doc">Second</a>
          <a class="result__snippet" href="#">Another snippet</a>
        </div>
    "##;

    #[test]
    fn parses_titles_links_and_snippets() {
        let results = parse_search_results(SAMPLE, 8);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "First Result");
        assert_eq!(results[0].href, "https://example.com/page");
        assert_eq!(results[0].body, "A short & useful snippet");
        assert_eq!(results[1].href, "https://plain.example/doc");
    }

    #[test]
    fn respects_the_result_limit() {
        let results = parse_search_results(SAMPLE, 1);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 10), "hi");
    }
}
