use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::header::{ACCEPT_LANGUAGE, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, ClientBuilder};
use scraper::{Html, Node, Selector};
use tracing::{debug, warn};

use crate::cache::HtmlCache;
use crate::error::{AppError, Result};

pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";
pub const ACCEPT_LANGUAGE_VALUE: &str = "de-DE,de;q=0.9,en;q=0.8";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(12);

static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("title").expect("Failed to parse title selector")
});

const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript"];

/// Why a page could not be retrieved. Callers treat all of these as "no page".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("empty url")]
    EmptyUrl,

    #[error("http status {0}")]
    Status(u16),

    #[error("not html: {0}")]
    NotHtml(String),

    #[error("network error: {0}")]
    Network(String),
}

pub type FetchResult = std::result::Result<String, FetchError>;

/// Source of page HTML for the orchestrator.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> FetchResult;
}

/// Builds a client that identifies as a desktop browser.
pub fn browser_client(timeout: Duration) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_VALUE));

    ClientBuilder::new()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(5))
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| AppError::ConfigError(format!("Failed to build HTTP client: {}", e)))
}

/// HTTP fetcher backed by an on-disk HTML cache.
///
/// A cached body is returned as-is, however old it is.
pub struct HttpFetcher {
    client: Client,
    cache: Option<HtmlCache>,
}

impl HttpFetcher {
    pub fn new(client: Client, cache: Option<HtmlCache>) -> Self {
        Self { client, cache }
    }

    async fn fetch_remote(&self, url: &str) -> FetchResult {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(FetchError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();
        if !content_type.contains("text/html") {
            return Err(FetchError::NotHtml(content_type));
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchResult {
        if url.trim().is_empty() {
            return Err(FetchError::EmptyUrl);
        }

        if let Some(cache) = &self.cache {
            if let Some(html) = cache.get(url) {
                debug!(url, "html cache hit");
                return Ok(html);
            }
        }

        let html = self.fetch_remote(url).await?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.set(url, &html) {
                warn!(url, error = %e, "failed to write html cache");
            }
        }

        Ok(html)
    }
}

/// Collapses every whitespace run to one space and trims.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extracts `(title, visible_text)` from an HTML document. Text inside
/// `script`, `style` and `noscript` is dropped.
pub fn extract(html: &str) -> (String, String) {
    let document = Html::parse_document(html);

    let title = document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|el| el.text().collect::<Vec<_>>().join(" "))
        .map(|t| clean_text(&t))
        .unwrap_or_default();

    let mut pieces: Vec<&str> = Vec::new();
    for node in document.root_element().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|el| HIDDEN_TAGS.contains(&el.name()))
        });
        if hidden {
            continue;
        }
        let piece = text.trim();
        if !piece.is_empty() {
            pieces.push(piece);
        }
    }

    (title, clean_text(&pieces.join(" ")))
}

/// First `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
