//! DuckDuckGo result scraping.
//!
//! The lite front-end is tried first because its markup is small and
//! stable. Only when it yields nothing is the heavier `/html/` front-end
//! parsed.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use reqwest::header::REFERER;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::error::Result;
use crate::scraper::{browser_client, clean_text};

pub const LITE_ENDPOINT: &str = "https://lite.duckduckgo.com/lite/";
pub const HTML_ENDPOINT: &str = "https://duckduckgo.com/html/";

static LITE_LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("a.result-link").expect("Failed to parse lite result selector")
});
static RESULT_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".result").expect("Failed to parse result selector")
});
static RESULT_LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".result__a").expect("Failed to parse result link selector")
});
static RESULT_SNIPPET_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".result__snippet").expect("Failed to parse snippet selector")
});
static TITLE_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*[-–|]\s*(LinkedIn|Xing|Crunchbase|Wikipedia|Jobs|Karriere|Careers)\s*$")
        .expect("Failed to compile title suffix pattern")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: String,
}

#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Vec<SearchResult>;
}

/// Removes directory-site suffixes such as `" - LinkedIn"` from a title.
pub fn clean_title(title: &str) -> String {
    let title = clean_text(title);
    TITLE_SUFFIX.replace(&title, "").trim().to_string()
}

/// Returns the real target of a DuckDuckGo `/l/?uddg=` redirect link, or
/// `href` unchanged when it is not one.
pub fn unwrap_redirect(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };

    let Ok(parsed) = Url::parse(&absolute) else {
        return href.to_string();
    };
    let is_redirect = parsed.host_str().is_some_and(|h| h.contains("duckduckgo.com"))
        && parsed.path().starts_with("/l/");
    if !is_redirect {
        return href.to_string();
    }

    parsed
        .query_pairs()
        .find(|(k, v)| k == "uddg" && !v.is_empty())
        .map(|(_, v)| v.into_owned())
        .unwrap_or_else(|| href.to_string())
}

fn element_text(el: &ElementRef) -> String {
    clean_text(&el.text().collect::<Vec<_>>().join(" "))
}

/// Results from the lite front-end (`a.result-link` anchors, no snippets).
pub fn parse_lite_results(html: &str, max_results: usize) -> Vec<SearchResult> {
    let document = Html::parse_document(html);
    let mut out = Vec::new();

    for anchor in document.select(&LITE_LINK_SELECTOR) {
        if out.len() >= max_results {
            break;
        }
        let href = unwrap_redirect(anchor.value().attr("href").unwrap_or("").trim());
        let title = clean_title(&element_text(&anchor));
        if !href.is_empty() && !title.is_empty() {
            out.push(SearchResult {
                title,
                url: href,
                snippet: String::new(),
            });
        }
    }
    out
}

/// Results from the `/html/` front-end (`.result` blocks with snippets).
pub fn parse_html_results(html: &str, max_results: usize) -> Vec<SearchResult> {
    let document = Html::parse_document(html);
    let mut out = Vec::new();

    for block in document.select(&RESULT_SELECTOR) {
        if out.len() >= max_results {
            break;
        }
        let Some(anchor) = block.select(&RESULT_LINK_SELECTOR).next() else {
            continue;
        };
        let href = unwrap_redirect(anchor.value().attr("href").unwrap_or("").trim());
        let title = clean_title(&element_text(&anchor));
        let snippet = block
            .select(&RESULT_SNIPPET_SELECTOR)
            .next()
            .map(|el| element_text(&el))
            .unwrap_or_default();

        if !href.is_empty() && !title.is_empty() {
            out.push(SearchResult { title, url: href, snippet });
        }
    }
    out
}

fn query_url(endpoint: &str, query: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
    format!("{}?q={}", endpoint, encoded)
}

pub struct DuckDuckGo {
    client: Client,
    lite_endpoint: String,
    html_endpoint: String,
}

impl DuckDuckGo {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self::with_client(browser_client(timeout)?))
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            lite_endpoint: LITE_ENDPOINT.to_string(),
            html_endpoint: HTML_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoints(mut self, lite: impl Into<String>, html: impl Into<String>) -> Self {
        self.lite_endpoint = lite.into();
        self.html_endpoint = html.into();
        self
    }

    /// Body of a result page, or an empty string on any failure.
    async fn request_html(&self, url: &str) -> String {
        let response = match self
            .client
            .get(url)
            .header(REFERER, "https://duckduckgo.com/")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                debug!(url, error = %e, "search request failed");
                return String::new();
            }
        };
        if response.status().as_u16() >= 400 {
            debug!(url, status = response.status().as_u16(), "search request rejected");
            return String::new();
        }
        response.text().await.unwrap_or_default()
    }
}

#[async_trait]
impl SearchBackend for DuckDuckGo {
    async fn search(&self, query: &str, max_results: usize) -> Vec<SearchResult> {
        let query = clean_text(query);
        if query.is_empty() {
            return Vec::new();
        }

        let html = self.request_html(&query_url(&self.lite_endpoint, &query)).await;
        let mut results = if html.is_empty() {
            Vec::new()
        } else {
            parse_lite_results(&html, max_results)
        };

        if results.is_empty() {
            let html = self.request_html(&query_url(&self.html_endpoint, &query)).await;
            if !html.is_empty() {
                results = parse_html_results(&html, max_results);
            }
        }

        info!(query = %query, count = results.len(), "search complete");
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwraps_encoded_target() {
        let href = "https://duckduckgo.com/l/?uddg=https%3A%2F%2Flinear.app%2Fabout%3Fa%3D1&rut=abc";
        assert_eq!(unwrap_redirect(href), "https://linear.app/about?a=1");
    }

    #[test]
    fn unwraps_protocol_relative_link() {
        let href = "//duckduckgo.com/l/?uddg=https%3A%2F%2Fnotion.so%2F";
        assert_eq!(unwrap_redirect(href), "https://notion.so/");
    }

    #[test]
    fn plain_links_pass_through() {
        assert_eq!(unwrap_redirect("https://acme.io/team"), "https://acme.io/team");
        assert_eq!(unwrap_redirect("https://duckduckgo.com/about"), "https://duckduckgo.com/about");
        assert_eq!(unwrap_redirect("not a url"), "not a url");
        assert_eq!(unwrap_redirect(""), "");
    }

    #[test]
    fn title_suffix_noise_is_removed() {
        assert_eq!(clean_title("Acme GmbH - LinkedIn"), "Acme GmbH");
        assert_eq!(clean_title("Acme  |  careers "), "Acme");
        assert_eq!(clean_title("Acme – Wikipedia"), "Acme");
        assert_eq!(clean_title("Jobs at Acme"), "Jobs at Acme");
    }

    #[test]
    fn parses_lite_page() {
        let html = r#"<table>
            <tr><td><a class="result-link" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Facme.io%2F">Acme - LinkedIn</a></td></tr>
            <tr><td><a class="result-link" href="https://beta.dev/">Beta</a></td></tr>
            <tr><td><a class="result-link" href="">Empty</a></td></tr>
            <tr><td><a class="result-link" href="https://gamma.dev/">Gamma</a></td></tr>
        </table>"#;
        let results = parse_lite_results(html, 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].url, "https://acme.io/");
        assert_eq!(results[0].title, "Acme");
        assert_eq!(results[1].url, "https://beta.dev/");
    }

    #[test]
    fn parses_html_page_with_snippets() {
        let html = r#"
            <div class="result">
              <a class="result__a" href="https://duckduckgo.com/l/?uddg=https%3A%2F%2Facme.io%2F">Acme   Robotics</a>
              <a class="result__snippet">Industrial   robots for logistics.</a>
            </div>
            <div class="result"><span>no link here</span></div>
            <div class="result">
              <a class="result__a" href="https://beta.dev/">Beta</a>
            </div>"#;
        let results = parse_html_results(html, 10);
        assert_eq!(
            results,
            vec![
                SearchResult {
                    title: "Acme Robotics".into(),
                    url: "https://acme.io/".into(),
                    snippet: "Industrial robots for logistics.".into(),
                },
                SearchResult {
                    title: "Beta".into(),
                    url: "https://beta.dev/".into(),
                    snippet: String::new(),
                },
            ]
        );
    }

    #[test]
    fn query_is_form_encoded() {
        assert_eq!(
            query_url(LITE_ENDPOINT, "Acme GmbH official website"),
            "https://lite.duckduckgo.com/lite/?q=Acme+GmbH+official+website"
        );
    }

    mod live {
        use super::*;
        use axum::{Router, http::StatusCode, response::Html, routing::get};
        use tokio::net::TcpListener;

        const HTML_RESULT_PAGE: &str = r#"<div class="result">
            <a class="result__a" href="https://acme.io/">Acme</a>
            <a class="result__snippet">x</a>
        </div>"#;

        async fn serve(app: Router) -> String {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
            format!("http://{}", addr)
        }

        fn backend(base: &str) -> DuckDuckGo {
            let client = browser_client(Duration::from_secs(5)).unwrap();
            DuckDuckGo::with_client(client)
                .with_endpoints(format!("{}/lite/", base), format!("{}/html/", base))
        }

        #[tokio::test]
        async fn empty_lite_page_falls_back_to_html() {
            let app = Router::new()
                .route("/lite/", get(|| async { Html("<html><body>No results.</body></html>") }))
                .route("/html/", get(|| async { Html(HTML_RESULT_PAGE) }));
            let base = serve(app).await;

            let results = backend(&base).search("acme", 5).await;
            assert_eq!(
                results,
                vec![SearchResult {
                    title: "Acme".into(),
                    url: "https://acme.io/".into(),
                    snippet: "x".into(),
                }]
            );
        }

        #[tokio::test]
        async fn rejected_lite_request_falls_back_to_html() {
            let app = Router::new()
                .route("/lite/", get(|| async { StatusCode::FORBIDDEN }))
                .route("/html/", get(|| async { Html(HTML_RESULT_PAGE) }));
            let base = serve(app).await;

            let results = backend(&base).search("acme", 5).await;
            assert_eq!(results.len(), 1);
            assert_eq!(results[0].url, "https://acme.io/");
        }

        #[tokio::test]
        async fn lite_results_skip_the_fallback() {
            let app = Router::new()
                .route(
                    "/lite/",
                    get(|| async { Html(r#"<a class="result-link" href="https://beta.dev/">Beta</a>"#) }),
                )
                .route("/html/", get(|| async { Html(HTML_RESULT_PAGE) }));
            let base = serve(app).await;

            let results = backend(&base).search("beta", 5).await;
            assert_eq!(results.len(), 1);
            assert_eq!(results[0].url, "https://beta.dev/");
        }

        #[tokio::test]
        async fn both_endpoints_failing_yields_nothing() {
            let app = Router::new()
                .route("/lite/", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
                .route("/html/", get(|| async { StatusCode::TOO_MANY_REQUESTS }));
            let base = serve(app).await;

            assert!(backend(&base).search("acme", 5).await.is_empty());
        }
    }
}
