use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use company_scout::links::{LinkRules, select_internal_links};
use company_scout::pages::{PageFetchOptions, fetch_company_pages};
use company_scout::scraper::{FetchError, FetchResult, PageFetcher};

const HOMEPAGE: &str = r#"<html><head><title>Acme</title></head><body>
    <a href="/leadership">Leadership</a>
    <a href="/team">Team</a>
    <a href="/about">About</a>
    <a href="/contact">Contact</a>
    <a href="/blog">Blog</a>
    <a href="https://partner.example/about">Partner</a>
</body></html>"#;

/// Serves canned pages after a per-URL delay and records every request.
struct SlowFetcher {
    pages: HashMap<String, (Duration, String)>,
    requested: Mutex<Vec<String>>,
}

impl SlowFetcher {
    fn new() -> Self {
        Self {
            pages: HashMap::new(),
            requested: Mutex::new(Vec::new()),
        }
    }

    fn page(mut self, url: &str, delay_ms: u64, html: &str) -> Self {
        self.pages
            .insert(url.to_string(), (Duration::from_millis(delay_ms), html.to_string()));
        self
    }

    fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for SlowFetcher {
    async fn fetch(&self, url: &str) -> FetchResult {
        self.requested.lock().unwrap().push(url.to_string());
        match self.pages.get(url) {
            Some((delay, html)) => {
                tokio::time::sleep(*delay).await;
                Ok(html.clone())
            }
            None => Err(FetchError::Network("connection refused".into())),
        }
    }
}

#[tokio::test]
async fn homepage_failure_stops_everything() {
    let fetcher = Arc::new(SlowFetcher::new().page("https://acme.io/team", 0, "<p>team</p>"));
    let pages = fetch_company_pages(fetcher.clone(), "https://acme.io", &PageFetchOptions::default()).await;

    assert!(pages.is_empty());
    assert_eq!(fetcher.requested(), vec!["https://acme.io".to_string()]);
}

#[tokio::test]
async fn parallel_results_keep_discovery_order() {
    let expected_links = select_internal_links("https://acme.io", HOMEPAGE, 4, &LinkRules::default());
    assert_eq!(
        expected_links,
        vec![
            "https://acme.io/leadership",
            "https://acme.io/team",
            "https://acme.io/about",
            "https://acme.io/contact",
        ]
    );

    // earlier links finish later
    let fetcher = Arc::new(
        SlowFetcher::new()
            .page("https://acme.io", 0, HOMEPAGE)
            .page("https://acme.io/leadership", 200, "<title>Leadership</title>")
            .page("https://acme.io/team", 150, "<title>Team</title>")
            .page("https://acme.io/about", 100, "<title>About</title>")
            .page("https://acme.io/contact", 10, "<title>Contact</title>"),
    );

    let options = PageFetchOptions::default().with_max_pages(5);
    let pages = fetch_company_pages(fetcher.clone(), "https://acme.io", &options).await;

    let urls: Vec<String> = pages.iter().map(|p| p.url.clone()).collect();
    let mut expected = vec!["https://acme.io".to_string()];
    expected.extend(expected_links);
    assert_eq!(urls, expected);

    let titles: Vec<&str> = pages.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Acme", "Leadership", "Team", "About", "Contact"]);
    assert_eq!(fetcher.requested()[0], "https://acme.io");
}

#[tokio::test]
async fn parallel_failures_are_dropped_in_place() {
    let fetcher = Arc::new(
        SlowFetcher::new()
            .page("https://acme.io", 0, HOMEPAGE)
            .page("https://acme.io/leadership", 50, "<title>Leadership</title>")
            .page("https://acme.io/about", 5, "<title>About</title>"),
    );

    let options = PageFetchOptions::default().with_max_pages(4);
    let pages = fetch_company_pages(fetcher.clone(), "https://acme.io", &options).await;

    let urls: Vec<&str> = pages.iter().map(|p| p.url.as_str()).collect();
    assert_eq!(urls, vec!["https://acme.io", "https://acme.io/leadership", "https://acme.io/about"]);
    // homepage + three links, each tried exactly once
    assert_eq!(fetcher.requested().len(), 4);
}

#[tokio::test]
async fn works_through_a_trait_object() {
    let fetcher: Arc<dyn PageFetcher> = Arc::new(
        SlowFetcher::new()
            .page("https://acme.io", 0, HOMEPAGE)
            .page("https://acme.io/leadership", 0, "<title>Leadership</title>"),
    );
    let options = PageFetchOptions::default().with_max_pages(2);
    let pages = fetch_company_pages(fetcher, "https://acme.io", &options).await;
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[1].title, "Leadership");
}
