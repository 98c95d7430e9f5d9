use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::links::{LinkRules, select_internal_links};
use crate::scraper::{PageFetcher, extract, truncate_chars};

pub const MAX_TEXT_CHARS: usize = 18_000;
pub const MAX_WORKERS: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedPage {
    pub url: String,
    pub title: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

impl FetchedPage {
    pub fn from_html(url: &str, html: String, keep_html: bool) -> Self {
        let (title, text) = extract(&html);
        Self {
            url: url.to_string(),
            title,
            text: truncate_chars(&text, MAX_TEXT_CHARS),
            html: keep_html.then_some(html),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PageFetchOptions {
    pub max_pages: usize,
    pub parallel: bool,
    /// Pause after each sequential fetch.
    pub delay: Duration,
    pub keep_html: bool,
    pub rules: LinkRules,
}

impl Default for PageFetchOptions {
    fn default() -> Self {
        Self {
            max_pages: 3,
            parallel: true,
            delay: Duration::ZERO,
            keep_html: true,
            rules: LinkRules::default(),
        }
    }
}

impl PageFetchOptions {
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    pub fn without_html(mut self) -> Self {
        self.keep_html = false;
        self
    }
}

async fn fetch_page<F: PageFetcher + ?Sized>(
    fetcher: &F,
    url: &str,
    keep_html: bool,
) -> Option<FetchedPage> {
    match fetcher.fetch(url).await {
        Ok(html) => Some(FetchedPage::from_html(url, html, keep_html)),
        Err(e) => {
            debug!(url, error = %e, "dropping page");
            None
        }
    }
}

/// Fetches the homepage and then the best internal pages, returned in
/// discovery order: `[homepage, links in selector order]`.
///
/// Nothing is fetched beyond the homepage when the homepage itself fails.
pub async fn fetch_company_pages<F>(
    fetcher: Arc<F>,
    company_url: &str,
    options: &PageFetchOptions,
) -> Vec<FetchedPage>
where
    F: PageFetcher + ?Sized + 'static,
{
    if company_url.trim().is_empty() || options.max_pages == 0 {
        return Vec::new();
    }

    let homepage_html = match fetcher.fetch(company_url).await {
        Ok(html) => html,
        Err(e) => {
            warn!(url = company_url, error = %e, "homepage fetch failed");
            return Vec::new();
        }
    };

    let links = select_internal_links(
        company_url,
        &homepage_html,
        options.max_pages.saturating_sub(1),
        &options.rules,
    );

    let mut seen = HashSet::new();
    seen.insert(company_url.to_string());
    let rest: Vec<String> = links
        .into_iter()
        .filter(|url| seen.insert(url.clone()))
        .take(options.max_pages - 1)
        .collect();

    let mut pages = vec![FetchedPage::from_html(company_url, homepage_html, options.keep_html)];
    if !options.delay.is_zero() {
        tokio::time::sleep(options.delay).await;
    }

    if rest.is_empty() {
        return pages;
    }

    if !options.parallel || rest.len() == 1 {
        for url in &rest {
            if let Some(page) = fetch_page(fetcher.as_ref(), url, options.keep_html).await {
                pages.push(page);
            }
            if !options.delay.is_zero() {
                tokio::time::sleep(options.delay).await;
            }
        }
    } else {
        pages.extend(fetch_parallel(fetcher, rest, options.keep_html).await);
    }

    info!(url = company_url, pages = pages.len(), "fetched company pages");
    pages
}

/// Fetches `urls` on a bounded pool and returns the successes in the order
/// of `urls`, whatever order they completed in.
async fn fetch_parallel<F>(fetcher: Arc<F>, urls: Vec<String>, keep_html: bool) -> Vec<FetchedPage>
where
    F: PageFetcher + ?Sized + 'static,
{
    let workers = MAX_WORKERS.min(urls.len());
    let sem = Arc::new(Semaphore::new(workers));
    let mut set: JoinSet<(usize, Option<FetchedPage>)> = JoinSet::new();

    for (index, url) in urls.into_iter().enumerate() {
        let fetcher = fetcher.clone();
        let sem = sem.clone();
        set.spawn(async move {
            let _permit = sem.acquire_owned().await.ok();
            (index, fetch_page(fetcher.as_ref(), &url, keep_html).await)
        });
    }

    let mut done: Vec<(usize, FetchedPage)> = Vec::new();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, Some(page))) => done.push((index, page)),
            Ok((_, None)) => {}
            Err(e) => warn!(error = %e, "page fetch task failed"),
        }
    }

    done.sort_by_key(|(index, _)| *index);
    done.into_iter().map(|(_, page)| page).collect()
}
