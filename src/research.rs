//! Company profiles: fetch a company's pages, have the model summarize them,
//! cache the result.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cache::JsonCache;
use crate::error::Result;
use crate::llm::LanguageModel;
use crate::pages::{FetchedPage, PageFetchOptions, fetch_company_pages};
use crate::scraper::PageFetcher;

pub const PROFILE_MAX_PAGES: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSource {
    pub url: String,
    pub title: String,
}

/// Page text kept alongside a profile; never the raw HTML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageDigest {
    pub url: String,
    pub title: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub company_name: String,
    /// Model output, expected (not guaranteed) to be a JSON profile.
    pub profile_raw: String,
    #[serde(default)]
    pub sources: Vec<PageSource>,
    #[serde(default)]
    pub pages: Vec<PageDigest>,
    #[serde(default)]
    pub from_cache: bool,
}

pub fn profile_cache_key(company_name: &str, company_url: &str) -> String {
    format!("profile::{}::{}", company_name, company_url)
}

pub fn build_profile_prompt(company_name: &str, pages: &[FetchedPage]) -> String {
    let excerpts = pages
        .iter()
        .map(|p| format!("URL: {}\nTITLE: {}\nTEXT: {}", p.url, p.title, p.text))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        r#"You are a research assistant. Use only the website excerpts below to write a company profile.
If something is not clearly supported by the text, write "Unclear".
Company: {company_name}

Return JSON with exactly these fields:
- company_summary: string (at most 5 sentences)
- what_they_sell: array of strings (3-6 bullets)
- likely_users: array of strings (2-5 bullets)
- possible_ux_opportunities: array of strings (3-6 bullets, concrete)
- confidence: number (0-100) how certain you are
- uncertainties: array of strings (0-5 bullets)
- sources: array of objects {{url, title}} (take the URLs from the input)

Website excerpts:
{excerpts}"#
    )
}

/// Asks the model for a profile of `company_name` based on `pages`.
pub async fn summarize_company<M>(
    model: &M,
    company_name: &str,
    pages: &[FetchedPage],
) -> Result<CompanyProfile>
where
    M: LanguageModel + ?Sized,
{
    let prompt = build_profile_prompt(company_name, pages);
    let profile_raw = model.complete(&prompt).await?.trim().to_string();

    Ok(CompanyProfile {
        company_name: company_name.to_string(),
        profile_raw,
        sources: pages
            .iter()
            .map(|p| PageSource {
                url: p.url.clone(),
                title: p.title.clone(),
            })
            .collect(),
        pages: Vec::new(),
        from_cache: false,
    })
}

/// Fetches, summarizes and caches a company profile.
pub async fn build_company_profile<F, M>(
    fetcher: Arc<F>,
    model: &M,
    cache: &JsonCache,
    company_name: &str,
    company_url: &str,
    use_cache: bool,
) -> Result<CompanyProfile>
where
    F: PageFetcher + ?Sized + 'static,
    M: LanguageModel + ?Sized,
{
    let key = profile_cache_key(company_name, company_url);
    if use_cache {
        if let Some(mut cached) = cache.get::<CompanyProfile>(&key) {
            info!(company = company_name, "profile cache hit");
            cached.from_cache = true;
            return Ok(cached);
        }
    }

    let options = PageFetchOptions::default().with_max_pages(PROFILE_MAX_PAGES);
    let pages = fetch_company_pages(fetcher, company_url, &options).await;
    if pages.is_empty() {
        warn!(company = company_name, url = company_url, "no pages fetched, summarizing without excerpts");
    }

    let mut profile = summarize_company(model, company_name, &pages).await?;
    profile.pages = pages
        .into_iter()
        .map(|p| PageDigest {
            url: p.url,
            title: p.title,
            text: p.text,
        })
        .collect();

    cache.set(&key, &profile)?;
    Ok(profile)
}
