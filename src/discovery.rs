use std::collections::HashSet;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::hints::looks_like_local_consumer_service;
use crate::links::netloc;
use crate::scraper::clean_text;
use crate::search::{SearchBackend, SearchResult};

/// Per-query result cap used by parameter discovery.
pub const DISCOVERY_QUERY_CAP: usize = 20;
pub const POLITENESS_DELAY: Duration = Duration::from_millis(150);

static URL_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^https?://").expect("Failed to compile url prefix pattern")
});

/// Hosts that show up in search results but never are a company's own site.
const NON_COMPANY_HOSTS: &[&str] = &[
    "linkedin.com",
    "xing.com",
    "crunchbase.com",
    "wikipedia.org",
    "facebook.com",
    "instagram.com",
    "youtube.com",
    "twitter.com",
    "x.com",
    "github.com",
    "apps.apple.com",
    "play.google.com",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    UserInput,
    #[serde(rename = "ddg")]
    DuckDuckGo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyCandidate {
    pub company_name: String,
    pub company_url: String,
    pub snippet: String,
    pub source: CandidateSource,
}

impl CompanyCandidate {
    fn from_result(result: SearchResult, fallback_name: &str) -> Self {
        let company_name = if result.title.is_empty() {
            fallback_name.to_string()
        } else {
            result.title
        };
        Self {
            company_name,
            company_url: result.url,
            snippet: result.snippet,
            source: CandidateSource::DuckDuckGo,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoverySpec {
    pub industry: String,
    pub keywords: String,
    pub country: String,
    pub region_or_city: String,
    /// e.g. "1-10", "11-50", "51-200", "201-1000", "1000+"
    pub company_size: String,
    pub exclude_consumer_services: bool,
}

impl Default for DiscoverySpec {
    fn default() -> Self {
        Self {
            industry: String::new(),
            keywords: String::new(),
            country: String::new(),
            region_or_city: String::new(),
            company_size: String::new(),
            exclude_consumer_services: true,
        }
    }
}

impl DiscoverySpec {
    /// Discovery needs at least an industry or some keywords to search for.
    pub fn is_actionable(&self) -> bool {
        !self.industry.trim().is_empty() || !self.keywords.trim().is_empty()
    }

    /// The main query plus a broader B2B query, blanks dropped.
    pub fn queries(&self) -> Vec<String> {
        let mut parts: Vec<String> = Vec::new();
        for field in [&self.industry, &self.keywords, &self.region_or_city, &self.country] {
            if !field.trim().is_empty() {
                parts.push(field.clone());
            }
        }
        if !self.company_size.trim().is_empty() {
            parts.push(format!("\"{}\" employees", self.company_size));
        }
        parts.push("company".to_string());

        let primary = clean_text(&parts.join(" "));
        let broad = clean_text(&format!("{} {} B2B company", self.industry, self.country));

        [primary, broad]
            .into_iter()
            .filter(|q| !q.is_empty())
            .collect()
    }
}

/// http(s) URL on a dotted host that is not a social network, directory or
/// app store.
pub fn is_probably_company_domain(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }
    let host = parsed.host_str().unwrap_or("").to_lowercase();
    if host.is_empty() || !host.contains('.') {
        return false;
    }
    !NON_COMPANY_HOSTS
        .iter()
        .any(|bad| host == *bad || host.ends_with(&format!(".{}", bad)))
}

fn host_key(url: &str) -> String {
    Url::parse(url).map(|u| netloc(&u)).unwrap_or_default()
}

/// Candidates for a company name. A query that looks like a URL or domain is
/// taken at face value and no search is made.
pub async fn find_company_by_name<B>(
    backend: &B,
    company_query: &str,
    max_results: usize,
) -> Vec<CompanyCandidate>
where
    B: SearchBackend + ?Sized,
{
    let query = clean_text(company_query);
    if query.is_empty() {
        return Vec::new();
    }

    if URL_PREFIX.is_match(&query) || query.contains('.') {
        let company_url = if URL_PREFIX.is_match(&query) {
            query.clone()
        } else {
            format!("https://{}", query)
        };
        let company_name = URL_PREFIX.replace(&query, "").trim_matches('/').to_string();
        return vec![CompanyCandidate {
            company_name,
            company_url,
            snippet: "User provided URL/domain.".to_string(),
            source: CandidateSource::UserInput,
        }];
    }

    let results = backend
        .search(&format!("{} official website", query), max_results)
        .await;

    let mut seen_hosts = HashSet::new();
    let candidates: Vec<CompanyCandidate> = results
        .into_iter()
        .filter(|r| is_probably_company_domain(&r.url))
        .filter(|r| seen_hosts.insert(host_key(&r.url)))
        .map(|r| CompanyCandidate::from_result(r, &query))
        .collect();

    info!(query = %query, count = candidates.len(), "name lookup");
    candidates
}

/// Parameter-based discovery: search for companies matching `spec`.
pub async fn discover_companies<B>(
    backend: &B,
    spec: &DiscoverySpec,
    max_results: usize,
    delay: Duration,
) -> Vec<CompanyCandidate>
where
    B: SearchBackend + ?Sized,
{
    let mut candidates: Vec<CompanyCandidate> = Vec::new();
    let mut seen_hosts = HashSet::new();

    for (index, query) in spec.queries().into_iter().enumerate() {
        if candidates.len() >= max_results {
            break;
        }
        if index > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        for result in backend.search(&query, DISCOVERY_QUERY_CAP).await {
            if !is_probably_company_domain(&result.url) {
                continue;
            }
            let blob = format!("{} {}", result.title, result.snippet);
            if spec.exclude_consumer_services && looks_like_local_consumer_service(&blob) {
                debug!(url = %result.url, "skipping local consumer service");
                continue;
            }
            if !seen_hosts.insert(host_key(&result.url)) {
                continue;
            }

            candidates.push(CompanyCandidate::from_result(result, ""));
            if candidates.len() >= max_results {
                break;
            }
        }
    }

    info!(count = candidates.len(), "discovery complete");
    candidates
}
