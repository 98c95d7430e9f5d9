//! Picks the internal pages most likely to describe a company: about,
//! team, leadership, imprint, contact.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use scraper::{Html, Selector};
use url::Url;

static ANCHOR_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("a[href]").expect("Failed to parse anchor selector")
});

pub const DEFAULT_ALLOW_KEYWORDS: &[&str] = &[
    "about",
    "company",
    "team",
    "leadership",
    "management",
    "imprint",
    "contact",
    "careers",
    "jobs",
    "ueber-uns",
    "über-uns",
    "uber-uns",
    "unternehmen",
    "menschen",
    "leitung",
    "führung",
    "geschaeftsfuehrung",
    "geschäftsführung",
    "impressum",
    "kontakt",
    "karriere",
    "stellen",
];

pub const DEFAULT_BLOCK_KEYWORDS: &[&str] = &[
    "blog",
    "changelog",
    "docs",
    "documentation",
    "help",
    "press",
    "news",
    "events",
    "community",
    "privacy",
    "terms",
    "status",
    "legal",
    "security",
    "cookie",
    "customers",
    "case-studies",
    "partners",
];

/// Fixed bonus per path fragment.
const PATH_BOOSTS: &[(&str, i32)] = &[
    ("leadership", 60),
    ("team", 55),
    ("management", 55),
    ("about", 50),
    ("company", 45),
    ("ueber-uns", 50),
    ("über-uns", 50),
    ("impressum", 45),
    ("imprint", 45),
    ("kontakt", 40),
    ("contact", 40),
    ("geschaeftsfuehrung", 55),
    ("geschäftsführung", 55),
    ("karriere", 10),
    ("careers", 10),
    ("jobs", 10),
];

const ALLOW_BONUS: i32 = 5;
const BLOCK_PENALTY: i32 = -80;

const SKIPPED_EXTENSIONS: &[&str] = &[".pdf", ".zip", ".png", ".jpg", ".jpeg", ".svg", ".webp"];

#[derive(Debug, Clone)]
pub struct LinkRules {
    pub allow: Vec<String>,
    pub block: Vec<String>,
}

impl Default for LinkRules {
    fn default() -> Self {
        Self {
            allow: DEFAULT_ALLOW_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            block: DEFAULT_BLOCK_KEYWORDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl LinkRules {
    /// Defaults for whichever list is not given.
    pub fn new(allow: Option<Vec<String>>, block: Option<Vec<String>>) -> Self {
        let defaults = Self::default();
        Self {
            allow: allow.unwrap_or(defaults.allow),
            block: block.unwrap_or(defaults.block),
        }
    }

    /// Heuristic relevance of a lower-cased, decoded URL path.
    pub fn score_path(&self, path: &str) -> i32 {
        let mut score = 0;
        for (fragment, bonus) in PATH_BOOSTS {
            if path.contains(fragment) {
                score += bonus;
            }
        }
        for keyword in &self.allow {
            if path.contains(&keyword.to_lowercase()) {
                score += ALLOW_BONUS;
            }
        }
        for keyword in &self.block {
            if path.contains(&keyword.to_lowercase()) {
                score += BLOCK_PENALTY;
            }
        }
        score
    }
}

/// `host[:port]`, lower-cased.
pub fn netloc(url: &Url) -> String {
    let host = url.host_str().unwrap_or("").to_lowercase();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    }
}

fn decoded_path(url: &Url) -> String {
    percent_decode_str(url.path())
        .decode_utf8_lossy()
        .to_lowercase()
}

/// Up to `max_links` same-host links from `html`, best first. Ties keep the
/// order in which the anchors appear.
pub fn select_internal_links(
    base_url: &str,
    html: &str,
    max_links: usize,
    rules: &LinkRules,
) -> Vec<String> {
    if max_links == 0 {
        return Vec::new();
    }

    let base = format!("{}/", base_url.trim_end_matches('/'));
    let Ok(base) = Url::parse(&base) else {
        return Vec::new();
    };
    let base_netloc = netloc(&base);

    let document = Html::parse_document(html);
    let mut candidates: Vec<(i32, String)> = Vec::new();

    for anchor in document.select(&ANCHOR_SELECTOR) {
        let href = anchor.value().attr("href").unwrap_or("").trim();
        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("mailto:")
            || href.starts_with("tel:")
        {
            continue;
        }
        let Ok(full) = base.join(href) else {
            continue;
        };
        if netloc(&full) != base_netloc {
            continue;
        }

        let path = decoded_path(&full);
        if path.is_empty() || path == "/" {
            continue;
        }
        if SKIPPED_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
            continue;
        }

        let score = rules.score_path(&path);
        if score <= 0 {
            continue;
        }
        candidates.push((score, full.to_string()));
    }

    // stable: equal scores stay in discovery order
    candidates.sort_by(|a, b| b.0.cmp(&a.0));

    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .map(|(_, url)| url)
        .filter(|url| seen.insert(url.clone()))
        .take(max_links)
        .collect()
}
