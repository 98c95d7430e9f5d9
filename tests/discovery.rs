use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use company_scout::discovery::{CandidateSource, DiscoverySpec, discover_companies, find_company_by_name};
use company_scout::search::{SearchBackend, SearchResult};

/// Returns one canned result list per call and records queries.
struct ScriptedSearch {
    responses: Mutex<Vec<Vec<SearchResult>>>,
    queries: Mutex<Vec<(String, usize)>>,
}

impl ScriptedSearch {
    fn new(responses: Vec<Vec<SearchResult>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            queries: Mutex::new(Vec::new()),
        }
    }

    fn queries(&self) -> Vec<(String, usize)> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchBackend for ScriptedSearch {
    async fn search(&self, query: &str, max_results: usize) -> Vec<SearchResult> {
        self.queries.lock().unwrap().push((query.to_string(), max_results));
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Vec::new()
        } else {
            responses.remove(0)
        }
    }
}

fn hit(title: &str, url: &str, snippet: &str) -> SearchResult {
    SearchResult {
        title: title.into(),
        url: url.into(),
        snippet: snippet.into(),
    }
}

#[tokio::test]
async fn domain_input_skips_search() {
    let backend = ScriptedSearch::new(vec![]);
    let candidates = find_company_by_name(&backend, "notion.so", 6).await;

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].company_name, "notion.so");
    assert_eq!(candidates[0].company_url, "https://notion.so");
    assert_eq!(candidates[0].source, CandidateSource::UserInput);
    assert!(backend.queries().is_empty());

    let json = serde_json::to_value(&candidates[0]).unwrap();
    assert_eq!(json["source"], "user_input");
}

#[tokio::test]
async fn full_url_input_is_kept() {
    let backend = ScriptedSearch::new(vec![]);
    let candidates = find_company_by_name(&backend, "  https://linear.app/ ", 6).await;
    assert_eq!(candidates[0].company_name, "linear.app");
    assert_eq!(candidates[0].company_url, "https://linear.app/");
    assert!(backend.queries().is_empty());
}

#[tokio::test]
async fn domain_starting_with_http_gets_a_scheme() {
    let backend = ScriptedSearch::new(vec![]);
    let candidates = find_company_by_name(&backend, "httpie.io", 6).await;
    assert_eq!(candidates[0].company_name, "httpie.io");
    assert_eq!(candidates[0].company_url, "https://httpie.io");
    assert!(backend.queries().is_empty());
}

#[tokio::test]
async fn uppercase_scheme_is_recognized() {
    let backend = ScriptedSearch::new(vec![]);
    let candidates = find_company_by_name(&backend, "HTTPS://Notion.so", 6).await;
    assert_eq!(candidates[0].company_url, "HTTPS://Notion.so");
    assert_eq!(candidates[0].company_name, "Notion.so");
}

#[tokio::test]
async fn blank_name_returns_nothing() {
    let backend = ScriptedSearch::new(vec![]);
    assert!(find_company_by_name(&backend, "   ", 6).await.is_empty());
    assert!(backend.queries().is_empty());
}

#[tokio::test]
async fn name_lookup_filters_and_dedupes_hosts() {
    let backend = ScriptedSearch::new(vec![vec![
        hit("Acme Robotics", "https://acme-robotics.com/", "Robots."),
        hit("Acme Robotics", "https://www.linkedin.com/company/acme", ""),
        hit("Acme Robotics - About", "https://acme-robotics.com/about", ""),
        hit("Acme on GitHub", "https://github.com/acme", ""),
        hit("Acme Robotics GmbH", "https://acme-robotics.de/", ""),
    ]]);

    let candidates = find_company_by_name(&backend, "Acme Robotics", 6).await;

    assert_eq!(backend.queries(), vec![("Acme Robotics official website".to_string(), 6)]);
    let urls: Vec<&str> = candidates.iter().map(|c| c.company_url.as_str()).collect();
    assert_eq!(urls, vec!["https://acme-robotics.com/", "https://acme-robotics.de/"]);
    assert!(candidates.iter().all(|c| c.source == CandidateSource::DuckDuckGo));
    assert_eq!(candidates[0].snippet, "Robots.");
}

#[tokio::test]
async fn discovery_excludes_consumer_services_and_stops_at_cap() {
    let backend = ScriptedSearch::new(vec![
        vec![
            hit("Salon Schön", "https://salon-schoen.de/", "Ihr Friseur in Würzburg"),
            hit("FleetOps", "https://fleetops.io/", "Fleet analytics for logistics"),
            hit("FleetOps Blog", "https://fleetops.io/blog", ""),
        ],
        vec![
            hit("CargoMind", "https://cargomind.de/", "B2B logistics planning"),
            hit("Routify", "https://routify.eu/", "Route optimization"),
        ],
    ]);
    let spec = DiscoverySpec {
        industry: "Logistics".into(),
        country: "Germany".into(),
        ..Default::default()
    };

    let candidates = discover_companies(&backend, &spec, 2, Duration::ZERO).await;

    let urls: Vec<&str> = candidates.iter().map(|c| c.company_url.as_str()).collect();
    assert_eq!(urls, vec!["https://fleetops.io/", "https://cargomind.de/"]);

    let queries = backend.queries();
    assert_eq!(queries.len(), 2);
    assert_eq!(queries[0], ("Logistics Germany company".to_string(), 20));
    assert_eq!(queries[1], ("Logistics Germany B2B company".to_string(), 20));
}

#[tokio::test]
async fn discovery_keeps_consumer_services_when_allowed() {
    let backend = ScriptedSearch::new(vec![vec![hit(
        "Salon Schön",
        "https://salon-schoen.de/",
        "Ihr Friseur in Würzburg",
    )]]);
    let spec = DiscoverySpec {
        keywords: "friseur".into(),
        exclude_consumer_services: false,
        ..Default::default()
    };

    let candidates = discover_companies(&backend, &spec, 5, Duration::ZERO).await;
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].company_name, "Salon Schön");
}

#[tokio::test]
async fn discovery_stops_searching_once_full() {
    let backend = ScriptedSearch::new(vec![vec![
        hit("One", "https://one.io/", ""),
        hit("Two", "https://two.io/", ""),
    ]]);
    let spec = DiscoverySpec {
        industry: "SaaS".into(),
        ..Default::default()
    };

    let candidates = discover_companies(&backend, &spec, 1, Duration::from_millis(1)).await;
    assert_eq!(candidates.len(), 1);
    assert_eq!(backend.queries().len(), 1);
}
