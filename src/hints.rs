//! Keyword hint tables shared by discovery, fit scoring and lead screening.
//!
//! All matching is case-insensitive substring containment. Each table entry
//! counts at most once per text.

/// Bumped whenever [`LOCAL_CONSUMER_HINTS`] changes, so cached decisions that
/// depended on the old table are not reused.
pub const CONSUMER_HINTS_VERSION: &str = "2";

/// Local consumer-service businesses (English and German).
pub const LOCAL_CONSUMER_HINTS: &[&str] = &[
    // en
    "salon",
    "hair",
    "barber",
    "restaurant",
    "cafe",
    "bakery",
    "beauty",
    "spa",
    "nails",
    "tattoo",
    "gym",
    "fitness studio",
    "hotel",
    // de
    "friseur",
    "barbier",
    "café",
    "baeckerei",
    "bäckerei",
    "kosmetik",
    "nagel",
    "gasthaus",
    "öffnungszeiten",
    "oeffnungszeiten",
];

/// Hits needed before a text is treated as a local consumer service.
pub const CONSUMER_HIT_THRESHOLD: usize = 2;

pub const B2B_HINTS: &[&str] = &[
    "b2b",
    "enterprise",
    "industrial",
    "manufacturing",
    "engineering",
    "logistics",
    "supply chain",
    "operations",
    "maintenance",
    "service",
    "automation",
    "compliance",
    "quality management",
    "procurement",
    "erp",
    "industrie",
    "fertigung",
    "maschinenbau",
    "logistik",
    "lieferkette",
    "betrieb",
    "wartung",
    "instandhaltung",
    "automatisierung",
    "qualitätsmanagement",
    "beschaffung",
];

pub const SOFTWARE_PRODUCT_HINTS: &[&str] = &[
    "saas",
    "software",
    "platform",
    "api",
    "integrations",
    "sdk",
    "cloud",
    "developer",
    "graphql",
    "typescript",
    "plattform",
    "integrationen",
];

/// Collapses whitespace runs and lower-cases.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Entries of `table` contained in `text`, in table order.
pub fn matching<'a>(text: &str, table: &[&'a str]) -> Vec<&'a str> {
    let haystack = normalize(text);
    table
        .iter()
        .copied()
        .filter(|hint| !hint.trim().is_empty() && haystack.contains(&hint.to_lowercase()))
        .collect()
}

pub fn contains_any(text: &str, table: &[&str]) -> bool {
    !matching(text, table).is_empty()
}

pub fn consumer_hint_hits(text: &str) -> usize {
    matching(text, LOCAL_CONSUMER_HINTS).len()
}

pub fn looks_like_local_consumer_service(text: &str) -> bool {
    consumer_hint_hits(text) >= CONSUMER_HIT_THRESHOLD
}
