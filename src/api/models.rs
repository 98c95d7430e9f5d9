use serde::Deserialize;

use crate::discovery::DiscoverySpec;
use crate::fit::FitPreferences;
use crate::research::CompanyProfile;
use crate::screening::{Lead, ScreeningSpec};

fn default_true() -> bool {
    true
}

fn default_lookup_results() -> usize {
    6
}

fn default_discover_results() -> usize {
    10
}

#[derive(Deserialize)]
pub struct LookupRequest {
    pub query: String,
    #[serde(default = "default_lookup_results")]
    pub max_results: usize,
}

#[derive(Deserialize)]
pub struct DiscoverRequest {
    #[serde(flatten)]
    pub spec: DiscoverySpec,
    #[serde(default = "default_discover_results")]
    pub max_results: usize,
}

#[derive(Deserialize)]
pub struct ProfileRequest {
    pub company_name: String,
    pub company_url: String,
    #[serde(default = "default_true")]
    pub use_cache: bool,
}

#[derive(Deserialize)]
pub struct FitRequest {
    pub company_name: String,
    pub profile_raw: String,
    #[serde(default)]
    pub preferences: FitPreferences,
    #[serde(default = "default_true")]
    pub use_cache: bool,
}

/// Leads come as JSON rows, as CSV text with a header row, or both.
/// Researched profiles, matched by company name, refine the cheap scores.
#[derive(Deserialize)]
pub struct ScreenRequest {
    #[serde(default)]
    pub leads: Vec<Lead>,
    #[serde(default)]
    pub leads_csv: Option<String>,
    #[serde(default)]
    pub spec: ScreeningSpec,
    #[serde(default)]
    pub profiles: Vec<CompanyProfile>,
}
