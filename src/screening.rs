//! Cheap keyword screening of a lead list, optionally refined with
//! researched profiles.

use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::hints::{B2B_HINTS, LOCAL_CONSUMER_HINTS, SOFTWARE_PRODUCT_HINTS, contains_any, normalize};
use crate::json::salvage_object;
use crate::research::CompanyProfile;

const BASELINE_SCORE: i32 = 35;
const CAP_NOTE: &str = "; Excluded due to max_results cap.";
const PROFILE_TEXT_FIELDS: &[&str] = &[
    "company_summary",
    "what_they_sell",
    "likely_users",
    "possible_ux_opportunities",
    "uncertainties",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub company_name: String,
    #[serde(default)]
    pub company_url: String,
    #[serde(default)]
    pub notes: String,
}

/// Drops repeated (name, url) pairs, compared case-insensitively. Fields are
/// trimmed.
pub fn dedupe_leads(leads: Vec<Lead>) -> Vec<Lead> {
    let mut seen = HashSet::new();
    leads
        .into_iter()
        .map(|l| Lead {
            company_name: l.company_name.trim().to_string(),
            company_url: l.company_url.trim().to_string(),
            notes: l.notes.trim().to_string(),
        })
        .filter(|l| seen.insert((l.company_name.to_lowercase(), l.company_url.to_lowercase())))
        .collect()
}

/// Reads leads from CSV with a header row. The `company_name`,
/// `company_url` and `notes` columns are optional and read as empty when
/// absent; other columns are ignored. The result is deduplicated.
pub fn read_leads_csv<R: Read>(reader: R) -> Result<Vec<Lead>> {
    leads_from(csv::ReaderBuilder::new().flexible(true).from_reader(reader))
}

pub fn load_leads_csv(path: impl AsRef<Path>) -> Result<Vec<Lead>> {
    leads_from(csv::ReaderBuilder::new().flexible(true).from_path(path)?)
}

fn leads_from<R: Read>(mut rdr: csv::Reader<R>) -> Result<Vec<Lead>> {
    let headers = rdr.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h.trim() == name);
    let (name_col, url_col, notes_col) = (column("company_name"), column("company_url"), column("notes"));

    let mut leads = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let field = |col: Option<usize>| col.and_then(|i| record.get(i)).unwrap_or("").to_string();
        leads.push(Lead {
            company_name: field(name_col),
            company_url: field(url_col),
            notes: field(notes_col),
        });
    }

    Ok(dedupe_leads(leads))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreeningSpec {
    pub exclude_consumer_services: bool,
    pub prefer_b2b: bool,
    pub industry_keywords: Vec<String>,
    pub min_score: i32,
    pub max_results: usize,
}

impl Default for ScreeningSpec {
    fn default() -> Self {
        Self {
            exclude_consumer_services: true,
            prefer_b2b: true,
            industry_keywords: Vec::new(),
            min_score: 45,
            max_results: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Strong,
    Promising,
    Maybe,
    Weak,
}

impl Bucket {
    pub fn from_score(score: i32) -> Self {
        match score {
            s if s >= 75 => Bucket::Strong,
            s if s >= 55 => Bucket::Promising,
            s if s >= 40 => Bucket::Maybe,
            _ => Bucket::Weak,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenedLead {
    pub company_name: String,
    pub company_url: String,
    pub screen_score: i32,
    pub screen_bucket: Bucket,
    pub screen_included: bool,
    pub screen_reasons: String,
}

/// Scores how promising `text` looks for a decision-support prototype.
pub fn score_text(text: &str, spec: &ScreeningSpec) -> (i32, Vec<String>) {
    let text = normalize(text);
    let mut reasons = Vec::new();
    let mut score = BASELINE_SCORE;

    if spec.exclude_consumer_services && contains_any(&text, LOCAL_CONSUMER_HINTS) {
        score -= 45;
        reasons.push("Looks like a local consumer service (excluded).".to_string());
    }

    if spec.prefer_b2b && contains_any(&text, B2B_HINTS) {
        score += 20;
        reasons.push("Contains B2B / industrial / ops keywords.".to_string());
    }

    if contains_any(&text, SOFTWARE_PRODUCT_HINTS) {
        score += 15;
        reasons.push("Contains software/platform/API signals (often good for prototypes).".to_string());
    }

    let hits: Vec<&str> = spec
        .industry_keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty() && text.contains(&k.to_lowercase()))
        .collect();
    if !hits.is_empty() {
        score += (3 * hits.len() as i32).min(15);
        let mut listed = hits.iter().take(5).copied().collect::<Vec<_>>().join(", ");
        if hits.len() > 5 {
            listed.push('…');
        }
        reasons.push(format!("Matches industry keywords: {}", listed));
    }

    (score.clamp(0, 100), reasons)
}

/// Included rows first, best score first; included rows beyond
/// `max_results` are demoted.
fn rank(rows: &mut [ScreenedLead], spec: &ScreeningSpec) {
    rows.sort_by(|a, b| {
        b.screen_included
            .cmp(&a.screen_included)
            .then(b.screen_score.cmp(&a.screen_score))
    });

    let mut kept = 0;
    for row in rows.iter_mut().filter(|r| r.screen_included) {
        kept += 1;
        if kept > spec.max_results {
            row.screen_included = false;
            if row.screen_score >= spec.min_score {
                row.screen_reasons.push_str(CAP_NOTE);
            }
        }
    }
}

fn screened(
    company_name: String,
    company_url: String,
    score: i32,
    reasons: String,
    spec: &ScreeningSpec,
) -> ScreenedLead {
    ScreenedLead {
        company_name,
        company_url,
        screen_score: score,
        screen_bucket: Bucket::from_score(score),
        screen_included: score >= spec.min_score,
        screen_reasons: reasons,
    }
}

pub fn screen_leads(leads: &[Lead], spec: &ScreeningSpec) -> Vec<ScreenedLead> {
    let mut rows: Vec<ScreenedLead> = leads
        .iter()
        .map(|lead| {
            let cheap_text = format!("{} {} {}", lead.company_name, lead.company_url, lead.notes);
            let (score, reasons) = score_text(&cheap_text, spec);
            screened(
                lead.company_name.trim().to_string(),
                lead.company_url.trim().to_string(),
                score,
                reasons.join("; "),
                spec,
            )
        })
        .collect();

    rank(&mut rows, spec);
    rows
}

fn profile_text(profile_raw: &str) -> String {
    let Some(parsed) = salvage_object(profile_raw) else {
        return profile_raw.to_string();
    };

    let parts: Vec<String> = PROFILE_TEXT_FIELDS
        .iter()
        .filter_map(|field| match parsed.get(*field) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Array(items)) => Some(
                items
                    .iter()
                    .filter_map(|v| match v {
                        Value::String(s) if !s.is_empty() => Some(s.clone()),
                        Value::Null | Value::Bool(false) | Value::String(_) => None,
                        other => Some(other.to_string()),
                    })
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            _ => None,
        })
        .collect();

    if parts.is_empty() {
        profile_raw.to_string()
    } else {
        parts.join(" ")
    }
}

/// Re-scores screened rows that have a researched profile, blending the
/// cheap score (25%) with the research-based score (75%).
pub fn merge_profiles(
    rows: &[ScreenedLead],
    profiles: &[CompanyProfile],
    spec: &ScreeningSpec,
) -> Vec<ScreenedLead> {
    let by_name: HashMap<&str, &CompanyProfile> = profiles
        .iter()
        .map(|p| (p.company_name.trim(), p))
        .filter(|(name, _)| !name.is_empty())
        .collect();

    let mut merged: Vec<ScreenedLead> = rows
        .iter()
        .map(|row| {
            let Some(profile) = by_name.get(row.company_name.trim()) else {
                return row.clone();
            };

            let (research_score, research_reasons) = score_text(&profile_text(&profile.profile_raw), spec);
            let blended = (0.25 * row.screen_score as f64 + 0.75 * research_score as f64).round() as i32;
            let blended = blended.clamp(0, 100);

            let mut reasons = Vec::new();
            let base_reasons = row.screen_reasons.trim();
            if !base_reasons.is_empty() {
                reasons.push(base_reasons.to_string());
            }
            if !research_reasons.is_empty() {
                reasons.push(format!("Research-based: {}", research_reasons.join("; ")));
            }

            screened(
                row.company_name.clone(),
                row.company_url.clone(),
                blended,
                reasons.join(" | "),
                spec,
            )
        })
        .collect();

    rank(&mut merged, spec);
    merged
}
