//! Fit scoring: how well a researched company suits a decision-support
//! prototype, judged by the model and then normalized.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::info;

use crate::cache::{JsonCache, short_digest};
use crate::error::Result;
use crate::hints::{CONSUMER_HINTS_VERSION, looks_like_local_consumer_service};
use crate::json::salvage_or_raw;
use crate::llm::LanguageModel;

/// Bumped whenever the prompt or post-processing changes.
pub const FIT_VERSION: &str = "v4";

pub const DEFAULT_FIT_SCORE: i64 = 50;
pub const GUARD_MAX_SCORE: i64 = 25;
const GUARD_FALLBACK_SCORE: i64 = 15;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitPreferences {
    pub decision_goal: String,
    pub risk_tolerance: String,
    pub prototype_horizon: String,
    pub detail_level: String,
    pub exclude_local_services: bool,
}

impl Default for FitPreferences {
    fn default() -> Self {
        Self {
            decision_goal: "General decision-support (broad)".to_string(),
            risk_tolerance: "Medium".to_string(),
            prototype_horizon: "2-4 weeks (strict)".to_string(),
            detail_level: "Standard".to_string(),
            exclude_local_services: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub company_name: String,
    pub fit: Map<String, Value>,
    pub fit_raw: String,
    #[serde(default)]
    pub from_cache: bool,
    pub preferences: FitPreferences,
}

impl FitResult {
    pub fn fit_score(&self) -> Option<i64> {
        self.fit.get("fit_score").and_then(Value::as_i64)
    }
}

pub fn fit_cache_key(company_name: &str, profile_raw: &str, preferences: &FitPreferences) -> Result<String> {
    let profile_hash = short_digest(profile_raw, 12);
    let pref_hash = short_digest(&serde_json::to_string(preferences)?, 10);
    Ok(format!(
        "fit::{}-h{}::{}::{}::{}",
        FIT_VERSION, CONSUMER_HINTS_VERSION, company_name, profile_hash, pref_hash
    ))
}

pub fn build_fit_prompt(profile_raw: &str, preferences: &FitPreferences) -> String {
    let FitPreferences {
        decision_goal,
        risk_tolerance,
        prototype_horizon,
        detail_level,
        ..
    } = preferences;

    format!(
        r#"You are a senior AI consultant.
Goal: judge whether this company suits an **agentic decision-support prototype**
(not automation, but preparing decisions).

IMPORTANT: judge strictly and pragmatically. Missing information is normal.
Do NOT set the score to 0 automatically, unless the company clearly has no suitable data/decision domain
(e.g. a local consumer service without operational data or processes of relevant depth).

USER PREFERENCES (steer the focus):
- decision_goal: {decision_goal}
- risk_tolerance: {risk_tolerance}
- prototype_horizon: {prototype_horizon}
- detail_level: {detail_level}

INPUT (already researched; may be JSON or text):
{profile_raw}

CRITERIA:
1) Are there recurring, non-trivial decisions? (stakeholders, trade-offs, uncertainty)
2) Are there plausible data sources/signals? (tools, processes, systems, logs, telemetry, workflows)
3) Is a prototype within {prototype_horizon} realistic without massive integration?
4) Do risks and constraints match the risk tolerance ({risk_tolerance})?
5) Can a clear "decision support" use case be stated (explainability, human-in-the-loop)?

RETURN JSON with EXACTLY these fields:
- fit_score: number (0-100)
- decision_summary: string (2-3 sentences, for management)
- why_good_fit: array of strings (max 5, concrete)
- why_not: array of strings (0-4, honest)
- recommended_use_case: string (one clear decision-support use case, {prototype_horizon})
- target_roles: array of strings (1-3 roles, strategic)
- missing_critical_info: boolean
- next_questions: array of strings (0-5, the most important questions)

RULES:
- Do not invent facts.
- No marketing speak.
- If the input clearly looks like a local consumer service: keep fit_score low and say why honestly."#
    )
}

/// Forces `fit_score` to an integer in [0, 100], defaulting to 50 when the
/// model returned something that is not a number.
pub fn normalize_fit(fit: &mut Map<String, Value>) {
    let score = fit
        .get("fit_score")
        .and_then(Value::as_f64)
        .map(|s| s.trunc() as i64)
        .unwrap_or(DEFAULT_FIT_SCORE);
    fit.insert("fit_score".to_string(), json!(score.clamp(0, 100)));
}

/// Overrides the model's verdict for profiles that read like a local
/// consumer service, when the caller asked to exclude those.
///
/// Returns whether the guard fired.
pub fn apply_hard_guard(
    fit: &mut Map<String, Value>,
    profile_raw: &str,
    exclude_local_services: bool,
) -> bool {
    if !exclude_local_services || !looks_like_local_consumer_service(profile_raw) {
        return false;
    }

    let score = fit
        .get("fit_score")
        .and_then(Value::as_f64)
        .map(|s| s.trunc() as i64)
        .unwrap_or(GUARD_FALLBACK_SCORE);
    fit.insert("fit_score".to_string(), json!(score.clamp(0, GUARD_MAX_SCORE)));
    fit.insert("missing_critical_info".to_string(), json!(true));

    let has_summary = fit
        .get("decision_summary")
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty());
    if !has_summary {
        fit.insert(
            "decision_summary".to_string(),
            json!(
                "Looks like a local consumer service with limited data and decision complexity. \
                 For an agentic decision-support prototype the expected leverage is small relative to the effort."
            ),
        );
    }

    fit.insert(
        "recommended_use_case".to_string(),
        json!(
            "Not recommended (the scope fits classic booking/marketing optimization rather than agentic decision support)."
        ),
    );
    fit.insert(
        "why_good_fit".to_string(),
        json!(["Few stakeholders allow quick alignment (but limited leverage)."]),
    );
    fit.insert(
        "why_not".to_string(),
        json!([
            "Limited decision complexity and a thin data basis for real decision support.",
            "The use case would be classic automation/CRM/booking optimization rather than agentic decision preparation."
        ]),
    );
    fit.insert("target_roles".to_string(), json!(["Owner / Management"]));
    fit.insert(
        "next_questions".to_string(),
        json!([
            "Is there structured data at all (booking/POS/CRM) and real decision pressure beyond scheduling?",
            "What measurable business lever would justify a prototype?"
        ]),
    );
    true
}

/// Parses raw model output into a normalized, guarded fit object.
pub fn interpret_fit(
    text: &str,
    profile_raw: &str,
    preferences: &FitPreferences,
) -> Map<String, Value> {
    let mut fit = salvage_or_raw(text);
    normalize_fit(&mut fit);
    if apply_hard_guard(&mut fit, profile_raw, preferences.exclude_local_services) {
        info!("local consumer service guard applied");
    }
    fit
}

/// Scores `company_name` for decision-support fit, using the cache keyed on
/// the fit version, the company, the profile text and the preferences.
pub async fn score_company_fit<M>(
    model: &M,
    cache: &JsonCache,
    company_name: &str,
    profile_raw: &str,
    preferences: &FitPreferences,
    use_cache: bool,
) -> Result<FitResult>
where
    M: LanguageModel + ?Sized,
{
    let key = fit_cache_key(company_name, profile_raw, preferences)?;
    if use_cache {
        if let Some(mut cached) = cache.get::<FitResult>(&key) {
            info!(company = company_name, "fit cache hit");
            cached.from_cache = true;
            return Ok(cached);
        }
    }

    let prompt = build_fit_prompt(profile_raw, preferences);
    let text = model.complete(&prompt).await?.trim().to_string();
    let fit = interpret_fit(&text, profile_raw, preferences);

    let result = FitResult {
        company_name: company_name.to_string(),
        fit,
        fit_raw: text,
        from_cache: false,
        preferences: preferences.clone(),
    };
    info!(company = company_name, score = ?result.fit_score(), "fit scored");

    cache.set(&key, &result)?;
    Ok(result)
}
