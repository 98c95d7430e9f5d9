use axum::{
    routing::post,
    Router,
    extract::{Json, State},
    response::IntoResponse,
    http::StatusCode,
};
use serde::Serialize;
use std::future::Future;
use std::time::{Duration, Instant};
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::AppState;
use crate::api::models::{DiscoverRequest, FitRequest, LookupRequest, ProfileRequest, ScreenRequest};
use crate::api::response::{self, Reply};
use crate::discovery::{CompanyCandidate, POLITENESS_DELAY, discover_companies, find_company_by_name};
use crate::error::{AppError, Result};
use crate::fit::{FitResult, score_company_fit};
use crate::research::{CompanyProfile, build_company_profile};
use crate::screening::{ScreenedLead, dedupe_leads, merge_profiles, read_leads_csv, screen_leads};

/// Overall budget for one request, LLM calls included.
const HANDLER_TIMEOUT: Duration = Duration::from_secs(90);

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/companies/lookup", post(lookup_handler))
        .route("/api/companies/discover", post(discover_handler))
        .route("/api/profile", post(profile_handler))
        .route("/api/fit", post(fit_handler))
        .route("/api/leads/screen", post(screen_handler))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(app_state)
}

async fn run_with_timeout<T, F>(operation: &str, fut: F) -> Reply<T>
where
    T: Serialize,
    F: Future<Output = Result<T>>,
{
    let start_time = Instant::now();
    let result = tokio::time::timeout(HANDLER_TIMEOUT, fut).await;
    let elapsed = start_time.elapsed();

    match result {
        Ok(Ok(data)) => {
            info!(operation, ?elapsed, "request complete");
            response::success(data)
        }
        Ok(Err(err)) => {
            warn!(operation, ?elapsed, error = %err, "request failed");
            response::from_result(Err(err))
        }
        Err(_) => {
            warn!(operation, ?elapsed, "request timed out");
            response::error(StatusCode::REQUEST_TIMEOUT, "Request processing timed out".to_string())
        }
    }
}

async fn lookup_handler(
    State(state): State<AppState>,
    Json(req): Json<LookupRequest>,
) -> impl IntoResponse {
    run_with_timeout("lookup", lookup(&state, req)).await
}

async fn lookup(state: &AppState, req: LookupRequest) -> Result<Vec<CompanyCandidate>> {
    if req.query.trim().is_empty() {
        return Err(AppError::ValidationError("Please enter a company name or domain".to_string()));
    }
    Ok(find_company_by_name(state.search.as_ref(), &req.query, req.max_results).await)
}

async fn discover_handler(
    State(state): State<AppState>,
    Json(req): Json<DiscoverRequest>,
) -> impl IntoResponse {
    run_with_timeout("discover", discover(&state, req)).await
}

async fn discover(state: &AppState, req: DiscoverRequest) -> Result<Vec<CompanyCandidate>> {
    if !req.spec.is_actionable() {
        return Err(AppError::ValidationError("Please provide an industry or keywords".to_string()));
    }
    Ok(discover_companies(state.search.as_ref(), &req.spec, req.max_results, POLITENESS_DELAY).await)
}

async fn profile_handler(
    State(state): State<AppState>,
    Json(req): Json<ProfileRequest>,
) -> impl IntoResponse {
    run_with_timeout("profile", profile(&state, req)).await
}

async fn profile(state: &AppState, req: ProfileRequest) -> Result<CompanyProfile> {
    if req.company_url.trim().is_empty() {
        return Err(AppError::ValidationError("company_url is required".to_string()));
    }
    build_company_profile(
        state.fetcher.clone(),
        state.llm.as_ref(),
        &state.profile_cache,
        &req.company_name,
        &req.company_url,
        req.use_cache,
    )
    .await
}

async fn fit_handler(
    State(state): State<AppState>,
    Json(req): Json<FitRequest>,
) -> impl IntoResponse {
    run_with_timeout("fit", fit(&state, req)).await
}

async fn fit(state: &AppState, req: FitRequest) -> Result<FitResult> {
    score_company_fit(
        state.llm.as_ref(),
        &state.fit_cache,
        &req.company_name,
        &req.profile_raw,
        &req.preferences,
        req.use_cache,
    )
    .await
}

async fn screen_handler(
    State(_state): State<AppState>,
    Json(req): Json<ScreenRequest>,
) -> impl IntoResponse {
    run_with_timeout("screen", async move { screen(req) }).await
}

fn screen(req: ScreenRequest) -> Result<Vec<ScreenedLead>> {
    let mut leads = req.leads;
    if let Some(csv) = req.leads_csv.as_deref() {
        leads.extend(read_leads_csv(csv.as_bytes())?);
    }
    let leads = dedupe_leads(leads);
    if leads.is_empty() {
        return Err(AppError::ValidationError("No leads to screen".to_string()));
    }

    let rows = screen_leads(&leads, &req.spec);
    if req.profiles.is_empty() {
        Ok(rows)
    } else {
        Ok(merge_profiles(&rows, &req.profiles, &req.spec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screening::Lead;

    fn request(json: &str) -> ScreenRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn screening_merges_json_and_csv_leads() {
        let req = request(
            r#"{"leads": [{"company_name": "Acme", "company_url": "https://acme.io"}],
                "leads_csv": "company_name,company_url,notes\nacme,https://acme.io,dup\nBeta,https://beta.dev,logistics\n"}"#,
        );
        let rows = screen(req).unwrap();
        let names: Vec<&str> = rows.iter().map(|r| r.company_name.as_str()).collect();
        assert_eq!(names, vec!["Beta", "Acme"]);
    }

    #[test]
    fn screening_applies_profiles() {
        let req = ScreenRequest {
            leads: vec![Lead {
                company_name: "Gamma".into(),
                company_url: "https://gamma.io".into(),
                notes: String::new(),
            }],
            leads_csv: None,
            spec: Default::default(),
            profiles: vec![CompanyProfile {
                company_name: "Gamma".into(),
                profile_raw: r#"{"company_summary": "B2B maintenance software platform"}"#.into(),
                sources: vec![],
                pages: vec![],
                from_cache: false,
            }],
        };
        let rows = screen(req).unwrap();
        assert_eq!(rows[0].screen_score, 61);
        assert!(rows[0].screen_included);
    }

    #[test]
    fn screening_without_leads_is_rejected() {
        let err = screen(request("{}")).unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }
}
