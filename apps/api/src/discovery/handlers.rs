use axum::{extract::State, response::Html, Form, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::discovery::analyzer::{analyze_content, AnalysisContext, AnalysisResult};
use crate::discovery::platforms::DETECTABLE;
use crate::discovery::report::{build_report, render_html, Report};
use crate::discovery::stories::lookup_stories;
use crate::errors::AppError;
use crate::intake::extract::SUPPORTED_EXTENSIONS;
use crate::intake::models::{
    CompanySize, CurrentPlatform, CustomerProfile, Industry, MlMaturity, UseCase,
};
use crate::records;
use crate::state::AppState;

/// Runs the pipeline, records the result, and assembles the report.
pub async fn run_analysis(
    state: &AppState,
    text: &str,
    profile: Option<&CustomerProfile>,
    session_id: Option<Uuid>,
) -> (AnalysisResult, Report) {
    let reference_knowledge = if state.config.capabilities.strategy_brief {
        records::reference_digest(state.db.as_ref()).await
    } else {
        None
    };

    let result = analyze_content(
        text,
        AnalysisContext {
            profile,
            reference_knowledge: reference_knowledge.as_deref(),
        },
        state.analyzer.as_ref(),
        &state.analysis_permits,
        &state.analysis_options(),
    )
    .await;

    info!(
        "Analysis finished: status={:?}, platforms={:?}",
        result.status, result.platforms
    );
    records::record_analysis(state.db.as_ref(), session_id, &result).await;

    let report = report_for(state, profile, &result);
    (result, report)
}

pub fn report_for(
    state: &AppState,
    profile: Option<&CustomerProfile>,
    result: &AnalysisResult,
) -> Report {
    let stories = lookup_stories(&result.platforms, state.config.max_stories);
    build_report(profile, result, stories)
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub text: String,
    pub profile: Option<CustomerProfile>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub analysis: AnalysisResult,
    pub report: Report,
}

/// POST /api/v1/analyze
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let profile = req.profile.map(CustomerProfile::validate).transpose()?;
    let (analysis, report) = run_analysis(&state, &req.text, profile.as_ref(), None).await;
    Ok(Json(AnalyzeResponse { analysis, report }))
}

#[derive(Debug, Deserialize)]
pub struct ReportForm {
    #[serde(default)]
    pub notes: String,
}

/// POST /report
pub async fn handle_report_form(
    State(state): State<AppState>,
    Form(form): Form<ReportForm>,
) -> Html<String> {
    let (_, report) = run_analysis(&state, &form.notes, None, None).await;
    Html(render_html(&report))
}

/// GET /api/v1/platforms
/// Option lists for the profile form and the detector's label set.
pub async fn handle_enumerations() -> Json<Value> {
    fn labels<T: Copy>(all: &[T], label: fn(T) -> &'static str) -> Vec<&'static str> {
        all.iter().map(|v| label(*v)).collect()
    }

    Json(json!({
        "detected_platforms": DETECTABLE.iter().map(|p| p.label()).collect::<Vec<_>>(),
        "industries": labels(Industry::ALL, Industry::label),
        "company_sizes": labels(CompanySize::ALL, CompanySize::label),
        "ml_maturity": labels(MlMaturity::ALL, MlMaturity::label),
        "current_platforms": labels(CurrentPlatform::ALL, CurrentPlatform::label),
        "use_cases": labels(UseCase::ALL, UseCase::label),
        "upload_types": SUPPORTED_EXTENSIONS,
    }))
}
