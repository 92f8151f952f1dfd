use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Html,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::discovery::analyzer::AnalysisResult;
use crate::discovery::handlers::{report_for, run_analysis};
use crate::discovery::report::{render_html, Report};
use crate::errors::AppError;
use crate::intake::extract::extract_text;
use crate::intake::models::{ContentKind, CustomerProfile, UploadedContent};
use crate::records;
use crate::session::store::require_session;
use crate::session::SessionState;
use crate::state::AppState;

#[derive(Serialize)]
pub struct SessionCreated {
    pub session_id: Uuid,
}

/// Session snapshot without the full upload text.
#[derive(Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub profile: Option<CustomerProfile>,
    pub uploads: Vec<UploadSummary>,
    pub analysis: Option<AnalysisResult>,
}

#[derive(Serialize)]
pub struct UploadSummary {
    pub id: Uuid,
    pub filename: String,
    pub kind: ContentKind,
    pub chars: usize,
}

impl From<&SessionState> for SessionSnapshot {
    fn from(session: &SessionState) -> Self {
        Self {
            session_id: session.id,
            profile: session.profile.clone(),
            uploads: session
                .uploads
                .iter()
                .map(|u| UploadSummary {
                    id: u.id,
                    filename: u.filename.clone(),
                    kind: u.kind,
                    chars: u.text.chars().count(),
                })
                .collect(),
            analysis: session.analysis.clone(),
        }
    }
}

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionCreated>), AppError> {
    let session = SessionState::new();
    state.sessions.save(&session).await?;
    info!("Created session {} ({} store)", session.id, state.sessions.name());
    Ok((
        StatusCode::CREATED,
        Json(SessionCreated {
            session_id: session.id,
        }),
    ))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let session = require_session(state.sessions.as_ref(), id).await?;
    Ok(Json(SessionSnapshot::from(&session)))
}

/// DELETE /api/v1/sessions/:id
/// Clears profile, uploads and analysis. The session id stays valid.
pub async fn handle_reset_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.sessions.update(id, &|s| s.reset()).await?;
    records::record_session_reset(state.db.as_ref(), id).await;
    info!("Reset session {id}");
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/sessions/:id/profile
pub async fn handle_save_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(profile): Json<CustomerProfile>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let profile = profile.validate()?;
    let session = state
        .sessions
        .update(id, &|s| s.set_profile(profile.clone()))
        .await?;
    records::record_profile(state.db.as_ref(), id, &profile).await;
    Ok(Json(SessionSnapshot::from(&session)))
}

#[derive(Deserialize)]
pub struct NotesRequest {
    pub text: String,
    pub filename: Option<String>,
}

/// POST /api/v1/sessions/:id/notes
pub async fn handle_add_notes(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<NotesRequest>,
) -> Result<(StatusCode, Json<UploadSummary>), AppError> {
    if req.text.trim().is_empty() {
        return Err(AppError::Validation("text must not be empty".to_string()));
    }
    let filename = req.filename.unwrap_or_else(|| "notes.txt".to_string());
    let upload = UploadedContent::new(id, filename, ContentKind::Text, req.text);
    attach_upload(&state, id, upload).await
}

/// POST /api/v1/sessions/:id/uploads
/// Multipart; every part with a filename is treated as one upload.
pub async fn handle_upload(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Vec<UploadSummary>>), AppError> {
    // Fail fast on unknown sessions before reading the body.
    require_session(state.sessions.as_ref(), id).await?;

    let mut created = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read {filename}: {e}")))?;
        let (kind, text) = extract_text(
            &filename,
            bytes,
            &state.config.capabilities,
            state.analyzer.as_ref(),
            &state.analysis_permits,
        )
        .await?;
        let upload = UploadedContent::new(id, filename, kind, text);
        let (_, Json(summary)) = attach_upload(&state, id, upload).await?;
        created.push(summary);
    }

    if created.is_empty() {
        return Err(AppError::Validation(
            "No file found in the multipart body".to_string(),
        ));
    }
    Ok((StatusCode::CREATED, Json(created)))
}

async fn attach_upload(
    state: &AppState,
    id: Uuid,
    upload: UploadedContent,
) -> Result<(StatusCode, Json<UploadSummary>), AppError> {
    state
        .sessions
        .update(id, &|s| s.add_upload(upload.clone()))
        .await?;
    records::record_upload(state.db.as_ref(), &upload).await;

    let summary = UploadSummary {
        id: upload.id,
        filename: upload.filename.clone(),
        kind: upload.kind,
        chars: upload.text.chars().count(),
    };
    info!("Session {id}: added {} ({} chars)", summary.filename, summary.chars);
    Ok((StatusCode::CREATED, Json(summary)))
}

#[derive(Serialize)]
pub struct SessionAnalysisResponse {
    pub session_id: Uuid,
    pub analysis: AnalysisResult,
    pub report: Report,
}

/// POST /api/v1/sessions/:id/analysis
/// Analyzes all uploaded content of the session.
pub async fn handle_analyze_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionAnalysisResponse>, AppError> {
    let session = require_session(state.sessions.as_ref(), id).await?;
    if session.uploads.is_empty() {
        return Err(AppError::Validation(
            "Session has no content to analyze; add notes or upload a file first".to_string(),
        ));
    }

    let analyzed = session.content_ids();
    let text = session.combined_text();
    let (analysis, report) =
        run_analysis(&state, &text, session.profile.as_ref(), Some(id)).await;

    // Content may have changed while the analyzer ran.
    let stored = state
        .sessions
        .update(id, &|s| {
            s.set_analysis_for(&analyzed, analysis.clone());
        })
        .await?;
    if stored.content_ids() != analyzed {
        warn!("Session {id}: content changed during analysis, result not stored");
    }

    Ok(Json(SessionAnalysisResponse {
        session_id: id,
        analysis,
        report,
    }))
}

/// GET /api/v1/sessions/:id/report
pub async fn handle_session_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Html<String>, AppError> {
    let session = require_session(state.sessions.as_ref(), id).await?;
    let analysis = session.analysis.as_ref().ok_or_else(|| {
        AppError::NotFound(format!("Session {id} has no analysis yet"))
    })?;
    let report = report_for(&state, session.profile.as_ref(), analysis);
    Ok(Html(render_html(&report)))
}
