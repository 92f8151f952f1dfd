pub mod health;
pub mod ui;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};

use crate::discovery::handlers as discovery;
use crate::session::handlers as sessions;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        // HTML surface
        .route("/", get(ui::form_page))
        .route("/report", post(discovery::handle_report_form))
        // Stateless API
        .route("/api/v1/analyze", post(discovery::handle_analyze))
        .route("/api/v1/platforms", get(discovery::handle_enumerations))
        // Sessions
        .route("/api/v1/sessions", post(sessions::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            get(sessions::handle_get_session).delete(sessions::handle_reset_session),
        )
        .route(
            "/api/v1/sessions/:id/profile",
            put(sessions::handle_save_profile),
        )
        .route("/api/v1/sessions/:id/notes", post(sessions::handle_add_notes))
        .route("/api/v1/sessions/:id/uploads", post(sessions::handle_upload))
        .route(
            "/api/v1/sessions/:id/analysis",
            post(sessions::handle_analyze_session),
        )
        .route(
            "/api/v1/sessions/:id/report",
            get(sessions::handle_session_report),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
