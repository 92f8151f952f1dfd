use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::Semaphore;

use crate::config::Config;
use crate::discovery::analyzer::{AnalysisOptions, TextAnalyzer};
use crate::session::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Present only when `DATABASE_URL` is configured.
    pub db: Option<PgPool>,
    pub sessions: Arc<dyn SessionStore>,
    /// Pluggable text-analysis backend. Default: `LlmClient`.
    pub analyzer: Arc<dyn TextAnalyzer>,
    /// Bounds concurrent calls to the analyzer across all requests.
    pub analysis_permits: Arc<Semaphore>,
    pub config: Config,
}

impl AppState {
    pub fn new(
        config: Config,
        db: Option<PgPool>,
        sessions: Arc<dyn SessionStore>,
        analyzer: Arc<dyn TextAnalyzer>,
    ) -> Self {
        let permits = config.max_concurrent_analyses.max(1);
        Self {
            db,
            sessions,
            analyzer,
            analysis_permits: Arc::new(Semaphore::new(permits)),
            config,
        }
    }

    pub fn analysis_options(&self) -> AnalysisOptions {
        AnalysisOptions {
            capabilities: self.config.capabilities,
            min_analysis_chars: self.config.min_analysis_chars,
        }
    }
}
