use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};

use crate::discovery::stories::DEFAULT_MAX_STORIES;
use crate::llm_client::{ANTHROPIC_API_URL, DEFAULT_MODEL};

/// Optional pipeline stages. One pipeline, switched per deployment instead of
/// maintaining separate app variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Longer free-text analysis alongside the summary.
    pub narrative: bool,
    /// Classify the notes into ML workload categories.
    pub workload_classification: bool,
    /// Structured strategy brief grounded in the reference knowledge table.
    pub strategy_brief: bool,
    /// Extract text from uploaded PDFs.
    pub document_parsing: bool,
    /// Send uploaded audio to the analyzer for transcription.
    pub audio_transcription: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            narrative: true,
            workload_classification: false,
            strategy_brief: false,
            document_parsing: true,
            audio_transcription: false,
        }
    }
}

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub llm_model: String,
    pub llm_base_url: String,
    pub llm_timeout_secs: u64,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub session_ttl_secs: u64,
    pub port: u16,
    pub rust_log: String,
    pub max_concurrent_analyses: usize,
    pub max_stories: usize,
    pub min_analysis_chars: usize,
    pub max_upload_bytes: usize,
    pub scenario_dir: PathBuf,
    pub capabilities: Capabilities,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = Capabilities::default();

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            llm_model: optional_env("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            llm_base_url: optional_env("LLM_BASE_URL")
                .unwrap_or_else(|| ANTHROPIC_API_URL.to_string()),
            llm_timeout_secs: parse_env("LLM_TIMEOUT_SECS", 120)?,
            database_url: optional_env("DATABASE_URL"),
            redis_url: optional_env("REDIS_URL"),
            session_ttl_secs: parse_env("SESSION_TTL_SECS", 86_400)?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            max_concurrent_analyses: parse_count_env("MAX_CONCURRENT_ANALYSES", 4)?,
            max_stories: parse_count_env("MAX_STORIES", DEFAULT_MAX_STORIES)?,
            min_analysis_chars: parse_env("MIN_ANALYSIS_CHARS", 32)?,
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            scenario_dir: optional_env("SCENARIO_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("test_data")),
            capabilities: Capabilities {
                narrative: parse_env("ENABLE_NARRATIVE", defaults.narrative)?,
                workload_classification: parse_env(
                    "ENABLE_WORKLOAD_CLASSIFICATION",
                    defaults.workload_classification,
                )?,
                strategy_brief: parse_env("ENABLE_STRATEGY_BRIEF", defaults.strategy_brief)?,
                document_parsing: parse_env(
                    "ENABLE_DOCUMENT_PARSING",
                    defaults.document_parsing,
                )?,
                audio_transcription: parse_env(
                    "ENABLE_AUDIO_TRANSCRIPTION",
                    defaults.audio_transcription,
                )?,
            },
        })
    }
}

#[cfg(test)]
impl Config {
    /// Defaults without touching the process environment.
    pub fn for_tests() -> Self {
        Config {
            anthropic_api_key: "test-key".to_string(),
            llm_model: DEFAULT_MODEL.to_string(),
            llm_base_url: ANTHROPIC_API_URL.to_string(),
            llm_timeout_secs: 5,
            database_url: None,
            redis_url: None,
            session_ttl_secs: 60,
            port: 0,
            rust_log: "info".to_string(),
            max_concurrent_analyses: 2,
            max_stories: DEFAULT_MAX_STORIES,
            min_analysis_chars: 32,
            max_upload_bytes: 1024 * 1024,
            scenario_dir: PathBuf::from("test_data"),
            capabilities: Capabilities::default(),
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Unset and blank values are both treated as absent.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: '{raw}'")),
        None => Ok(default),
    }
}

/// Like `parse_env`, but zero is rejected.
fn parse_count_env(key: &str, default: usize) -> Result<usize> {
    let value = parse_env(key, default)?;
    if value == 0 {
        bail!("{key} must be at least 1 (unset it to use the default of {default})");
    }
    Ok(value)
}
