//! `discovery check` — setup self-test.
//!
//! Verifies credentials, analyzer access, the sample scenario files and (when
//! configured) the database, then dry-runs platform detection on each scenario. Prints one
//! ✅/❌ line per check.

use std::fmt::Write;
use std::path::Path;

use crate::config::Config;
use crate::db;
use crate::discovery::analyzer::TextAnalyzer;
use crate::discovery::platforms::{detect_platforms, Platform};

/// Sample scenarios shipped in `SCENARIO_DIR`, with the platform each one
/// should surface.
pub const SCENARIOS: &[(&str, &str, Option<Platform>)] = &[
    (
        "scenario_1_sagemaker_migration.txt",
        "AWS SageMaker Migration Challenge",
        Some(Platform::SageMaker),
    ),
    (
        "scenario_2_databricks_costs.txt",
        "Databricks Cost Explosion Crisis",
        Some(Platform::Databricks),
    ),
    (
        "scenario_3_retail_forecasting.txt",
        "Simple Retail Forecasting",
        Some(Platform::ExcelManual),
    ),
    (
        "audio_transcript_sample.txt",
        "Healthcare AI Platform (Audio)",
        None,
    ),
];

const PLACEHOLDER_KEYS: &[&str] = &["sk-ant-your-key", "your-api-key", "changeme"];

const ACCESS_PROBE_TEXT: &str = "This is a simple test for text-analysis access.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

impl CheckOutcome {
    fn pass(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            detail: detail.into(),
        }
    }

    fn fail(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct CheckReport {
    pub outcomes: Vec<CheckOutcome>,
}

impl CheckReport {
    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(|o| o.passed)
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for outcome in &self.outcomes {
            let mark = if outcome.passed { "✅" } else { "❌" };
            let _ = writeln!(out, "{mark} {}: {}", outcome.name, outcome.detail);
        }
        let passed = self.outcomes.iter().filter(|o| o.passed).count();
        let _ = writeln!(out, "\n{passed}/{} checks passed", self.outcomes.len());
        out
    }
}

pub fn check_credentials(api_key: &str) -> CheckOutcome {
    let key = api_key.trim();
    if key.is_empty() || PLACEHOLDER_KEYS.contains(&key) {
        return CheckOutcome::fail(
            "Credentials",
            "ANTHROPIC_API_KEY is not configured. Copy .env.example to .env and set it.",
        );
    }
    CheckOutcome::pass("Credentials", "ANTHROPIC_API_KEY is set")
}

/// Makes one live summarize call; fails when the service is unreachable or
/// the key is not authorized.
pub async fn check_analyzer(analyzer: &dyn TextAnalyzer) -> CheckOutcome {
    match analyzer.summarize(ACCESS_PROBE_TEXT).await {
        Ok(_) => CheckOutcome::pass("Text analysis access", "test summarize call succeeded"),
        Err(e) => CheckOutcome::fail("Text analysis access", format!("test call failed: {e}")),
    }
}

/// Checks that every scenario file exists, then dry-runs detection on each.
pub fn check_scenarios(dir: &Path) -> Vec<CheckOutcome> {
    let mut outcomes = Vec::new();
    let mut loaded = Vec::new();
    let mut missing = Vec::new();

    for (file, description, expected) in SCENARIOS {
        match std::fs::read_to_string(dir.join(file)) {
            Ok(text) => loaded.push((*description, text, *expected)),
            Err(_) => missing.push(*file),
        }
    }

    if missing.is_empty() {
        outcomes.push(CheckOutcome::pass(
            "Scenario files",
            format!("{} files present in {}", SCENARIOS.len(), dir.display()),
        ));
    } else {
        outcomes.push(CheckOutcome::fail(
            "Scenario files",
            format!("missing in {}: {}", dir.display(), missing.join(", ")),
        ));
    }

    for (description, text, expected) in loaded {
        outcomes.push(dry_run_detection(description, &text, expected));
    }
    outcomes
}

fn dry_run_detection(description: &str, text: &str, expected: Option<Platform>) -> CheckOutcome {
    let detected = detect_platforms(text);
    let labels = detected
        .iter()
        .map(|p| p.label())
        .collect::<Vec<_>>()
        .join(", ");
    let name = format!("Detection: {description}");
    match expected {
        Some(platform) if !detected.contains(&platform) => CheckOutcome::fail(
            name,
            format!("expected {platform}, detected [{labels}]"),
        ),
        _ => CheckOutcome::pass(name, format!("detected [{labels}]")),
    }
}

pub async fn check_database(database_url: Option<&str>) -> CheckOutcome {
    let Some(url) = database_url else {
        return CheckOutcome::pass("Database", "DATABASE_URL not set, records disabled");
    };
    let result = async {
        let pool = db::create_pool(url).await?;
        db::ping(&pool).await?;
        db::ensure_schema(&pool).await
    }
    .await;
    match result {
        Ok(()) => CheckOutcome::pass("Database", "reachable, schema ensured"),
        Err(e) => CheckOutcome::fail("Database", format!("unreachable: {e}")),
    }
}

pub async fn run_checks(config: &Config, analyzer: &dyn TextAnalyzer) -> CheckReport {
    let mut report = CheckReport::default();
    let credentials = check_credentials(&config.anthropic_api_key);
    let credentials_ok = credentials.passed;
    report.outcomes.push(credentials);
    if credentials_ok {
        report.outcomes.push(check_analyzer(analyzer).await);
    }
    report
        .outcomes
        .extend(check_scenarios(&config.scenario_dir));
    report
        .outcomes
        .push(check_database(config.database_url.as_deref()).await);
    report
}
