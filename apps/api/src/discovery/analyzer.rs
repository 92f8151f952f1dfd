//! Analysis pipeline — combines local heuristics with the hosted text-analysis
//! collaborator into an `AnalysisResult`.
//!
//! The collaborator is reached only through the `TextAnalyzer` trait. Its
//! failures never propagate: they become placeholder text and a note on the
//! result, so a report can always be rendered.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::config::Capabilities;
use crate::discovery::insights::{build_recommendations, extract_takeaways, generate_next_steps};
use crate::discovery::platforms::{detect_platforms, Platform};
use crate::discovery::prompts::{
    ANALYSIS_PROMPT, ANALYSIS_SYSTEM, CLASSIFY_PROMPT, NO_REFERENCE_KNOWLEDGE,
    STRATEGY_PROMPT, STRATEGY_SYSTEM, STRATEGY_TEMPERATURE, WORKLOAD_CLASSES,
};
use crate::intake::models::CustomerProfile;
use crate::llm_client::prompts::{JSON_ONLY_SYSTEM, SUMMARIZE_SYSTEM};
use crate::llm_client::{parse_json_reply, LlmClient, LlmError};

pub const CONTENT_TOO_SHORT_SUMMARY: &str = "Content too short for meaningful analysis";
pub const CONTENT_TOO_SHORT_RECOMMENDATIONS: &str = "Please provide more detailed customer information including current ML platform, pain points, and use cases.";
pub const INSUFFICIENT_CONTENT_TAKEAWAY: &str = "Insufficient content for analysis";
pub const SUMMARY_UNAVAILABLE: &str =
    "Summary unavailable: the text-analysis service could not process these notes.";
pub const RECOMMENDATIONS_UNAVAILABLE: &str =
    "Unable to generate recommendations due to technical issues";

/// Prefix of the customer notes forwarded to the strategy prompt.
const STRATEGY_CONTENT_CHARS: usize = 2000;

// ────────────────────────────────────────────────────────────────────────────
// Collaborator trait
// ────────────────────────────────────────────────────────────────────────────

/// Hosted text-analysis capability. Output has no guaranteed structure,
/// length, or factual grounding.
///
/// Carried in `AppState` as `Arc<dyn TextAnalyzer>`.
#[async_trait]
pub trait TextAnalyzer: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<String, LlmError>;

    async fn complete(
        &self,
        prompt: &str,
        system: &str,
        temperature: Option<f32>,
    ) -> Result<String, LlmError>;

    /// Returns the subset of `labels` the service considers applicable.
    async fn classify(&self, text: &str, labels: &[&str]) -> Result<Vec<String>, LlmError>;

    async fn transcribe(&self, audio: &[u8]) -> Result<String, LlmError>;
}

#[async_trait]
impl TextAnalyzer for LlmClient {
    async fn summarize(&self, text: &str) -> Result<String, LlmError> {
        self.call_text(text, SUMMARIZE_SYSTEM, None).await
    }

    async fn complete(
        &self,
        prompt: &str,
        system: &str,
        temperature: Option<f32>,
    ) -> Result<String, LlmError> {
        self.call_text(prompt, system, temperature).await
    }

    async fn classify(&self, text: &str, labels: &[&str]) -> Result<Vec<String>, LlmError> {
        let label_list = labels
            .iter()
            .map(|l| format!("- {l}"))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = CLASSIFY_PROMPT
            .replace("{labels}", &label_list)
            .replace("{content}", text);
        let chosen: Vec<String> = self.call_json(&prompt, JSON_ONLY_SYSTEM).await?;
        Ok(retain_known_labels(chosen, labels))
    }

    async fn transcribe(&self, _audio: &[u8]) -> Result<String, LlmError> {
        Err(LlmError::Unsupported("audio transcription"))
    }
}

/// Keeps labels from the allowed list (case-insensitive), in first-seen order.
pub fn retain_known_labels(chosen: Vec<String>, labels: &[&str]) -> Vec<String> {
    let mut kept: Vec<String> = Vec::new();
    for label in chosen {
        let canonical = labels
            .iter()
            .find(|known| known.eq_ignore_ascii_case(label.trim()));
        if let Some(known) = canonical {
            if !kept.iter().any(|k| k == known) {
                kept.push(known.to_string());
            }
        }
    }
    kept
}

// ────────────────────────────────────────────────────────────────────────────
// Result models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Complete,
    InsufficientContent,
    /// The collaborator failed and placeholders were substituted.
    Degraded,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompetitiveAnalysis {
    pub current_platforms: Vec<String>,
    pub snowflake_advantages: Vec<String>,
    pub competitive_risks: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputeUpside {
    pub estimated_workloads: String,
    pub potential_compute_increase: String,
    pub revenue_opportunity: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyPlan {
    pub short_term: Vec<String>,
    pub long_term: Vec<String>,
}

/// Structured account strategy requested from the collaborator.
/// Every field is optional in the model output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyBrief {
    pub executive_summary: String,
    pub competitive_analysis: CompetitiveAnalysis,
    pub compute_upside: ComputeUpside,
    pub strategy: StrategyPlan,
    pub discovery_questions: Vec<String>,
    pub poc_recommendations: Vec<String>,
    pub risks_to_avoid: Vec<String>,
}

/// Strategy brief as parsed JSON, or the raw reply when it was not valid JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", content = "data", rename_all = "snake_case")]
pub enum BriefOutcome {
    Structured(StrategyBrief),
    Raw(String),
}

impl BriefOutcome {
    pub fn from_reply(reply: &str) -> Self {
        match parse_json_reply::<StrategyBrief>(reply) {
            Ok(brief) => BriefOutcome::Structured(brief),
            Err(e) => {
                warn!("Strategy brief was not valid JSON, keeping raw text: {e}");
                BriefOutcome::Raw(reply.to_string())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub summary: String,
    pub narrative: Option<String>,
    pub platforms: BTreeSet<Platform>,
    pub workload_categories: Vec<String>,
    pub takeaways: Vec<String>,
    pub recommendations: String,
    pub next_steps: Vec<String>,
    pub strategy_brief: Option<BriefOutcome>,
    pub status: AnalysisStatus,
    /// Collaborator problems worth surfacing next to the report.
    pub notes: Vec<String>,
}

impl AnalysisResult {
    /// Fixed result for input below the length threshold.
    pub fn insufficient_content() -> Self {
        Self {
            summary: CONTENT_TOO_SHORT_SUMMARY.to_string(),
            narrative: None,
            platforms: BTreeSet::from([Platform::Unknown]),
            workload_categories: Vec::new(),
            takeaways: vec![INSUFFICIENT_CONTENT_TAKEAWAY.to_string()],
            recommendations: CONTENT_TOO_SHORT_RECOMMENDATIONS.to_string(),
            next_steps: Vec::new(),
            strategy_brief: None,
            status: AnalysisStatus::InsufficientContent,
            notes: Vec::new(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct AnalysisOptions {
    pub capabilities: Capabilities,
    pub min_analysis_chars: usize,
}

/// Inputs that only the strategy brief consumes.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalysisContext<'a> {
    pub profile: Option<&'a CustomerProfile>,
    pub reference_knowledge: Option<&'a str>,
}

/// Runs the analysis pipeline. Never fails; see module docs.
///
/// Steps:
/// 1. length guard → fixed result, no collaborator call
/// 2. platform detection, takeaways, recommendations, next steps (local)
/// 3. summarize (failure → placeholders, remaining calls skipped)
/// 4. narrative, workload classification, strategy brief (per capability)
pub async fn analyze_content(
    text: &str,
    context: AnalysisContext<'_>,
    analyzer: &dyn TextAnalyzer,
    permits: &Semaphore,
    options: &AnalysisOptions,
) -> AnalysisResult {
    let trimmed = text.trim();
    if trimmed.chars().count() < options.min_analysis_chars {
        info!(
            "Content below {} chars, skipping analysis",
            options.min_analysis_chars
        );
        return AnalysisResult::insufficient_content();
    }

    let platforms = detect_platforms(trimmed);
    let takeaways = extract_takeaways(trimmed);
    let next_steps = generate_next_steps(&platforms, trimmed);

    let mut result = AnalysisResult {
        summary: String::new(),
        narrative: None,
        recommendations: build_recommendations(&platforms),
        platforms,
        workload_categories: Vec::new(),
        takeaways,
        next_steps,
        strategy_brief: None,
        status: AnalysisStatus::Complete,
        notes: Vec::new(),
    };

    // A closed semaphore only happens during shutdown; proceed unthrottled.
    let _permit = permits.acquire().await.ok();

    match analyzer.summarize(trimmed).await {
        Ok(summary) => result.summary = summary,
        Err(e) => {
            warn!("Summarization failed, substituting placeholders: {e}");
            result.summary = SUMMARY_UNAVAILABLE.to_string();
            result.recommendations = RECOMMENDATIONS_UNAVAILABLE.to_string();
            result.status = AnalysisStatus::Degraded;
            result.notes.push(format!("Text analysis unavailable: {e}"));
            return result;
        }
    }

    let caps = options.capabilities;

    if caps.narrative {
        let prompt = ANALYSIS_PROMPT.replace("{content}", trimmed);
        match analyzer.complete(&prompt, ANALYSIS_SYSTEM, None).await {
            Ok(narrative) => result.narrative = Some(narrative),
            Err(e) => {
                warn!("Narrative analysis failed: {e}");
                result.notes.push(format!("Narrative analysis unavailable: {e}"));
            }
        }
    }

    if caps.workload_classification {
        match analyzer.classify(trimmed, WORKLOAD_CLASSES).await {
            Ok(categories) => result.workload_categories = categories,
            Err(e) => {
                warn!("Workload classification failed: {e}");
                result
                    .notes
                    .push(format!("Workload classification unavailable: {e}"));
            }
        }
    }

    if caps.strategy_brief {
        let prompt = build_strategy_prompt(trimmed, &result, context);
        match analyzer
            .complete(&prompt, STRATEGY_SYSTEM, Some(STRATEGY_TEMPERATURE))
            .await
        {
            Ok(reply) => result.strategy_brief = Some(BriefOutcome::from_reply(&reply)),
            Err(e) => {
                warn!("Strategy brief failed: {e}");
                result.notes.push(format!("Strategy brief unavailable: {e}"));
            }
        }
    }

    result
}

fn build_strategy_prompt(
    text: &str,
    partial: &AnalysisResult,
    context: AnalysisContext<'_>,
) -> String {
    let customer = json!({
        "profile": context.profile,
        "detected_platforms": partial.platforms,
        "content_summary": partial.summary,
        "content_classification": partial.workload_categories,
        "full_content": truncate_chars(text, STRATEGY_CONTENT_CHARS),
    });
    let customer_json =
        serde_json::to_string_pretty(&customer).unwrap_or_else(|_| customer.to_string());

    STRATEGY_PROMPT
        .replace("{customer_json}", &customer_json)
        .replace(
            "{reference_knowledge}",
            context
                .reference_knowledge
                .filter(|k| !k.trim().is_empty())
                .unwrap_or(NO_REFERENCE_KNOWLEDGE),
        )
}

/// Returns at most `max` characters of `text` without splitting a code point.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Test double
// ────────────────────────────────────────────────────────────────────────────


#[cfg(test)]
mod tests {
    use super::fake::FakeAnalyzer;
    use super::*;

    const BILL_NOTES: &str = "Our Databricks bill went from $80K to $220K";

    fn options(capabilities: Capabilities) -> AnalysisOptions {
        AnalysisOptions {
            capabilities,
            min_analysis_chars: 32,
        }
    }

    fn all_capabilities() -> Capabilities {
        Capabilities {
            narrative: true,
            workload_classification: true,
            strategy_brief: true,
            document_parsing: true,
            audio_transcription: true,
        }
    }

    #[tokio::test]
    async fn test_short_input_skips_collaborator() {
        let analyzer = FakeAnalyzer::new();
        let permits = Semaphore::new(1);
        let result = analyze_content(
            "hi",
            AnalysisContext::default(),
            &analyzer,
            &permits,
            &options(Capabilities::default()),
        )
        .await;

        assert_eq!(result, AnalysisResult::insufficient_content());
        assert_eq!(result.summary, CONTENT_TOO_SHORT_SUMMARY);
        assert_eq!(analyzer.call_count(), 0);
    }

    #[tokio::test]
    async fn test_whitespace_padding_does_not_count_toward_length() {
        let analyzer = FakeAnalyzer::new();
        let permits = Semaphore::new(1);
        let padded = format!("{:^80}", "hi");
        let result = analyze_content(
            &padded,
            AnalysisContext::default(),
            &analyzer,
            &permits,
            &options(Capabilities::default()),
        )
        .await;
        assert_eq!(result.status, AnalysisStatus::InsufficientContent);
        assert_eq!(analyzer.call_count(), 0);
    }

    #[tokio::test]
    async fn test_databricks_bill_scenario() {
        let analyzer = FakeAnalyzer::new();
        let permits = Semaphore::new(1);
        let result = analyze_content(
            BILL_NOTES,
            AnalysisContext::default(),
            &analyzer,
            &permits,
            &options(Capabilities::default()),
        )
        .await;

        assert_eq!(result.status, AnalysisStatus::Complete);
        assert_eq!(result.platforms, BTreeSet::from([Platform::Databricks]));
        assert!(result.takeaways[0].starts_with("Cost Optimization"));
        assert_eq!(result.summary, analyzer.summary);
        assert_eq!(result.narrative.as_deref(), Some("Narrative analysis."));
        // summarize + narrative
        assert_eq!(analyzer.call_count(), 2);
    }

    #[tokio::test]
    async fn test_collaborator_failure_substitutes_placeholders() {
        let analyzer = FakeAnalyzer::failing();
        let permits = Semaphore::new(1);
        let result = analyze_content(
            BILL_NOTES,
            AnalysisContext::default(),
            &analyzer,
            &permits,
            &options(all_capabilities()),
        )
        .await;

        assert_eq!(result.status, AnalysisStatus::Degraded);
        assert_eq!(result.summary, SUMMARY_UNAVAILABLE);
        assert_eq!(result.recommendations, RECOMMENDATIONS_UNAVAILABLE);
        assert!(result.narrative.is_none());
        assert!(result.strategy_brief.is_none());
        assert_eq!(result.notes.len(), 1);
        // Local heuristics still populate the rest of the report.
        assert_eq!(result.platforms, BTreeSet::from([Platform::Databricks]));
        assert_eq!(analyzer.call_count(), 1);
    }

    #[tokio::test]
    async fn test_later_stage_failures_keep_summary_and_add_notes() {
        let analyzer = FakeAnalyzer::failing_on(&["complete", "classify"]);
        let permits = Semaphore::new(1);
        let result = analyze_content(
            BILL_NOTES,
            AnalysisContext::default(),
            &analyzer,
            &permits,
            &options(all_capabilities()),
        )
        .await;

        assert_eq!(result.status, AnalysisStatus::Complete);
        assert_eq!(result.summary, analyzer.summary);
        assert!(result.narrative.is_none());
        assert!(result.strategy_brief.is_none());
        assert!(result.workload_categories.is_empty());
        assert_eq!(result.notes.len(), 3);
        assert!(result.notes[0].starts_with("Narrative analysis unavailable"));
        assert!(result.notes[1].starts_with("Workload classification unavailable"));
        assert!(result.notes[2].starts_with("Strategy brief unavailable"));
        // summarize + narrative + classify + strategy brief
        assert_eq!(analyzer.call_count(), 4);
    }

    #[tokio::test]
    async fn test_structured_strategy_brief_is_parsed() {
        let analyzer = FakeAnalyzer::with_completion(
            r#"{"executive_summary": "Big opportunity.", "discovery_questions": ["Who owns the budget?"]}"#,
        );
        let permits = Semaphore::new(1);
        let caps = Capabilities {
            narrative: false,
            strategy_brief: true,
            ..Capabilities::default()
        };
        let result = analyze_content(
            BILL_NOTES,
            AnalysisContext {
                profile: None,
                reference_knowledge: Some("IGS Energy saved 75%."),
            },
            &analyzer,
            &permits,
            &options(caps),
        )
        .await;

        match result.strategy_brief {
            Some(BriefOutcome::Structured(brief)) => {
                assert_eq!(brief.executive_summary, "Big opportunity.");
                assert_eq!(brief.discovery_questions, vec!["Who owns the budget?"]);
                assert!(brief.risks_to_avoid.is_empty());
            }
            other => panic!("expected structured brief, got {other:?}"),
        }
        let prompts = analyzer.prompts.lock().unwrap();
        assert!(prompts.last().unwrap().contains("IGS Energy saved 75%."));
    }

    #[tokio::test]
    async fn test_unparseable_strategy_brief_keeps_raw_text() {
        let analyzer = FakeAnalyzer::with_completion("Sure! Here is my analysis: push hard.");
        let permits = Semaphore::new(1);
        let caps = Capabilities {
            narrative: false,
            strategy_brief: true,
            ..Capabilities::default()
        };
        let result = analyze_content(
            BILL_NOTES,
            AnalysisContext::default(),
            &analyzer,
            &permits,
            &options(caps),
        )
        .await;

        assert_eq!(
            result.strategy_brief,
            Some(BriefOutcome::Raw(
                "Sure! Here is my analysis: push hard.".to_string()
            ))
        );
        let prompts = analyzer.prompts.lock().unwrap();
        assert!(prompts.last().unwrap().contains(NO_REFERENCE_KNOWLEDGE));
    }

    #[tokio::test]
    async fn test_workload_classification_when_enabled() {
        let analyzer = FakeAnalyzer::new();
        let permits = Semaphore::new(1);
        let caps = Capabilities {
            narrative: false,
            workload_classification: true,
            ..Capabilities::default()
        };
        let result = analyze_content(
            BILL_NOTES,
            AnalysisContext::default(),
            &analyzer,
            &permits,
            &options(caps),
        )
        .await;
        assert_eq!(result.workload_categories, vec!["MLOps"]);
        assert!(result.narrative.is_none());
        assert_eq!(analyzer.call_count(), 2);
    }

    #[test]
    fn test_retain_known_labels_filters_and_canonicalizes() {
        let chosen = vec![
            "mlops".to_string(),
            "Quantum Computing".to_string(),
            "MLOps".to_string(),
            " Analytics ".to_string(),
        ];
        let kept = retain_known_labels(chosen, WORKLOAD_CLASSES);
        assert_eq!(kept, vec!["MLOps", "Analytics"]);
    }

    #[test]
    fn test_truncate_chars_respects_code_points() {
        assert_eq!(truncate_chars("71% → 88%", 5), "71% →");
        assert_eq!(truncate_chars("short", 100), "short");
    }
}
