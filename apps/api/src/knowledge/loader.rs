//! Reference-knowledge loader: splits customer-story and AE-training documents
//! into sections, summarizes and topic-tags each one, and reloads the
//! `reference_knowledge` table.

use std::path::Path;

use anyhow::{bail, Context, Result};
use sqlx::PgPool;
use tracing::{info, warn};

use crate::discovery::analyzer::{truncate_chars, TextAnalyzer};
use crate::intake::extract::pdf_to_text;
use crate::records::{replace_reference_knowledge, DocType, NewReferenceKnowledge};

/// Sections at or below this length are dropped.
pub const MIN_SECTION_CHARS: usize = 200;

/// Line prefixes that open a new section.
const SECTION_MARKERS: &[&str] = &[
    "# ",
    "## ",
    "### ",
    "Chapter ",
    "Section ",
    "Customer: ",
    "Company: ",
    "Use Case: ",
    "Solution: ",
];

/// Consecutive blank lines that also close a section.
const BLANK_RUN: usize = 2;

pub const KNOWLEDGE_TOPICS: &[&str] = &[
    "Customer Success Stories",
    "Competitive Analysis",
    "Data Engineering",
    "Machine Learning",
    "MLOps",
    "Model Training",
    "Model Deployment",
    "Data Science",
    "Analytics",
    "Migration Strategy",
    "POC Strategy",
    "Technical Architecture",
    "Compute Optimization",
    "Cost Analysis",
    "Industry Use Cases",
    "Platform Comparison",
];

fn starts_section(line: &str) -> bool {
    let line = line.trim_start();
    SECTION_MARKERS.iter().any(|m| line.starts_with(m))
}

/// Splits a document into sections on marker lines and blank-line runs,
/// keeping only sections longer than `MIN_SECTION_CHARS`.
pub fn split_into_sections(content: &str) -> Vec<String> {
    let mut sections = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut blank_run = 0;

    let mut flush = |current: &mut Vec<&str>| {
        let section = current.join("\n").trim().to_string();
        if !section.is_empty() {
            sections.push(section);
        }
        current.clear();
    };

    for line in content.lines() {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run == BLANK_RUN {
                flush(&mut current);
            }
            current.push(line);
            continue;
        }
        if starts_section(line) {
            flush(&mut current);
        }
        blank_run = 0;
        current.push(line);
    }
    flush(&mut current);

    sections
        .into_iter()
        .filter(|s| s.chars().count() > MIN_SECTION_CHARS)
        .collect()
}

/// Reads a `.pdf` through the PDF extractor, anything else as UTF-8 text.
pub fn read_document(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
    if is_pdf {
        pdf_to_text(&bytes).with_context(|| format!("Failed to parse {}", path.display()))
    } else {
        String::from_utf8(bytes).with_context(|| format!("{} is not valid UTF-8", path.display()))
    }
}

fn section_title(doc_type: DocType, index: usize) -> String {
    let family = match doc_type {
        DocType::CustomerStories => "Customer Story",
        DocType::AeTraining => "AE Training",
    };
    format!("{family} Section {}", index + 1)
}

/// Summarizes and classifies every section. Analyzer failures degrade to a
/// truncated excerpt and an empty topic list.
pub async fn prepare_sections(
    doc_type: DocType,
    content: &str,
    analyzer: &dyn TextAnalyzer,
) -> Vec<NewReferenceKnowledge> {
    let sections = split_into_sections(content);
    info!("{}: {} sections", doc_type.as_str(), sections.len());

    let mut prepared = Vec::with_capacity(sections.len());
    for (i, section) in sections.into_iter().enumerate() {
        let summary = match analyzer.summarize(&section).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!("Summary failed for section {}: {e}", i + 1);
                truncate_chars(&section, MIN_SECTION_CHARS).to_string()
            }
        };
        let topics = analyzer
            .classify(&section, KNOWLEDGE_TOPICS)
            .await
            .unwrap_or_else(|e| {
                warn!("Topic classification failed for section {}: {e}", i + 1);
                Vec::new()
            });
        prepared.push(NewReferenceKnowledge {
            doc_type,
            title: section_title(doc_type, i),
            content: section,
            summary,
            topics,
        });
    }
    prepared
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub customer_stories: usize,
    pub ae_training: usize,
}

/// Reads both documents, prepares their sections and, unless `pool` is
/// `None` (dry run), replaces the table contents.
pub async fn load_reference(
    stories: Option<&Path>,
    training: Option<&Path>,
    analyzer: &dyn TextAnalyzer,
    pool: Option<&PgPool>,
) -> Result<LoadSummary> {
    if stories.is_none() && training.is_none() {
        bail!("Nothing to load: pass --stories and/or --training");
    }

    let mut rows = Vec::new();
    let mut summary = LoadSummary::default();

    if let Some(path) = stories {
        let content = read_document(path)?;
        let prepared = prepare_sections(DocType::CustomerStories, &content, analyzer).await;
        summary.customer_stories = prepared.len();
        rows.extend(prepared);
    }
    if let Some(path) = training {
        let content = read_document(path)?;
        let prepared = prepare_sections(DocType::AeTraining, &content, analyzer).await;
        summary.ae_training = prepared.len();
        rows.extend(prepared);
    }

    match pool {
        Some(pool) => {
            let inserted = replace_reference_knowledge(pool, &rows).await?;
            info!("Replaced reference_knowledge with {inserted} rows");
        }
        None => info!("Dry run: {} sections prepared, database untouched", rows.len()),
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::discovery::analyzer::fake::FakeAnalyzer;

    fn filler(words: usize) -> String {
        vec!["Snowflake ML reduced training cost for this customer."; words].join(" ")
    }

    #[test]
    fn test_splits_on_markers_and_drops_short_sections() {
        let content = format!(
            "Intro line\n# Customer: IGS Energy\n{}\n## Short\ntiny\nCompany: Decile\n{}",
            filler(6),
            filler(6)
        );
        let sections = split_into_sections(&content);
        assert_eq!(sections.len(), 2);
        assert!(sections[0].starts_with("# Customer: IGS Energy"));
        assert!(sections[1].starts_with("Company: Decile"));
    }

    #[test]
    fn test_blank_line_runs_split_sections() {
        let content = format!("{}\n\n\n{}", filler(5), filler(5));
        let sections = split_into_sections(&content);
        assert_eq!(sections.len(), 2);
    }

    #[test]
    fn test_single_blank_line_does_not_split() {
        let content = format!("{}\n\n{}", filler(3), filler(3));
        assert_eq!(split_into_sections(&content).len(), 1);
    }

    #[test]
    fn test_short_document_yields_nothing() {
        assert!(split_into_sections("# Title\nOne line only.").is_empty());
    }

    #[tokio::test]
    async fn test_prepare_sections_titles_and_topics() {
        let analyzer = FakeAnalyzer::new();
        let content = format!("Customer: A\n{}\nCustomer: B\n{}", filler(5), filler(5));
        let prepared = prepare_sections(DocType::CustomerStories, &content, &analyzer).await;
        assert_eq!(prepared.len(), 2);
        assert_eq!(prepared[1].title, "Customer Story Section 2");
        assert_eq!(prepared[0].topics, vec!["MLOps"]);
        assert_eq!(prepared[0].summary, analyzer.summary);
        // summarize + classify per section
        assert_eq!(analyzer.call_count(), 4);
    }

    #[tokio::test]
    async fn test_prepare_sections_survives_analyzer_failure() {
        let analyzer = FakeAnalyzer::failing();
        let prepared =
            prepare_sections(DocType::AeTraining, &filler(6), &analyzer).await;
        assert_eq!(prepared.len(), 1);
        assert!(prepared[0].topics.is_empty());
        assert_eq!(prepared[0].summary.chars().count(), MIN_SECTION_CHARS);
    }

    #[tokio::test]
    async fn test_dry_run_load_counts_sections() {
        let mut stories = tempfile::NamedTempFile::new().unwrap();
        write!(stories, "Customer: A\n{}\nCustomer: B\n{}", filler(5), filler(5)).unwrap();

        let analyzer = FakeAnalyzer::new();
        let summary = load_reference(Some(stories.path()), None, &analyzer, None)
            .await
            .unwrap();
        assert_eq!(
            summary,
            LoadSummary {
                customer_stories: 2,
                ae_training: 0
            }
        );
    }

    #[tokio::test]
    async fn test_load_requires_a_document() {
        let analyzer = FakeAnalyzer::new();
        assert!(load_reference(None, None, &analyzer, None).await.is_err());
    }
}
