//! Platform detection — case-insensitive substring matching of competitor ML
//! platform names in free text.
//!
//! Matching is deliberately naive: any trigger present anywhere in the text
//! counts, with no word boundaries, scoring, or negation handling. Short
//! triggers such as "spark" or "local" therefore fire inside unrelated words.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Competitor ML platform labels.
///
/// Variant order is the fixed priority order used wherever labels are
/// iterated (story lookup, recommendations, rendering).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Platform {
    #[serde(rename = "AWS SageMaker")]
    SageMaker,
    #[serde(rename = "Databricks")]
    Databricks,
    #[serde(rename = "Azure ML")]
    AzureMl,
    #[serde(rename = "Google Vertex AI")]
    VertexAi,
    #[serde(rename = "Excel/Manual")]
    ExcelManual,
    #[serde(rename = "Local/Custom")]
    LocalCustom,
    /// Sentinel returned alone when no trigger matched.
    #[serde(rename = "Unknown")]
    Unknown,
}

/// Every detectable label in priority order (excludes the sentinel).
pub const DETECTABLE: [Platform; 6] = [
    Platform::SageMaker,
    Platform::Databricks,
    Platform::AzureMl,
    Platform::VertexAi,
    Platform::ExcelManual,
    Platform::LocalCustom,
];

impl Platform {
    pub fn label(self) -> &'static str {
        match self {
            Platform::SageMaker => "AWS SageMaker",
            Platform::Databricks => "Databricks",
            Platform::AzureMl => "Azure ML",
            Platform::VertexAi => "Google Vertex AI",
            Platform::ExcelManual => "Excel/Manual",
            Platform::LocalCustom => "Local/Custom",
            Platform::Unknown => "Unknown",
        }
    }

    /// Lowercase substrings whose presence marks this platform.
    pub fn triggers(self) -> &'static [&'static str] {
        match self {
            Platform::SageMaker => &["sagemaker", "aws sagemaker", "amazon sagemaker"],
            Platform::Databricks => &["databricks", "spark", "delta lake"],
            Platform::AzureMl => &["azure ml", "azure machine learning", "microsoft azure"],
            Platform::VertexAi => &["vertex ai", "google cloud", "gcp", "vertex"],
            Platform::ExcelManual => &["excel", "spreadsheet", "manual", "csv files"],
            Platform::LocalCustom => &["jupyter", "notebooks", "local", "python scripts"],
            Platform::Unknown => &[],
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Returns the platforms mentioned in `text`, or `{Unknown}` if none are.
pub fn detect_platforms(text: &str) -> BTreeSet<Platform> {
    let lowered = text.to_lowercase();

    let detected: BTreeSet<Platform> = DETECTABLE
        .into_iter()
        .filter(|p| p.triggers().iter().any(|t| lowered.contains(t)))
        .collect();

    if detected.is_empty() {
        BTreeSet::from([Platform::Unknown])
    } else {
        detected
    }
}

/// True when detection found nothing but the sentinel.
pub fn is_unknown(platforms: &BTreeSet<Platform>) -> bool {
    platforms.iter().all(|p| *p == Platform::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_without_triggers_is_unknown() {
        let detected = detect_platforms("We mostly talked about hiring plans and office space.");
        assert_eq!(detected, BTreeSet::from([Platform::Unknown]));
        assert!(is_unknown(&detected));
    }

    #[test]
    fn test_empty_text_is_unknown() {
        assert_eq!(detect_platforms(""), BTreeSet::from([Platform::Unknown]));
    }

    #[test]
    fn test_databricks_bill_scenario() {
        let detected = detect_platforms("Our Databricks bill went from $80K to $220K");
        assert_eq!(detected, BTreeSet::from([Platform::Databricks]));
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let detected = detect_platforms("They run AMAZON SAGEMAKER pipelines");
        assert!(detected.contains(&Platform::SageMaker));
    }

    #[test]
    fn test_every_trigger_fires_its_own_label() {
        for platform in DETECTABLE {
            for trigger in platform.triggers() {
                let text = format!("notes: {} was mentioned", trigger.to_uppercase());
                let detected = detect_platforms(&text);
                assert!(
                    detected.contains(&platform),
                    "trigger '{trigger}' did not detect {platform}"
                );
                assert!(!detected.contains(&Platform::Unknown));
            }
        }
    }

    #[test]
    fn test_multiple_platforms_are_all_reported_in_priority_order() {
        let detected = detect_platforms(
            "Forecasts live in Excel today, models train in SageMaker, ETL runs on Delta Lake",
        );
        let ordered: Vec<Platform> = detected.into_iter().collect();
        assert_eq!(
            ordered,
            vec![Platform::SageMaker, Platform::Databricks, Platform::ExcelManual]
        );
    }

    #[test]
    fn test_trigger_inside_compound_word_still_fires() {
        // Accepted false positive: "spark" inside a company name.
        let detected = detect_platforms("Met with the sparknewzealand marketing team");
        assert!(detected.contains(&Platform::Databricks));
    }

    #[test]
    fn test_platform_serializes_as_display_label() {
        let json = serde_json::to_string(&Platform::AzureMl).unwrap();
        assert_eq!(json, "\"Azure ML\"");
        let back: Platform = serde_json::from_str("\"Excel/Manual\"").unwrap();
        assert_eq!(back, Platform::ExcelManual);
    }
}
