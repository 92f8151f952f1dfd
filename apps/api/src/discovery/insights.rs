//! Heuristic insights — takeaways, recommendations, next steps and competitive
//! positioning derived from detected platforms and keyword triggers.
//!
//! Everything here is pure and runs without the hosted analyzer, so a report
//! still has substance when that service is unavailable.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::discovery::platforms::Platform;

const MAX_TAKEAWAYS: usize = 4;
const MAX_RECOMMENDATIONS: usize = 6;
const MAX_NEXT_STEPS: usize = 4;

pub const DEFAULT_TAKEAWAY: &str =
    "ML Modernization: Customer ready for ML platform evolution";

/// (headline trigger words, takeaway) pairs checked in order.
const TAKEAWAY_RULES: &[(&[&str], &str)] = &[
    (
        &["complex", "difficult", "challenge", "problem"],
        "Complexity Reduction: Customer struggling with operational complexity",
    ),
    (
        &["data movement", "data transfer", "egress"],
        "Data Movement Elimination: Opportunity to eliminate data transfer costs",
    ),
    (
        &["governance", "compliance", "audit", "lineage"],
        "Governance Enhancement: Customer needs better ML governance and compliance",
    ),
    (
        &["time to production", "deployment", "development"],
        "Faster Time to Production: Opportunity to accelerate ML deployment cycles",
    ),
];

pub const COST_TAKEAWAY: &str = "Cost Optimization Opportunity: Customer has significant infrastructure costs that could be reduced";

/// Extracts up to four takeaways from keyword triggers in the notes.
pub fn extract_takeaways(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut takeaways = Vec::new();

    // "$" is checked on the raw text so currency amounts count as cost signals.
    if lowered.contains("cost") || text.contains('$') {
        takeaways.push(COST_TAKEAWAY.to_string());
    }

    for (triggers, takeaway) in TAKEAWAY_RULES {
        if triggers.iter().any(|t| lowered.contains(t)) {
            takeaways.push(takeaway.to_string());
        }
    }

    if lowered.contains("databricks") {
        takeaways.push(
            "Databricks Displacement: Strong opportunity for competitive displacement".to_string(),
        );
    } else if lowered.contains("sagemaker") {
        takeaways.push("SageMaker Displacement: AWS platform consolidation opportunity".to_string());
    }

    if takeaways.is_empty() {
        return vec![DEFAULT_TAKEAWAY.to_string()];
    }
    takeaways.truncate(MAX_TAKEAWAYS);
    takeaways
}

fn platform_recommendations(platform: Platform) -> &'static [&'static str] {
    match platform {
        Platform::SageMaker => &[
            "Architecture Simplification: Highlight how Snowflake ML eliminates the need to stitch together multiple AWS services",
            "Data Movement Elimination: Emphasize cost savings from eliminating S3 ↔ Snowflake data transfers",
            "Time to Value: Demonstrate 0 setup time vs weeks of SageMaker configuration",
            "Reference Story: Share Scene+ success (66% processing time reduction)",
        ],
        Platform::Databricks => &[
            "Spark Complexity Elimination: Position Snowflake ML as Spark-free alternative",
            "Cost Transparency: Emphasize predictable pricing vs unpredictable DBU costs",
            "Operational Simplicity: Highlight managed infrastructure vs cluster optimization",
            "Reference Story: Share IGS Energy success (75% cost savings, Databricks migration)",
        ],
        Platform::AzureMl => &[
            "Multi-Cloud Strategy: Position Snowflake as cloud-agnostic alternative",
            "Governance Simplification: Address Delta Lake complexity concerns",
            "Unified Platform: Eliminate confusion between Azure ML and Databricks ML",
        ],
        Platform::ExcelManual => &[
            "ML Functions Approach: Recommend SQL-based ML Functions for easy adoption",
            "Automation Benefits: Highlight time savings and accuracy improvements",
            "Reference Story: Share SpartanNash success (71% → 88% accuracy, 5,200 hrs → 5 min)",
        ],
        Platform::VertexAi | Platform::LocalCustom | Platform::Unknown => &[],
    }
}

const DEFAULT_RECOMMENDATIONS: &[&str] = &[
    "Platform Assessment: Conduct detailed discovery of current ML infrastructure",
    "Use Case Identification: Map specific ML use cases to Snowflake ML capabilities",
    "POC Planning: Design proof-of-concept based on highest-impact use case",
];

/// Builds the numbered recommendation block for the detected platforms.
pub fn build_recommendations(platforms: &BTreeSet<Platform>) -> String {
    let mut items: Vec<&str> = platforms
        .iter()
        .flat_map(|p| platform_recommendations(*p).iter().copied())
        .collect();

    if items.is_empty() {
        items = DEFAULT_RECOMMENDATIONS.to_vec();
    }

    items
        .iter()
        .take(MAX_RECOMMENDATIONS)
        .enumerate()
        .map(|(i, rec)| format!("{}. {}", i + 1, rec))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Generates up to four next steps.
///
/// Only the first of Databricks, SageMaker, Excel/Manual contributes
/// platform steps; timeline, budget and team triggers add one step each.
pub fn generate_next_steps(platforms: &BTreeSet<Platform>, text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut steps: Vec<String> = Vec::new();

    let platform_steps: &[&str] = if platforms.contains(&Platform::Databricks) {
        &[
            "Schedule Databricks vs Snowflake ML cost comparison workshop",
            "Identify highest-cost Databricks workload for POC migration analysis",
            "Prepare Spark complexity elimination business case presentation",
        ]
    } else if platforms.contains(&Platform::SageMaker) {
        &[
            "Conduct SageMaker architecture assessment to identify integration pain points",
            "Demonstrate unified platform benefits with specific customer use case",
            "Calculate data movement cost savings with Snowflake ML",
        ]
    } else if platforms.contains(&Platform::ExcelManual) {
        &[
            "Design ML Functions proof-of-concept using customer's actual data",
            "Show forecasting accuracy improvements with live demonstration",
            "Plan pilot deployment timeline and success metrics",
        ]
    } else {
        &[]
    };
    steps.extend(platform_steps.iter().map(|s| s.to_string()));

    if contains_any(&lowered, &["quarter", "q1", "q2", "q3", "q4", "urgent", "timeline"]) {
        steps.push(
            "Create accelerated evaluation timeline to meet customer decision deadline".to_string(),
        );
    }
    if contains_any(&lowered, &["cfo", "budget", "cost", "roi"]) {
        steps.push(
            "Prepare detailed ROI analysis with cost comparison vs current platform".to_string(),
        );
    }
    if contains_any(&lowered, &["team", "scientist", "engineer", "developer"]) {
        steps.push(
            "Arrange technical deep-dive session with customer's data science team".to_string(),
        );
    }

    if steps.is_empty() {
        return vec![
            "Conduct detailed discovery session to map all current ML use cases".to_string(),
            "Identify highest-impact pilot opportunity for quick win demonstration".to_string(),
            "Develop migration strategy with phased approach and success metrics".to_string(),
        ];
    }
    steps.truncate(MAX_NEXT_STEPS);
    steps
}

fn contains_any(text: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| text.contains(t))
}

/// Static competitive notes for one platform.
#[derive(Debug, Clone, Serialize)]
pub struct CompetitiveProfile {
    pub platform: Platform,
    pub strengths: &'static [&'static str],
    pub weaknesses: &'static [&'static str],
    pub win_themes: &'static [&'static str],
}

/// Platforms with curated competitive notes.
pub const POSITIONED_PLATFORMS: [Platform; 3] =
    [Platform::SageMaker, Platform::Databricks, Platform::AzureMl];

pub fn competitive_profile(platform: Platform) -> Option<CompetitiveProfile> {
    let profile = match platform {
        Platform::SageMaker => CompetitiveProfile {
            platform,
            strengths: &[
                "'Mature' ML platform in capabilities and product marketing",
                "No gaps in ML features or tools",
                "Sticky ecosystem",
            ],
            weaknesses: &[
                "Not really a single platform - must stitch services together",
                "Architecture complexity to get model off ground",
                "Forced data movement & egress costs",
            ],
            win_themes: &[
                "Emphasize architecture simplicity",
                "Reduce time to value by starting and ending in Snowflake",
                "Land & Expand in ML pipeline",
                "If predictions come back to Snowflake, use our model registry",
            ],
        },
        Platform::Databricks => CompetitiveProfile {
            platform,
            strengths: &[
                "'Industry Leading' in ML mindshare",
                "Robust MLOps framework/experimentation",
                "Made for ML practitioners (lots of horsepower)",
            ],
            weaknesses: &[
                "Overwhelming and complex depending on ML maturity",
                "Spark experience required, cluster optimization needed",
                "Lack of cost transparency for ML projects start to finish",
            ],
            win_themes: &[
                "Grab attention with specific capability showcases",
                "Snowflake ML jobs for remote code execution",
                "Position multi-modal offerings - AI SQL + Snowflake ML",
            ],
        },
        Platform::AzureMl => CompetitiveProfile {
            platform,
            strengths: &[
                "Really good for all-in Microsoft ecosystem customers",
                "Tightly integrated to Microsoft services/Databricks",
                "Mature ML platform for practitioners",
            ],
            weaknesses: &[
                "Effectively single cloud when it comes to Azure ML",
                "Using both Databricks ML and Azure ML creates separation confusion",
                "Delta lake can add complexity and governance challenges",
            ],
            win_themes: &[
                "If delta lake users proud of 'open source', challenge Azure-centric stack",
                "Pitch multi-cloud capabilities",
                "Find pain points/governance challenges in bronze layer",
                "Land & Expand strategy",
            ],
        },
        Platform::VertexAi | Platform::ExcelManual | Platform::LocalCustom | Platform::Unknown => {
            return None
        }
    };
    Some(profile)
}
