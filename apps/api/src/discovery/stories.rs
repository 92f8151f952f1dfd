//! Reference-story lookup — maps detected platforms to canned customer-success
//! stories from a static catalog.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use crate::discovery::platforms::Platform;

/// A pre-written customer-success story. Title is unique within its bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceStory {
    pub title: &'static str,
    pub summary: &'static str,
    pub metrics: &'static str,
    pub quote: &'static str,
}

/// Catalog bucket a platform label maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoryBucket {
    SageMaker,
    Databricks,
    Azure,
    Excel,
    General,
}

pub const DEFAULT_MAX_STORIES: usize = 3;

const SAGEMAKER_STORIES: &[ReferenceStory] = &[
    ReferenceStory {
        title: "Scene+ - 66% Processing Time Reduction with Feature Store",
        summary: "Migrated from extensive Python scripts to Snowflake Feature Store, achieving 66% reduction in processing time with just 4 blocks of code vs extensive scripts",
        metrics: "66% processing time reduction, 4 blocks of code vs extensive Python scripts",
        quote: "Leveraging the straightforward Snowflake Feature Store drove a 66% reduction in processing time; we can join the model universe with the features with just four blocks of code.",
    },
    ReferenceStory {
        title: "Unnamed Customer - SageMaker vs Snowflake ML Comparison",
        summary: "Development time reduced from 2 weeks to 0 setup, production deployment from 3 weeks to <1 hour",
        metrics: "2-3 weeks setup → 0 setup, 3 weeks production → <1 hour, 1 day changes → <1 hour",
        quote: "Faster and cheaper dev to production for ML workflows in Snowflake",
    },
];

const DATABRICKS_STORIES: &[ReferenceStory] = &[
    ReferenceStory {
        title: "IGS Energy - 75% Cost Savings, Databricks Migration",
        summary: "Migrated from hundreds of thousands of individual models in Databricks to one unified model in Snowflake",
        metrics: "75% cost savings in training, 30 minutes → minutes for hundreds of thousands of customer forecasts",
        quote: "We can more easily build predictive models and mock up data products all in the Snowflake ecosystem because the data is all there.",
    },
    ReferenceStory {
        title: "Decile - 9.2x Speed Improvement, Spark to Snowflake ML",
        summary: "Customer Data + Analytics Platform migrated from managed Spark to Snowflake ML",
        metrics: "9.2x speedup (60 minutes to 6.5 minutes), intuitive SKLearn/XGBoost APIs",
        quote: "By bringing familiar modeling capabilities to Snowflake, Snowpark ML has enabled us to more rapidly iterate on our models, improving accuracy and operational efficiency.",
    },
    ReferenceStory {
        title: "Spark New Zealand - 9.2x Performance & Complexity Elimination",
        summary: "End-to-end marketing analytics migration from Spark infrastructure to Snowflake ML",
        metrics: "9.2x speed improvement vs Spark, eliminated complex deployment pipelines",
        quote: "Eliminate complexity, optimize performance, streamlined methodology eliminates necessity for intricate deployment pipelines",
    },
];

const AZURE_STORIES: &[ReferenceStory] = &[ReferenceStory {
    title: "S&P Global - 75% Time Savings",
    summary: "Migration from PySpark on Databricks to Snowflake ML",
    metrics: "75% time savings moving from PySpark to Snowflake ML",
    quote: "Significant time savings by moving from PySpark on Databricks to Snowflake ML",
}];

const EXCEL_STORIES: &[ReferenceStory] = &[ReferenceStory {
    title: "SpartanNash - Retail Forecasting Automation",
    summary: "Automated year-long sales forecasting for 183 locations, replacing manual Excel process",
    metrics: "Accuracy improved 71% → 88%, 5,200 hours/year → 5 minutes/week automated",
    quote: "We've been using Snowflake's ML-based forecasting function for three months now and have saved hours of effort while generating more accurate forecasts.",
}];

const GENERAL_STORIES: &[ReferenceStory] = &[
    ReferenceStory {
        title: "Fidelity Investments - Massive Feature Engineering Performance",
        summary: "Feature engineering performance improvements across large datasets",
        metrics: "77x speedup (MinMax Scaler), 50x speedup (One Hot Encoding), 17x speedup (Pearson Correlation)",
        quote: "Language of choice on a single platform, scalability without operational complexity, no governance trade-offs",
    },
    ReferenceStory {
        title: "Cloudbeds - 95% Accuracy with 24x Training Speed",
        summary: "Hospitality performance forecasting across 20,000 global properties",
        metrics: "95% forecasting accuracy, 30-minute experiments (down from 12+ hours), 5 experiments/day (up from 3/week)",
        quote: "Accelerated experimentation cycles, achieving 95% accuracy and efficiency gains of over 90% within a six-month forecasting window",
    },
];

impl StoryBucket {
    pub fn stories(self) -> &'static [ReferenceStory] {
        match self {
            StoryBucket::SageMaker => SAGEMAKER_STORIES,
            StoryBucket::Databricks => DATABRICKS_STORIES,
            StoryBucket::Azure => AZURE_STORIES,
            StoryBucket::Excel => EXCEL_STORIES,
            StoryBucket::General => GENERAL_STORIES,
        }
    }

    /// Bucket for a platform label. Labels without curated stories map to `None`.
    pub fn for_platform(platform: Platform) -> Option<StoryBucket> {
        match platform {
            Platform::SageMaker => Some(StoryBucket::SageMaker),
            Platform::Databricks => Some(StoryBucket::Databricks),
            Platform::AzureMl => Some(StoryBucket::Azure),
            Platform::ExcelManual => Some(StoryBucket::Excel),
            Platform::VertexAi | Platform::LocalCustom | Platform::Unknown => None,
        }
    }
}

/// Looks up stories for a label set.
///
/// Buckets are appended in platform priority order, deduplicated by title
/// (first occurrence wins) and truncated to `max` (at least one). An empty
/// result falls back to the general bucket, so the list is never empty.
pub fn lookup_stories(platforms: &BTreeSet<Platform>, max: usize) -> Vec<ReferenceStory> {
    let mut seen_titles = HashSet::new();
    let mut stories: Vec<ReferenceStory> = platforms
        .iter()
        .filter_map(|p| StoryBucket::for_platform(*p))
        .flat_map(|bucket| bucket.stories().iter())
        .filter(|story| seen_titles.insert(story.title))
        .cloned()
        .collect();

    if stories.is_empty() {
        stories.extend(StoryBucket::General.stories().iter().cloned());
    }

    stories.truncate(max.max(1));
    stories
}
