use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;

/// Declares a closed form enumeration whose serde representation is the
/// human-readable label shown in the profile form.
macro_rules! labeled_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $label)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

labeled_enum!(Industry {
    Technology => "Technology",
    FinancialServices => "Financial Services",
    Healthcare => "Healthcare",
    Retail => "Retail",
    Manufacturing => "Manufacturing",
    MediaEntertainment => "Media & Entertainment",
    Transportation => "Transportation",
    Other => "Other",
});

labeled_enum!(CompanySize {
    Startup => "Startup (1-50)",
    Small => "Small (51-200)",
    Medium => "Medium (201-1000)",
    Large => "Large (1001-5000)",
    Enterprise => "Enterprise (5000+)",
});

labeled_enum!(MlMaturity {
    JustStarting => "Just Starting",
    Experimenting => "Experimenting",
    ProductionPilots => "Production Pilots",
    ScaledProduction => "Scaled Production",
    MlFirst => "ML-First Organization",
});

labeled_enum!(
    /// Platforms the customer self-reports in the profile form. Distinct from
    /// the detector's `Platform`, which is inferred from free text.
    CurrentPlatform {
        SageMaker => "AWS SageMaker",
        AzureMl => "Azure ML",
        GoogleCloudAi => "Google Cloud AI",
        Databricks => "Databricks",
        DataRobot => "DataRobot",
        H2o => "H2O.ai",
        ApacheSpark => "Apache Spark",
        Kubernetes => "Kubernetes",
        OnPremise => "On-Premise",
    }
);

labeled_enum!(UseCase {
    FraudDetection => "Fraud Detection",
    RecommendationSystems => "Recommendation Systems",
    PredictiveAnalytics => "Predictive Analytics",
    ComputerVision => "Computer Vision",
    NlpTextAnalytics => "NLP/Text Analytics",
    Forecasting => "Forecasting",
    CustomerSegmentation => "Customer Segmentation",
    RiskAssessment => "Risk Assessment",
    RealtimeInference => "Real-time Inference",
});

/// Structured customer profile captured from the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub company_name: String,
    pub industry: Industry,
    pub company_size: CompanySize,
    pub ml_maturity: MlMaturity,
    #[serde(default)]
    pub current_platforms: BTreeSet<CurrentPlatform>,
    #[serde(default)]
    pub use_cases: BTreeSet<UseCase>,
}

impl CustomerProfile {
    /// Only the company name needs checking; enumerations are enforced by
    /// deserialization. Trims the name in place.
    pub fn validate(mut self) -> Result<Self, AppError> {
        let trimmed = self.company_name.trim();
        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "company_name is required".to_string(),
            ));
        }
        self.company_name = trimmed.to_string();
        Ok(self)
    }
}

/// Upload type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Text,
    Pdf,
    Docx,
    Audio,
}

impl ContentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Text => "text",
            ContentKind::Pdf => "pdf",
            ContentKind::Docx => "docx",
            ContentKind::Audio => "audio",
        }
    }

    /// Maps a filename extension (case-insensitive) to a kind.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = filename.rsplit_once('.')?.1.to_ascii_lowercase();
        match ext.as_str() {
            "txt" => Some(ContentKind::Text),
            "pdf" => Some(ContentKind::Pdf),
            "docx" => Some(ContentKind::Docx),
            "mp3" => Some(ContentKind::Audio),
            _ => None,
        }
    }
}

/// A piece of customer content attached to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedContent {
    pub id: Uuid,
    pub session_id: Uuid,
    pub filename: String,
    pub kind: ContentKind,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl UploadedContent {
    pub fn new(session_id: Uuid, filename: impl Into<String>, kind: ContentKind, text: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            filename: filename.into(),
            kind,
            text,
            created_at: Utc::now(),
        }
    }
}
