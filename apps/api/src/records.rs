//! Best-effort Postgres records of uploads, profiles, analyses and the
//! reference-knowledge corpus. All statements are parameterized.
//!
//! The `record_*` helpers swallow and log failures; the service stays usable
//! without a database.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use tracing::warn;
use uuid::Uuid;

use crate::discovery::analyzer::{truncate_chars, AnalysisResult};
use crate::intake::models::{CustomerProfile, UploadedContent};

/// Reference-knowledge document families loaded by `load-reference`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocType {
    CustomerStories,
    AeTraining,
}

impl DocType {
    pub fn as_str(self) -> &'static str {
        match self {
            DocType::CustomerStories => "customer_stories",
            DocType::AeTraining => "ae_training",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReferenceKnowledgeRow {
    pub id: Uuid,
    pub doc_type: String,
    pub title: String,
    pub content: String,
    pub summary: String,
    pub topics: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// A section ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReferenceKnowledge {
    pub doc_type: DocType,
    pub title: String,
    pub content: String,
    pub summary: String,
    pub topics: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Session content
// ────────────────────────────────────────────────────────────────────────────

pub async fn insert_upload(pool: &PgPool, upload: &UploadedContent) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO customer_uploads (id, session_id, filename, kind, extracted_text, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(upload.id)
    .bind(upload.session_id)
    .bind(&upload.filename)
    .bind(upload.kind.as_str())
    .bind(&upload.text)
    .bind(upload.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn upsert_profile(
    pool: &PgPool,
    session_id: Uuid,
    profile: &CustomerProfile,
) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO customer_profiles (session_id, company_name, profile, updated_at)
        VALUES ($1, $2, $3, now())
        ON CONFLICT (session_id)
        DO UPDATE SET company_name = EXCLUDED.company_name,
                      profile = EXCLUDED.profile,
                      updated_at = now()
        "#,
    )
    .bind(session_id)
    .bind(&profile.company_name)
    .bind(sqlx::types::Json(profile))
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn insert_analysis(
    pool: &PgPool,
    session_id: Option<Uuid>,
    result: &AnalysisResult,
) -> sqlx::Result<Uuid> {
    let id = Uuid::new_v4();
    let status = serde_json::to_value(result.status)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    sqlx::query(
        r#"
        INSERT INTO analysis_results (id, session_id, status, result)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(id)
    .bind(session_id)
    .bind(status)
    .bind(sqlx::types::Json(result))
    .execute(pool)
    .await?;
    Ok(id)
}

/// Removes everything stored for a session (profile and uploads).
pub async fn delete_session_records(pool: &PgPool, session_id: Uuid) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM customer_uploads WHERE session_id = $1")
        .bind(session_id)
        .execute(pool)
        .await?;
    sqlx::query("DELETE FROM customer_profiles WHERE session_id = $1")
        .bind(session_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn record_upload(pool: Option<&PgPool>, upload: &UploadedContent) {
    if let Some(pool) = pool {
        if let Err(e) = insert_upload(pool, upload).await {
            warn!("Failed to record upload {}: {e}", upload.id);
        }
    }
}

pub async fn record_profile(pool: Option<&PgPool>, session_id: Uuid, profile: &CustomerProfile) {
    if let Some(pool) = pool {
        if let Err(e) = upsert_profile(pool, session_id, profile).await {
            warn!("Failed to record profile for session {session_id}: {e}");
        }
    }
}

pub async fn record_analysis(pool: Option<&PgPool>, session_id: Option<Uuid>, result: &AnalysisResult) {
    if let Some(pool) = pool {
        if let Err(e) = insert_analysis(pool, session_id, result).await {
            warn!("Failed to record analysis: {e}");
        }
    }
}

pub async fn record_session_reset(pool: Option<&PgPool>, session_id: Uuid) {
    if let Some(pool) = pool {
        if let Err(e) = delete_session_records(pool, session_id).await {
            warn!("Failed to clear records for session {session_id}: {e}");
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Reference knowledge
// ────────────────────────────────────────────────────────────────────────────

/// Clears the table and inserts `sections` in one transaction.
pub async fn replace_reference_knowledge(
    pool: &PgPool,
    sections: &[NewReferenceKnowledge],
) -> sqlx::Result<u64> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM reference_knowledge")
        .execute(&mut *tx)
        .await?;

    let mut inserted = 0;
    for section in sections {
        sqlx::query(
            r#"
            INSERT INTO reference_knowledge (id, doc_type, title, content, summary, topics)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(section.doc_type.as_str())
        .bind(&section.title)
        .bind(&section.content)
        .bind(&section.summary)
        .bind(&section.topics)
        .execute(&mut *tx)
        .await?;
        inserted += 1;
    }

    tx.commit().await?;
    Ok(inserted)
}

pub async fn fetch_reference_knowledge(
    pool: &PgPool,
    limit: i64,
) -> sqlx::Result<Vec<ReferenceKnowledgeRow>> {
    sqlx::query_as(
        r#"
        SELECT id, doc_type, title, content, summary, topics, created_at
        FROM reference_knowledge
        ORDER BY doc_type, created_at
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// (doc_type, count) pairs.
pub async fn reference_counts(pool: &PgPool) -> sqlx::Result<Vec<(String, i64)>> {
    sqlx::query_as(
        "SELECT doc_type, COUNT(*) FROM reference_knowledge GROUP BY doc_type ORDER BY doc_type",
    )
    .fetch_all(pool)
    .await
}

const KNOWLEDGE_ROWS: i64 = 10;
const KNOWLEDGE_CHARS: usize = 4000;

/// Digest of stored reference knowledge for the strategy prompt.
/// `None` without a database, on error, or when the table is empty.
pub async fn reference_digest(pool: Option<&PgPool>) -> Option<String> {
    let rows = match fetch_reference_knowledge(pool?, KNOWLEDGE_ROWS).await {
        Ok(rows) => rows,
        Err(e) => {
            warn!("Failed to load reference knowledge: {e}");
            return None;
        }
    };
    let digest = format_digest(&rows);
    (!digest.is_empty()).then(|| truncate_chars(&digest, KNOWLEDGE_CHARS).to_string())
}

fn format_digest(rows: &[ReferenceKnowledgeRow]) -> String {
    rows.iter()
        .map(|row| {
            let topics = if row.topics.is_empty() {
                String::new()
            } else {
                format!(" [{}]", row.topics.join(", "))
            };
            format!("- ({}) {}{}: {}", row.doc_type, row.title, topics, row.summary)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
