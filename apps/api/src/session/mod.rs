//! Per-session discovery state and its stores.
//!
//! Requests change a session through `SessionStore::update`, which applies
//! the mutation against the latest stored value. Sessions never share state.

pub mod handlers;
pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::discovery::analyzer::AnalysisResult;
use crate::intake::models::{CustomerProfile, UploadedContent};

pub use store::{MemorySessionStore, RedisSessionStore, SessionStore};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub id: Uuid,
    pub profile: Option<CustomerProfile>,
    pub uploads: Vec<UploadedContent>,
    pub analysis: Option<AnalysisResult>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Bumped by the store on every update.
    #[serde(default)]
    pub revision: u64,
}

impl SessionState {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            profile: None,
            uploads: Vec::new(),
            analysis: None,
            created_at: now,
            updated_at: now,
            revision: 0,
        }
    }

    /// Drops profile, uploads and analysis. The id is kept.
    pub fn reset(&mut self) {
        self.profile = None;
        self.uploads.clear();
        self.analysis = None;
        self.touch();
    }

    pub fn set_profile(&mut self, profile: CustomerProfile) {
        self.profile = Some(profile);
        self.touch();
    }

    /// Adds content and invalidates any earlier analysis.
    pub fn add_upload(&mut self, upload: UploadedContent) {
        self.uploads.push(upload);
        self.analysis = None;
        self.touch();
    }

    pub fn set_analysis(&mut self, analysis: AnalysisResult) {
        self.analysis = Some(analysis);
        self.touch();
    }

    /// All uploaded text in upload order, separated by blank lines.
    pub fn combined_text(&self) -> String {
        self.uploads
            .iter()
            .map(|u| u.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Identifies the analyzed content: upload ids in order.
    pub fn content_ids(&self) -> Vec<Uuid> {
        self.uploads.iter().map(|u| u.id).collect()
    }

    /// Stores `analysis` only when the uploads still match `content_ids`.
    /// Returns false when the content changed in the meantime.
    pub fn set_analysis_for(&mut self, content_ids: &[Uuid], analysis: AnalysisResult) -> bool {
        if self.content_ids() != content_ids {
            return false;
        }
        self.set_analysis(analysis);
        true
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::models::ContentKind;

    #[test]
    fn test_combined_text_joins_uploads_in_order() {
        let mut session = SessionState::new();
        session.add_upload(UploadedContent::new(
            session.id,
            "a.txt",
            ContentKind::Text,
            "First note.\n".to_string(),
        ));
        session.add_upload(UploadedContent::new(
            session.id,
            "b.txt",
            ContentKind::Text,
            "  ".to_string(),
        ));
        session.add_upload(UploadedContent::new(
            session.id,
            "c.txt",
            ContentKind::Text,
            "Second note.".to_string(),
        ));
        assert_eq!(session.combined_text(), "First note.\n\nSecond note.");
    }

    #[test]
    fn test_reset_clears_everything_but_id() {
        let mut session = SessionState::new();
        let id = session.id;
        session.add_upload(UploadedContent::new(id, "a.txt", ContentKind::Text, "x".into()));
        session.set_analysis(AnalysisResult::insufficient_content());
        session.reset();
        assert_eq!(session.id, id);
        assert!(session.uploads.is_empty());
        assert!(session.analysis.is_none());
        assert!(session.profile.is_none());
    }

    #[test]
    fn test_new_upload_invalidates_analysis() {
        let mut session = SessionState::new();
        session.set_analysis(AnalysisResult::insufficient_content());
        let id = session.id;
        session.add_upload(UploadedContent::new(id, "a.txt", ContentKind::Text, "x".into()));
        assert!(session.analysis.is_none());
    }

    #[test]
    fn test_analysis_for_changed_content_is_not_stored() {
        let mut session = SessionState::new();
        let id = session.id;
        session.add_upload(UploadedContent::new(id, "a.txt", ContentKind::Text, "x".into()));
        let analyzed = session.content_ids();

        session.add_upload(UploadedContent::new(id, "b.txt", ContentKind::Text, "y".into()));
        assert!(!session.set_analysis_for(&analyzed, AnalysisResult::insufficient_content()));
        assert!(session.analysis.is_none());

        let current = session.content_ids();
        assert!(session.set_analysis_for(&current, AnalysisResult::insufficient_content()));
        assert!(session.analysis.is_some());
    }
}
