//! Text extraction for uploaded files.
//!
//! | kind  | handling                                              |
//! |-------|-------------------------------------------------------|
//! | txt   | must be UTF-8                                         |
//! | pdf   | `pdf-extract` on the blocking pool                    |
//! | docx  | rejected, user is asked to paste text or save as PDF  |
//! | mp3   | `TextAnalyzer::transcribe`, under the analysis permits |

use bytes::Bytes;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::config::Capabilities;
use crate::discovery::analyzer::TextAnalyzer;
use crate::errors::AppError;
use crate::intake::models::ContentKind;

pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "pdf", "docx", "mp3"];

pub const DOCX_REMEDIATION: &str =
    "DOCX files cannot be read yet. Save the document as PDF or paste its text into the notes field.";

/// Extracts text from PDF bytes. Synchronous; callers on the runtime should
/// go through `extract_pdf`.
pub fn pdf_to_text(bytes: &[u8]) -> anyhow::Result<String> {
    pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| anyhow::anyhow!("PDF extraction failed: {e}"))
}

async fn extract_pdf(bytes: Bytes) -> Result<String, AppError> {
    extract_blocking(move || pdf_to_text(&bytes)).await
}

/// Runs a parser on the blocking pool. Parser errors and panics on malformed
/// input are both unprocessable uploads.
async fn extract_blocking<F>(parse: F) -> Result<String, AppError>
where
    F: FnOnce() -> anyhow::Result<String> + Send + 'static,
{
    match tokio::task::spawn_blocking(parse).await {
        Ok(result) => result.map_err(|e| AppError::UnprocessableEntity(e.to_string())),
        Err(e) if e.is_panic() => {
            warn!("Document parser panicked: {e}");
            Err(AppError::UnprocessableEntity(
                "The document appears to be malformed and could not be read".to_string(),
            ))
        }
        Err(e) => Err(AppError::Internal(anyhow::anyhow!(
            "Extraction task failed: {e}"
        ))),
    }
}

/// Resolves the kind of an upload and extracts its text.
pub async fn extract_text(
    filename: &str,
    bytes: Bytes,
    capabilities: &Capabilities,
    analyzer: &dyn TextAnalyzer,
    permits: &Semaphore,
) -> Result<(ContentKind, String), AppError> {
    let kind = ContentKind::from_filename(filename).ok_or_else(|| {
        AppError::UnsupportedMedia(format!(
            "Unsupported file type: {filename}. Supported types: {}",
            SUPPORTED_EXTENSIONS.join(", ")
        ))
    })?;

    let text = match kind {
        ContentKind::Text => String::from_utf8(bytes.to_vec()).map_err(|_| {
            AppError::Validation(format!("{filename} is not valid UTF-8 text"))
        })?,
        ContentKind::Pdf => {
            if !capabilities.document_parsing {
                return Err(AppError::UnprocessableEntity(
                    "PDF parsing is disabled. Paste the document text into the notes field."
                        .to_string(),
                ));
            }
            extract_pdf(bytes).await?
        }
        ContentKind::Docx => {
            warn!("Rejected DOCX upload {filename}");
            return Err(AppError::UnprocessableEntity(DOCX_REMEDIATION.to_string()));
        }
        ContentKind::Audio => {
            if !capabilities.audio_transcription {
                return Err(AppError::UnprocessableEntity(
                    "Audio transcription is disabled. Upload a transcript as a .txt file instead."
                        .to_string(),
                ));
            }
            let _permit = permits.acquire().await.ok();
            analyzer
                .transcribe(&bytes)
                .await
                .map_err(|e| AppError::Llm(format!("Transcription of {filename} failed: {e}")))?
        }
    };

    if text.trim().is_empty() {
        return Err(AppError::UnprocessableEntity(format!(
            "No text could be extracted from {filename}"
        )));
    }

    info!(
        "Extracted {} chars from {filename} ({})",
        text.chars().count(),
        kind.as_str()
    );
    Ok((kind, text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::analyzer::fake::FakeAnalyzer;

    fn permits() -> Semaphore {
        Semaphore::new(1)
    }

    fn caps(audio: bool) -> Capabilities {
        Capabilities {
            audio_transcription: audio,
            ..Capabilities::default()
        }
    }

    #[tokio::test]
    async fn test_plain_text_upload() {
        let analyzer = FakeAnalyzer::new();
        let (kind, text) = extract_text(
            "notes.txt",
            Bytes::from_static(b"We use SageMaker for churn."),
            &caps(false),
            &analyzer,
            &permits(),
        )
        .await
        .unwrap();
        assert_eq!(kind, ContentKind::Text);
        assert_eq!(text, "We use SageMaker for churn.");
        assert_eq!(analyzer.call_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_validation_error() {
        let analyzer = FakeAnalyzer::new();
        let err = extract_text(
            "notes.txt",
            Bytes::from_static(&[0xff, 0xfe, 0x00]),
            &caps(false),
            &analyzer,
            &permits(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_docx_rejected_with_remediation() {
        let analyzer = FakeAnalyzer::new();
        let err = extract_text("brief.docx", Bytes::from_static(b"PK"), &caps(false), &analyzer, &permits())
            .await
            .unwrap_err();
        match err {
            AppError::UnprocessableEntity(msg) => assert_eq!(msg, DOCX_REMEDIATION),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_extension_rejected() {
        let analyzer = FakeAnalyzer::new();
        let err = extract_text("chart.png", Bytes::from_static(b"x"), &caps(false), &analyzer, &permits())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnsupportedMedia(_)));
    }

    #[tokio::test]
    async fn test_audio_requires_capability() {
        let analyzer = FakeAnalyzer::new();
        let err = extract_text("call.mp3", Bytes::from_static(b"ID3"), &caps(false), &analyzer, &permits())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnprocessableEntity(_)));
        assert_eq!(analyzer.call_count(), 0);
    }

    #[tokio::test]
    async fn test_audio_is_transcribed_when_enabled() {
        let analyzer = FakeAnalyzer::new();
        let (kind, text) =
            extract_text("call.mp3", Bytes::from_static(b"ID3"), &caps(true), &analyzer, &permits())
                .await
                .unwrap();
        assert_eq!(kind, ContentKind::Audio);
        assert!(text.contains("SageMaker"));
        assert_eq!(analyzer.call_count(), 1);
    }

    #[tokio::test]
    async fn test_transcription_failure_maps_to_llm_error() {
        let analyzer = FakeAnalyzer::failing();
        let err = extract_text("call.mp3", Bytes::from_static(b"ID3"), &caps(true), &analyzer, &permits())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Llm(_)));
    }

    #[tokio::test]
    async fn test_blank_text_is_rejected() {
        let analyzer = FakeAnalyzer::new();
        let err = extract_text("empty.txt", Bytes::from_static(b"  \n "), &caps(false), &analyzer, &permits())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnprocessableEntity(_)));
    }

    #[tokio::test]
    async fn test_garbage_pdf_is_unprocessable() {
        let analyzer = FakeAnalyzer::new();
        let err = extract_text(
            "deck.pdf",
            Bytes::from_static(b"definitely not a pdf"),
            &caps(false),
            &analyzer,
            &permits(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::UnprocessableEntity(_)));
    }

    #[tokio::test]
    async fn test_parser_panic_is_unprocessable() {
        let err = extract_blocking(|| panic!("bad xref table")).await.unwrap_err();
        assert!(matches!(err, AppError::UnprocessableEntity(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_transcription_waits_for_an_analysis_permit() {
        let analyzer = FakeAnalyzer::new();
        let exhausted = Semaphore::new(0);
        let pending = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            extract_text("call.mp3", Bytes::from_static(b"ID3"), &caps(true), &analyzer, &exhausted),
        )
        .await;
        assert!(pending.is_err());
        assert_eq!(analyzer.call_count(), 0);
    }
}
