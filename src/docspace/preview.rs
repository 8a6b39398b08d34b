use super::schema::FileRecord;
use super::session::SessionRegistry;
use base64::Engine;
use serde::Serialize;

pub const EXPIRED_MESSAGE: &str = "Cannot read the file content (it may have expired).";
pub const NOT_SAVED_MESSAGE: &str = "This file's content was not saved locally and cannot be previewed.";
pub const UNSUPPORTED_MESSAGE: &str = "Preview is not supported for this format yet.";

/// What the preview pane shows for a selected record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Preview {
    Code { content: String },
    /// `url` is a data URI, absent once the session handle is gone.
    Image { url: Option<String> },
    Pdf { url: Option<String> },
    Info { info: String },
    Error { info: String },
    Other { info: String },
}

/// Work out the preview for a record. Saved text content always wins.
pub async fn resolve_preview(record: &FileRecord, sessions: &SessionRegistry) -> Preview {
    if let Some(content) = record.content.as_ref().filter(|c| !c.is_empty()) {
        return Preview::Code {
            content: content.clone(),
        };
    }

    let mime = record.mime_type.as_str();
    if mime.starts_with("image/") {
        return Preview::Image {
            url: session_data_uri(record, sessions).await,
        };
    }
    if mime == "application/pdf" {
        return Preview::Pdf {
            url: session_data_uri(record, sessions).await,
        };
    }
    if mime.starts_with("text/") || record.name.ends_with(".md") || record.name.ends_with(".js") {
        let Some(handle) = &record.session else {
            return Preview::Info {
                info: NOT_SAVED_MESSAGE.to_string(),
            };
        };
        return match sessions.read(handle).await {
            Ok(bytes) => Preview::Code {
                content: String::from_utf8_lossy(&bytes).into_owned(),
            },
            Err(e) => {
                tracing::debug!(id = %record.id, "Preview read failed: {e:#}");
                Preview::Error {
                    info: EXPIRED_MESSAGE.to_string(),
                }
            }
        };
    }
    Preview::Other {
        info: UNSUPPORTED_MESSAGE.to_string(),
    }
}

async fn session_data_uri(record: &FileRecord, sessions: &SessionRegistry) -> Option<String> {
    let handle = record.session.as_ref()?;
    match sessions.read(handle).await {
        Ok(bytes) => {
            let b64 = base64::engine::general_purpose::STANDARD.encode(bytes);
            Some(format!("data:{};base64,{}", record.mime_type, b64))
        }
        Err(e) => {
            tracing::debug!(id = %record.id, "Preview read failed: {e:#}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docspace::session::SessionPayload;
    use std::sync::Arc;

    fn with_bytes(name: &str, mime: &str, bytes: &[u8], sessions: &SessionRegistry) -> FileRecord {
        let mut record = FileRecord::new(name, bytes.len() as u64, mime);
        record.session = Some(sessions.register(SessionPayload::Bytes(Arc::from(bytes))));
        record
    }

    #[tokio::test]
    async fn saved_content_wins() {
        let sessions = SessionRegistry::new();
        let mut record = with_bytes("a.png", "image/png", b"png", &sessions);
        record.content = Some("text".into());
        assert_eq!(
            resolve_preview(&record, &sessions).await,
            Preview::Code { content: "text".into() }
        );
    }

    #[tokio::test]
    async fn empty_content_falls_through_to_handle() {
        let sessions = SessionRegistry::new();
        let mut record = with_bytes("notes.txt", "text/plain", b"from disk", &sessions);
        record.content = Some(String::new());
        assert_eq!(
            resolve_preview(&record, &sessions).await,
            Preview::Code { content: "from disk".into() }
        );
    }

    #[tokio::test]
    async fn image_becomes_data_uri() {
        let sessions = SessionRegistry::new();
        let record = with_bytes("a.png", "image/png", b"hi", &sessions);
        assert_eq!(
            resolve_preview(&record, &sessions).await,
            Preview::Image { url: Some("data:image/png;base64,aGk=".into()) }
        );

        sessions.release_all();
        assert_eq!(resolve_preview(&record, &sessions).await, Preview::Image { url: None });
    }

    #[tokio::test]
    async fn pdf_without_handle_has_no_url() {
        let sessions = SessionRegistry::new();
        let record = FileRecord::new("plan.pdf", 10, "application/pdf");
        assert_eq!(resolve_preview(&record, &sessions).await, Preview::Pdf { url: None });
    }

    #[tokio::test]
    async fn text_reads_through_handle() {
        let sessions = SessionRegistry::new();
        let record = with_bytes("big.log", "text/plain", b"line one", &sessions);
        assert_eq!(
            resolve_preview(&record, &sessions).await,
            Preview::Code { content: "line one".into() }
        );

        sessions.release_all();
        assert_eq!(
            resolve_preview(&record, &sessions).await,
            Preview::Error { info: EXPIRED_MESSAGE.into() }
        );
    }

    #[tokio::test]
    async fn text_without_handle_is_info() {
        let sessions = SessionRegistry::new();
        let record = FileRecord::new("app.js", 900_000, "application/javascript");
        assert_eq!(
            resolve_preview(&record, &sessions).await,
            Preview::Info { info: NOT_SAVED_MESSAGE.into() }
        );
    }

    #[tokio::test]
    async fn other_types_are_unsupported() {
        let sessions = SessionRegistry::new();
        let record = with_bytes("a.zip", "application/zip", b"PK", &sessions);
        assert_eq!(
            resolve_preview(&record, &sessions).await,
            Preview::Other { info: UNSUPPORTED_MESSAGE.into() }
        );
    }
}
