use super::classify::extension;
use super::session::SessionPayload;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Files at or above this size (500KB) are never decoded.
pub const MAX_READ_BYTES: u64 = 500_000;

/// Extensions treated as text regardless of MIME type.
pub const TEXT_EXTENSIONS: &[&str] = &["md", "js", "json", "ts", "tsx"];

/// An uploaded file: metadata plus a way to get at its bytes.
#[async_trait]
pub trait UploadSource: Send + Sync {
    fn name(&self) -> &str;
    fn size(&self) -> u64;
    fn mime_type(&self) -> &str;
    async fn read_bytes(&self) -> Result<Vec<u8>>;
    /// Payload to register as the record's session handle.
    fn session_payload(&self) -> SessionPayload;
}

pub fn is_text_like(mime_type: &str, filename: &str) -> bool {
    mime_type.starts_with("text/") || TEXT_EXTENSIONS.contains(&extension(filename).as_str())
}

/// Decode an upload to text when it is small and text-like.
/// Returns None for everything else, including decode failures.
pub async fn read_content(source: &dyn UploadSource, max_bytes: u64) -> Option<String> {
    if source.size() >= max_bytes {
        return None;
    }
    if !is_text_like(source.mime_type(), source.name()) {
        return None;
    }
    let bytes = match source.read_bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(file = source.name(), "Cannot read text content: {e:#}");
            return None;
        }
    };
    match String::from_utf8(bytes) {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::warn!(file = source.name(), "Content is not valid UTF-8: {e}");
            None
        }
    }
}

/// Upload backed by a file on disk.
#[derive(Debug, Clone)]
pub struct DiskUpload {
    path: PathBuf,
    name: String,
    size: u64,
    mime_type: String,
}

impl DiskUpload {
    /// Stat the file; the MIME type is guessed from the extension.
    pub async fn open(path: &Path) -> Result<Self> {
        let meta = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("Failed to stat {}", path.display()))?;
        anyhow::ensure!(meta.is_file(), "{} is not a regular file", path.display());
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("{} has no usable file name", path.display()))?
            .to_string();
        let mime_type = guess_mime_type(&name);
        Ok(Self {
            path: path.to_path_buf(),
            name,
            size: meta.len(),
            mime_type,
        })
    }
}

#[async_trait]
impl UploadSource for DiskUpload {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    async fn read_bytes(&self) -> Result<Vec<u8>> {
        tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("Failed to read {}", self.path.display()))
    }

    fn session_payload(&self) -> SessionPayload {
        SessionPayload::Path(self.path.clone())
    }
}

/// Upload whose bytes are already in memory.
#[derive(Debug, Clone)]
pub struct MemoryUpload {
    name: String,
    mime_type: String,
    data: Arc<[u8]>,
}

impl MemoryUpload {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }
}

#[async_trait]
impl UploadSource for MemoryUpload {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    async fn read_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.data.to_vec())
    }

    fn session_payload(&self) -> SessionPayload {
        SessionPayload::Bytes(self.data.clone())
    }
}

/// Guess MIME type from filename extension.
pub fn guess_mime_type(filename: &str) -> String {
    match extension(filename).as_str() {
        "txt" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" | "jsx" => "text/javascript",
        "py" => "text/x-python",
        "json" => "application/json",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "zip" => "application/zip",
        "tar" => "application/x-tar",
        "gz" => "application/gzip",
        _ => "application/octet-stream",
    }
    .to_string()
}
