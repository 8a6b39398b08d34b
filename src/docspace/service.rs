use super::describe::{analysis_prompt, document_prompt, fallback_summary, parse_analysis, GENERATED_DOCUMENT_SUMMARY};
use super::extract::{read_content, UploadSource};
use super::generate::{ContentGenerator, GeminiClient};
use super::preview::{resolve_preview, Preview};
use super::schema::{AiSummary, FileRecord};
use super::session::{SessionPayload, SessionRegistry};
use super::storage::{JsonFileKvStore, KvStore, MemoryKvStore, SqliteKvStore};
use super::store::RecordStore;
use crate::config::{Config, Limits, StorageBackend};
use anyhow::Result;
use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum DocSpaceError {
    #[error("a document is already being generated")]
    Busy,
    #[error("prompt is empty")]
    EmptyPrompt,
    #[error("file record not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Open the string store selected by the config.
pub fn open_backend(config: &Config) -> Result<Arc<dyn KvStore>> {
    let data_dir = config.data_dir();
    Ok(match config.storage.backend {
        StorageBackend::Sqlite => Arc::new(SqliteKvStore::new(&data_dir)?),
        StorageBackend::Json => Arc::new(JsonFileKvStore::new(&data_dir)?),
        StorageBackend::Memory => Arc::new(MemoryKvStore::new()),
    })
}

/// Upload, AI create, analysis and preview on top of a [`RecordStore`].
///
/// Async operations capture record ids up front and apply their result to
/// whatever record carries that id when they finish.
pub struct DocSpace {
    store: Mutex<RecordStore>,
    sessions: Arc<SessionRegistry>,
    generator: Arc<dyn ContentGenerator>,
    limits: Limits,
    generating: AtomicBool,
}

impl DocSpace {
    pub fn new(store: RecordStore, generator: Arc<dyn ContentGenerator>, limits: Limits) -> Self {
        let sessions = store.sessions().clone();
        Self {
            store: Mutex::new(store),
            sessions,
            generator,
            limits,
            generating: AtomicBool::new(false),
        }
    }

    /// Wire backend, session registry and Gemini client from config.
    pub fn open(config: &Config) -> Result<Self> {
        let backend = open_backend(config)?;
        let sessions = Arc::new(SessionRegistry::new());
        let store = RecordStore::load(backend, sessions, config.store_options())?;
        let generator = Arc::new(GeminiClient::new(&config.gemini)?);
        Ok(Self::new(store, generator, config.limits.clone()))
    }

    pub fn store(&self) -> MutexGuard<'_, RecordStore> {
        self.store.lock()
    }

    pub fn is_generating(&self) -> bool {
        self.generating.load(Ordering::SeqCst)
    }

    /// One record per source, prepended in the given order.
    pub async fn upload(&self, sources: &[Box<dyn UploadSource>]) -> Result<Vec<FileRecord>> {
        let mut records = Vec::with_capacity(sources.len());
        for source in sources {
            let content = read_content(source.as_ref(), self.limits.content_read_bytes).await;
            let mut record = FileRecord::new(source.name(), source.size(), source.mime_type());
            record.content = content;
            record.session = Some(self.sessions.register(source.session_payload()));
            records.push(record);
        }
        if let Err(e) = self.store.lock().add_batch(records.clone()) {
            self.release_sessions(&records);
            return Err(e);
        }
        tracing::info!(count = records.len(), "Uploaded files");
        Ok(records)
    }

    /// Generate a markdown document from `prompt` and store it.
    pub async fn create_with_ai(&self, prompt: &str) -> Result<FileRecord, DocSpaceError> {
        if prompt.trim().is_empty() {
            return Err(DocSpaceError::EmptyPrompt);
        }
        let _guard = GeneratingGuard::acquire(&self.generating).ok_or(DocSpaceError::Busy)?;

        let content = self.generator.generate(&document_prompt(prompt)).await;
        let now = chrono::Utc::now().timestamp_millis();
        let bytes: Arc<[u8]> = Arc::from(content.as_bytes());

        let mut record = FileRecord::new(format!("AI_Generated_{now}.md"), bytes.len() as u64, "text/markdown");
        record.created_at = now;
        record.ai_summary = Some(AiSummary::new(GENERATED_DOCUMENT_SUMMARY, Vec::new()));
        record.content = Some(content);
        record.session = Some(self.sessions.register(SessionPayload::Bytes(bytes)));

        if let Err(e) = self.store.lock().add(record.clone()) {
            self.release_sessions(std::slice::from_ref(&record));
            return Err(e.into());
        }
        tracing::info!(id = %record.id, "Created AI document");
        Ok(record)
    }

    /// Ask the model for a summary and tags. A parsed result is attached to
    /// the record; an unparseable reply yields the fallback and is not stored.
    pub async fn analyze(&self, id: &str) -> Result<AiSummary, DocSpaceError> {
        let record = self
            .store
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| DocSpaceError::NotFound(id.to_string()))?;

        let prompt = analysis_prompt(&record, self.limits.analysis_preview_chars);
        let reply = self.generator.generate(&prompt).await;

        let Some(summary) = parse_analysis(&reply) else {
            return Ok(fallback_summary());
        };
        let attached = self.store.lock().attach_summary(id, summary.clone())?;
        if !attached {
            tracing::debug!(id, "Record disappeared before analysis finished");
        }
        Ok(summary)
    }

    pub async fn preview(&self, id: &str) -> Result<Preview, DocSpaceError> {
        let record = self
            .store
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| DocSpaceError::NotFound(id.to_string()))?;
        Ok(resolve_preview(&record, &self.sessions).await)
    }

    fn release_sessions(&self, records: &[FileRecord]) {
        for handle in records.iter().filter_map(|r| r.session.as_ref()) {
            self.sessions.release(handle);
        }
    }

    /// Release every session handle.
    pub fn close(&self) {
        self.store.lock().close();
        self.sessions.release_all();
    }
}

struct GeneratingGuard<'a>(&'a AtomicBool);

impl<'a> GeneratingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for GeneratingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
