use super::format::format_size;
use super::schema::{AiSummary, FileRecord, Section, StoreStats, StoredRecord};
use super::session::SessionRegistry;
use super::storage::KvStore;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::sync::Arc;

/// Default string-store entry holding the record array.
pub const DEFAULT_STORE_KEY: &str = "docSpaceFiles";

/// Content longer than this many characters is not persisted.
pub const MAX_PERSISTED_CONTENT_CHARS: usize = 10_000;

#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub key: String,
    pub max_persisted_content_chars: usize,
    /// Insert the demo records when the entry does not exist yet.
    pub seed_demo_records: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            key: DEFAULT_STORE_KEY.to_string(),
            max_persisted_content_chars: MAX_PERSISTED_CONTENT_CHARS,
            seed_demo_records: false,
        }
    }
}

/// In-memory record collection mirrored to a [`KvStore`] entry.
///
/// Every mutation rewrites the whole entry. Mutations addressed to an id that
/// is not present change nothing and return `false`.
pub struct RecordStore {
    records: Vec<FileRecord>,
    backend: Arc<dyn KvStore>,
    sessions: Arc<SessionRegistry>,
    options: StoreOptions,
}

impl RecordStore {
    /// Read the persisted entry. A malformed entry leaves the store empty.
    pub fn load(
        backend: Arc<dyn KvStore>,
        sessions: Arc<SessionRegistry>,
        options: StoreOptions,
    ) -> Result<Self> {
        let raw = backend
            .get(&options.key)
            .with_context(|| format!("Failed to read store entry '{}'", options.key))?;

        let mut store = Self {
            records: Vec::new(),
            backend,
            sessions,
            options,
        };

        match raw {
            Some(raw) => {
                store.records = parse_records(&raw);
                tracing::debug!(count = store.records.len(), "Loaded file records");
            }
            None if store.options.seed_demo_records => {
                store.records = demo_records(chrono::Utc::now().timestamp_millis());
                store.persist()?;
                tracing::info!(count = store.records.len(), "Seeded demo records");
            }
            None => {}
        }
        Ok(store)
    }

    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&FileRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    /// Persisted form of the current collection.
    pub fn serialize(&self) -> Result<String> {
        let stored: Vec<StoredRecord> = self
            .records
            .iter()
            .map(|r| r.to_stored(self.options.max_persisted_content_chars))
            .collect();
        serde_json::to_string(&stored).context("Failed to serialize file records")
    }

    /// Overwrite the store entry with the current collection.
    pub fn persist(&self) -> Result<()> {
        let json = self.serialize()?;
        self.backend
            .set(&self.options.key, &json)
            .with_context(|| format!("Failed to write store entry '{}'", self.options.key))
    }

    /// Prepend a newly created record.
    pub fn add(&mut self, record: FileRecord) -> Result<()> {
        self.add_batch(vec![record])
    }

    /// Prepend records, keeping their relative order, with a single persist.
    /// If the write fails the records are taken back out.
    pub fn add_batch(&mut self, records: Vec<FileRecord>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let mut seen: HashSet<&str> = self.records.iter().map(|r| r.id.as_str()).collect();
        for record in &records {
            anyhow::ensure!(
                seen.insert(record.id.as_str()),
                "Duplicate file record id '{}'",
                record.id
            );
        }
        let added = records.len();
        tracing::debug!(count = added, "Adding file records");
        self.records.splice(0..0, records);
        if let Err(e) = self.persist() {
            self.records.drain(..added);
            return Err(e);
        }
        Ok(())
    }

    pub fn set_favorite(&mut self, id: &str, value: bool) -> Result<bool> {
        self.update(id, |r| r.is_favorite = value)
    }

    /// Flip the favorite flag, returning the new value.
    pub fn toggle_favorite(&mut self, id: &str) -> Result<Option<bool>> {
        let mut flipped = None;
        self.update(id, |r| {
            r.is_favorite = !r.is_favorite;
            flipped = Some(r.is_favorite);
        })?;
        Ok(flipped)
    }

    pub fn move_to_trash(&mut self, id: &str) -> Result<bool> {
        self.update(id, |r| r.is_deleted = true)
    }

    pub fn restore(&mut self, id: &str) -> Result<bool> {
        self.update(id, |r| r.is_deleted = false)
    }

    pub fn attach_summary(&mut self, id: &str, summary: AiSummary) -> Result<bool> {
        self.update(id, |r| r.ai_summary = Some(summary))
    }

    /// Remove a record and release its session handle.
    pub fn delete_permanently(&mut self, id: &str) -> Result<bool> {
        let Some(pos) = self.records.iter().position(|r| r.id == id) else {
            return Ok(false);
        };
        let record = self.records.remove(pos);
        self.release_session(&record);
        tracing::debug!(id, "Deleted file record");
        self.persist()?;
        Ok(true)
    }

    /// Remove every trashed record. Returns how many were purged.
    pub fn empty_trash(&mut self) -> Result<usize> {
        let (purged, kept): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.records).into_iter().partition(|r| r.is_deleted);
        self.records = kept;
        for record in &purged {
            self.release_session(record);
        }
        tracing::debug!(count = purged.len(), "Emptied trash");
        self.persist()?;
        Ok(purged.len())
    }

    /// Records visible in `section` whose name contains `query`
    /// (case-insensitive), newest first.
    pub fn project(&self, section: Section, query: &str) -> Vec<&FileRecord> {
        let needle = query.to_lowercase();
        let mut view: Vec<&FileRecord> = self
            .records
            .iter()
            .filter(|r| match section {
                Section::Trash => r.is_deleted,
                _ => !r.is_deleted,
            })
            .filter(|r| match section {
                Section::Favorites => r.is_favorite,
                Section::Category(category) => r.category == category,
                Section::All | Section::Trash => true,
            })
            .filter(|r| needle.is_empty() || r.name.to_lowercase().contains(&needle))
            .collect();
        view.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        view
    }

    pub fn stats(&self) -> StoreStats {
        let live = self.records.iter().filter(|r| !r.is_deleted);
        let (count, total_bytes) =
            live.fold((0, 0u64), |(n, bytes), r| (n + 1, bytes.saturating_add(r.size)));
        StoreStats {
            total_bytes,
            size: format_size(total_bytes),
            count,
        }
    }

    /// Release every session handle held by records. Records stay in place.
    pub fn close(&mut self) {
        let mut released = 0;
        for record in &mut self.records {
            if let Some(handle) = record.session.take() {
                if self.sessions.release(&handle) {
                    released += 1;
                }
            }
        }
        if released > 0 {
            tracing::debug!(released, "Released session handles");
        }
    }

    fn update(&mut self, id: &str, apply: impl FnOnce(&mut FileRecord)) -> Result<bool> {
        let Some(record) = self.records.iter_mut().find(|r| r.id == id) else {
            tracing::debug!(id, "No file record to update");
            return Ok(false);
        };
        apply(record);
        self.persist()?;
        Ok(true)
    }

    fn release_session(&self, record: &FileRecord) {
        if let Some(handle) = &record.session {
            self.sessions.release(handle);
        }
    }
}

impl Drop for RecordStore {
    fn drop(&mut self) {
        self.close();
    }
}

fn parse_records(raw: &str) -> Vec<FileRecord> {
    let stored: Vec<StoredRecord> = match serde_json::from_str(raw) {
        Ok(stored) => stored,
        Err(e) => {
            tracing::warn!("Failed to load file records: {e}");
            return Vec::new();
        }
    };
    let mut seen = HashSet::new();
    stored
        .into_iter()
        .filter(|r| {
            let fresh = seen.insert(r.id.clone());
            if !fresh {
                tracing::warn!(id = %r.id, "Dropping duplicate file record");
            }
            fresh
        })
        .map(StoredRecord::into_record)
        .collect()
}

fn demo_records(now: i64) -> Vec<FileRecord> {
    let demo = |id: &str, name: &str, size: u64, mime: &str, age_ms: i64, favorite: bool| {
        let mut record = FileRecord::new(name, size, mime);
        record.id = id.to_string();
        record.created_at = now - age_ms;
        record.is_favorite = favorite;
        record
    };

    let mut plan = demo("1", "project-plan.pdf", 2_400_000, "application/pdf", 10_000_000, true);
    plan.ai_summary = Some(AiSummary::new(
        "A detailed plan covering the project timeline and resources.",
        Vec::new(),
    ));
    let logo = demo("2", "logo-design.png", 1_500_000, "image/png", 5_000_000, false);
    let mut code = demo("3", "main.tsx", 4_000, "text/plain", 0, false);
    code.content = Some("console.log('Hello World');\n// demo code file".to_string());
    let report = demo("4", "finance_Q1.xlsx", 56_000, "application/vnd.ms-excel", 20_000_000, true);

    vec![plan, logo, code, report]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docspace::schema::Category;
    use crate::docspace::session::SessionPayload;
    use crate::docspace::storage::MemoryKvStore;

    fn record(id: &str, created_at: i64, category: Category) -> FileRecord {
        let mut r = FileRecord::new(format!("file-{id}"), 100, "application/octet-stream");
        r.id = id.to_string();
        r.created_at = created_at;
        r.category = category;
        r
    }

    fn empty_store() -> (RecordStore, Arc<MemoryKvStore>) {
        let backend = Arc::new(MemoryKvStore::new());
        let store = RecordStore::load(
            backend.clone(),
            Arc::new(SessionRegistry::new()),
            StoreOptions::default(),
        )
        .unwrap();
        (store, backend)
    }

    fn ids(view: &[&FileRecord]) -> Vec<String> {
        view.iter().map(|r| r.id.clone()).collect()
    }

    #[test]
    fn malformed_entry_loads_empty() {
        let backend = Arc::new(MemoryKvStore::new());
        backend.set(DEFAULT_STORE_KEY, "{not json").unwrap();
        let store = RecordStore::load(backend, Arc::new(SessionRegistry::new()), StoreOptions::default())
            .unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn absent_entry_seeds_demo_records_when_enabled() {
        let backend = Arc::new(MemoryKvStore::new());
        let options = StoreOptions {
            seed_demo_records: true,
            ..StoreOptions::default()
        };
        let store = RecordStore::load(backend.clone(), Arc::new(SessionRegistry::new()), options)
            .unwrap();
        assert_eq!(store.len(), 4);
        assert!(backend.get(DEFAULT_STORE_KEY).unwrap().is_some());
        assert_eq!(store.get("3").unwrap().category, Category::Others);
        assert_eq!(store.get("4").unwrap().category, Category::Documents);
    }

    #[test]
    fn add_prepends_and_persists() {
        let (mut store, backend) = empty_store();
        store.add(record("a", 1, Category::Others)).unwrap();
        store.add(record("b", 2, Category::Others)).unwrap();
        assert_eq!(store.records()[0].id, "b");
        let raw = backend.get(DEFAULT_STORE_KEY).unwrap().unwrap();
        assert!(raw.starts_with(r#"[{"id":"b""#));
    }

    #[test]
    fn add_batch_keeps_order_and_rejects_duplicates() {
        let (mut store, _) = empty_store();
        store.add(record("old", 1, Category::Others)).unwrap();
        store
            .add_batch(vec![record("x", 2, Category::Others), record("y", 2, Category::Others)])
            .unwrap();
        let order: Vec<_> = store.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(order, ["x", "y", "old"]);

        assert!(store.add(record("x", 3, Category::Others)).is_err());
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn mutating_absent_id_is_a_no_op() {
        let (mut store, backend) = empty_store();
        assert!(!store.set_favorite("missing", true).unwrap());
        assert!(!store.move_to_trash("missing").unwrap());
        assert!(!store.restore("missing").unwrap());
        assert!(!store.delete_permanently("missing").unwrap());
        assert_eq!(store.toggle_favorite("missing").unwrap(), None);
        assert!(backend.get(DEFAULT_STORE_KEY).unwrap().is_none());
    }

    #[test]
    fn toggle_favorite_flips() {
        let (mut store, _) = empty_store();
        store.add(record("a", 1, Category::Others)).unwrap();
        assert_eq!(store.toggle_favorite("a").unwrap(), Some(true));
        assert_eq!(store.toggle_favorite("a").unwrap(), Some(false));
    }

    #[test]
    fn search_is_case_insensitive_and_ties_keep_insertion_order() {
        let (mut store, _) = empty_store();
        let mut a = record("a", 5, Category::Documents);
        a.name = "Quarterly REPORT.pdf".into();
        let mut b = record("b", 5, Category::Documents);
        b.name = "report-draft.md".into();
        let mut c = record("c", 9, Category::Images);
        c.name = "photo.png".into();
        store.add_batch(vec![a, b, c]).unwrap();

        assert_eq!(ids(&store.project(Section::All, "report")), ["a", "b"]);
        assert_eq!(ids(&store.project(Section::All, "")), ["c", "a", "b"]);
        assert_eq!(
            ids(&store.project(Section::Category(Category::Images), "")),
            ["c"]
        );
    }

    #[test]
    fn category_survives_other_mutations() {
        let (mut store, _) = empty_store();
        store.add(FileRecord::new("pic.jpg", 10, "image/jpeg")).unwrap();
        let id = store.records()[0].id.clone();
        store.set_favorite(&id, true).unwrap();
        store.move_to_trash(&id).unwrap();
        store.restore(&id).unwrap();
        store.attach_summary(&id, AiSummary::new("a photo", vec![])).unwrap();
        assert_eq!(store.get(&id).unwrap().category, Category::Images);
    }

    #[test]
    fn persist_is_idempotent_across_reload() {
        let (mut store, backend) = empty_store();
        let mut big = record("big", 2, Category::Documents);
        big.content = Some("y".repeat(MAX_PERSISTED_CONTENT_CHARS + 1));
        let mut small = record("small", 1, Category::Documents);
        small.content = Some("short".into());
        store.add_batch(vec![big, small]).unwrap();
        assert!(store.get("big").unwrap().content.is_some());

        let first = backend.get(DEFAULT_STORE_KEY).unwrap().unwrap();
        let reloaded = RecordStore::load(
            backend.clone(),
            Arc::new(SessionRegistry::new()),
            StoreOptions::default(),
        )
        .unwrap();
        assert!(reloaded.get("big").unwrap().content.is_none());
        assert_eq!(reloaded.get("small").unwrap().content.as_deref(), Some("short"));
        reloaded.persist().unwrap();
        assert_eq!(backend.get(DEFAULT_STORE_KEY).unwrap().unwrap(), first);
    }

    #[test]
    fn purge_releases_session_handles() {
        let sessions = Arc::new(SessionRegistry::new());
        let mut store = RecordStore::load(
            Arc::new(MemoryKvStore::new()),
            sessions.clone(),
            StoreOptions::default(),
        )
        .unwrap();

        let mut batch = Vec::new();
        for id in ["a", "b", "c"] {
            let mut r = record(id, 1, Category::Others);
            r.session = Some(sessions.register(SessionPayload::Bytes(Arc::from(&b"x"[..]))));
            batch.push(r);
        }
        store.add_batch(batch).unwrap();
        assert_eq!(sessions.len(), 3);

        store.delete_permanently("a").unwrap();
        assert_eq!(sessions.len(), 2);

        store.move_to_trash("b").unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(store.empty_trash().unwrap(), 1);
        assert_eq!(sessions.len(), 1);

        drop(store);
        assert!(sessions.is_empty());
    }

    #[test]
    fn reload_never_restores_session_handles() {
        let backend = Arc::new(MemoryKvStore::new());
        let sessions = Arc::new(SessionRegistry::new());
        {
            let mut store =
                RecordStore::load(backend.clone(), sessions.clone(), StoreOptions::default())
                    .unwrap();
            let mut r = record("a", 1, Category::Others);
            r.session = Some(sessions.register(SessionPayload::Bytes(Arc::from(&b"x"[..]))));
            store.add(r).unwrap();
        }
        let store = RecordStore::load(backend, sessions, StoreOptions::default()).unwrap();
        assert!(store.get("a").unwrap().session.is_none());
    }

    #[test]
    fn stats_skip_trash() {
        let (mut store, _) = empty_store();
        let mut a = record("a", 1, Category::Others);
        a.size = 1024;
        let mut b = record("b", 2, Category::Others);
        b.size = 2048;
        store.add_batch(vec![a, b]).unwrap();
        store.move_to_trash("b").unwrap();
        let stats = store.stats();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.total_bytes, 1024);
        assert_eq!(stats.size, "1 KB");
    }

    #[test]
    fn stats_total_saturates() {
        let backend = Arc::new(MemoryKvStore::new());
        backend
            .set(
                DEFAULT_STORE_KEY,
                r#"[{"id":"a","name":"a.bin","size":9223372036854775808,"mimeType":"application/octet-stream","createdAt":1},
                    {"id":"b","name":"b.bin","size":9223372036854775808,"mimeType":"application/octet-stream","createdAt":2}]"#,
            )
            .unwrap();
        let store = RecordStore::load(backend, Arc::new(SessionRegistry::new()), StoreOptions::default())
            .unwrap();
        let stats = store.stats();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.total_bytes, u64::MAX);
    }

    struct ReadOnly;

    impl KvStore for ReadOnly {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            anyhow::bail!("read-only store")
        }
    }

    #[test]
    fn failed_write_leaves_records_out() {
        let sessions = Arc::new(SessionRegistry::new());
        let mut store =
            RecordStore::load(Arc::new(ReadOnly), sessions, StoreOptions::default()).unwrap();
        assert!(store.add(record("a", 1, Category::Others)).is_err());
        assert!(store
            .add_batch(vec![record("b", 1, Category::Others), record("c", 2, Category::Others)])
            .is_err());
        assert!(store.is_empty());
    }
}
