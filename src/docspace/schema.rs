use super::classify::classify;
use super::session::SessionHandle;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fixed category a record is filed under. Derived once at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Images,
    Documents,
    Media,
    Others,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Images,
        Category::Documents,
        Category::Media,
        Category::Others,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Images => "images",
            Category::Documents => "documents",
            Category::Media => "media",
            Category::Others => "others",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| anyhow::anyhow!("unknown category '{s}'"))
    }
}

/// Structured annotation returned by the AI analysis call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "AiSummaryRepr")]
pub struct AiSummary {
    pub summary: String,
    pub tags: Vec<String>,
}

impl AiSummary {
    pub fn new(summary: impl Into<String>, tags: Vec<String>) -> Self {
        Self {
            summary: summary.into(),
            tags,
        }
    }
}

// Older entries stored the summary as a bare string.
#[derive(Deserialize)]
#[serde(untagged)]
enum AiSummaryRepr {
    Full {
        summary: String,
        #[serde(default)]
        tags: Vec<String>,
    },
    Text(String),
}

impl From<AiSummaryRepr> for AiSummary {
    fn from(repr: AiSummaryRepr) -> Self {
        match repr {
            AiSummaryRepr::Full { summary, tags } => Self { summary, tags },
            AiSummaryRepr::Text(summary) => Self {
                summary,
                tags: Vec::new(),
            },
        }
    }
}

/// A single file's metadata and optional text content.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
    pub is_favorite: bool,
    pub is_deleted: bool,
    pub category: Category,
    pub content: Option<String>,
    /// Valid for the current run only; never persisted.
    #[serde(skip)]
    pub session: Option<SessionHandle>,
    pub ai_summary: Option<AiSummary>,
}

impl FileRecord {
    /// Build a fresh record with a new id and the current timestamp.
    pub fn new(name: impl Into<String>, size: u64, mime_type: impl Into<String>) -> Self {
        let name = name.into();
        let mime_type = mime_type.into();
        let category = classify(&mime_type, &name);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            size,
            mime_type,
            created_at: chrono::Utc::now().timestamp_millis(),
            is_favorite: false,
            is_deleted: false,
            category,
            content: None,
            session: None,
            ai_summary: None,
        }
    }

    /// Persisted shape of this record. Content longer than `content_limit`
    /// characters is dropped.
    pub fn to_stored(&self, content_limit: usize) -> StoredRecord {
        let content = self
            .content
            .as_ref()
            .filter(|c| c.chars().count() <= content_limit)
            .cloned();
        StoredRecord {
            id: self.id.clone(),
            name: self.name.clone(),
            size: self.size,
            mime_type: self.mime_type.clone(),
            created_at: self.created_at,
            is_favorite: self.is_favorite,
            is_deleted: self.is_deleted,
            category: Some(self.category),
            content,
            ai_summary: self.ai_summary.clone(),
        }
    }
}

/// Record as written to the string store.
///
/// Accepts the legacy `type`/`date` field names and tolerates missing flags;
/// unknown fields such as `tempUrl` are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default, alias = "type")]
    pub mime_type: String,
    #[serde(default, alias = "date")]
    pub created_at: i64,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub ai_summary: Option<AiSummary>,
}

impl StoredRecord {
    /// Rehydrate into an in-memory record. The session handle is always absent.
    pub fn into_record(self) -> FileRecord {
        let category = self
            .category
            .unwrap_or_else(|| classify(&self.mime_type, &self.name));
        FileRecord {
            id: self.id,
            name: self.name,
            size: self.size,
            mime_type: self.mime_type,
            created_at: self.created_at,
            is_favorite: self.is_favorite,
            is_deleted: self.is_deleted,
            category,
            content: self.content,
            session: None,
            ai_summary: self.ai_summary,
        }
    }
}

/// Named view filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    All,
    Favorites,
    Trash,
    Category(Category),
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Section::All => f.write_str("all"),
            Section::Favorites => f.write_str("favorites"),
            Section::Trash => f.write_str("trash"),
            Section::Category(c) => f.write_str(c.as_str()),
        }
    }
}

impl FromStr for Section {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Section::All),
            "favorites" => Ok(Section::Favorites),
            "trash" => Ok(Section::Trash),
            other => other
                .parse::<Category>()
                .map(Section::Category)
                .map_err(|_| anyhow::anyhow!("unknown section '{s}'")),
        }
    }
}

/// Totals over every record that is not in the trash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total_bytes: u64,
    pub size: String,
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_fields_are_accepted() {
        let raw = r#"{
            "id": "1",
            "name": "plan.pdf",
            "size": 2400000,
            "type": "application/pdf",
            "date": 1700000000000,
            "isFavorite": true,
            "tempUrl": "blob:http://localhost/abc",
            "aiSummary": "A project plan."
        }"#;
        let record = serde_json::from_str::<StoredRecord>(raw).unwrap().into_record();
        assert_eq!(record.mime_type, "application/pdf");
        assert_eq!(record.created_at, 1_700_000_000_000);
        assert!(record.is_favorite);
        assert!(!record.is_deleted);
        assert_eq!(record.category, Category::Documents);
        assert!(record.session.is_none());
        assert_eq!(record.ai_summary, Some(AiSummary::new("A project plan.", vec![])));
    }

    #[test]
    fn stored_form_drops_oversized_content() {
        let mut record = FileRecord::new("notes.md", 20_001, "text/markdown");
        record.content = Some("x".repeat(10_001));
        assert!(record.to_stored(10_000).content.is_none());
        assert!(record.content.is_some());

        record.content = Some("x".repeat(10_000));
        assert_eq!(record.to_stored(10_000).content.map(|c| c.len()), Some(10_000));
    }

    #[test]
    fn stored_form_never_mentions_session() {
        let mut record = FileRecord::new("a.png", 10, "image/png");
        record.session = Some(SessionHandle::new());
        let json = serde_json::to_string(&record.to_stored(10_000)).unwrap();
        assert!(!json.contains("session"));
        assert!(!json.contains("blob:"));
    }

    #[test]
    fn sections_parse() {
        assert_eq!("all".parse::<Section>().unwrap(), Section::All);
        assert_eq!("Trash".parse::<Section>().unwrap(), Section::Trash);
        assert_eq!(
            "media".parse::<Section>().unwrap(),
            Section::Category(Category::Media)
        );
        assert!("recent".parse::<Section>().is_err());
    }
}
