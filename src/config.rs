use crate::docspace::describe::ANALYSIS_PREVIEW_CHARS;
use crate::docspace::extract::MAX_READ_BYTES;
use crate::docspace::store::{StoreOptions, DEFAULT_STORE_KEY, MAX_PERSISTED_CONTENT_CHARS};
use anyhow::{Context, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_GEMINI_API_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-preview-09-2025:generateContent";

/// Environment variable that overrides `gemini.api_key`.
pub const API_KEY_ENV: &str = "DOCSPACE_GEMINI_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Config {
    /// Directory for backend files. `~` is expanded.
    pub data_dir: String,
    pub storage: StorageConfig,
    pub limits: Limits,
    pub gemini: GeminiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: "~/.docspace".to_string(),
            storage: StorageConfig::default(),
            limits: Limits::default(),
            gemini: GeminiConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Sqlite,
    Json,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Entry name holding the record array.
    pub key: String,
    /// Seed demo records when the entry does not exist yet.
    pub seed_demo_records: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            key: DEFAULT_STORE_KEY.to_string(),
            seed_demo_records: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Limits {
    /// Uploads at or above this size are not decoded to text.
    pub content_read_bytes: u64,
    /// Content longer than this is dropped from the persisted entry.
    pub content_persist_chars: usize,
    /// Content preview length sent with an analysis request.
    pub analysis_preview_chars: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            content_read_bytes: MAX_READ_BYTES,
            content_persist_chars: MAX_PERSISTED_CONTENT_CHARS,
            analysis_preview_chars: ANALYSIS_PREVIEW_CHARS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_url: String,
    pub api_key: String,
    /// Request timeout. Unset means the call waits for the transport to settle.
    pub timeout_secs: Option<u64>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_GEMINI_API_URL.to_string(),
            api_key: String::new(),
            timeout_secs: None,
        }
    }
}

impl Config {
    /// Load from `path`, or the platform config dir when none is given.
    /// A missing file yields defaults. The API key env var is applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path(),
        };
        let mut config = match path {
            Some(p) if p.exists() => {
                let raw = std::fs::read_to_string(&p)
                    .with_context(|| format!("Failed to read {}", p.display()))?;
                let config: Config = toml::from_str(&raw)
                    .with_context(|| format!("Failed to parse {}", p.display()))?;
                tracing::debug!(path = %p.display(), "Loaded config");
                config
            }
            _ => Config::default(),
        };
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            config.gemini.api_key = key;
        }
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.storage.key.is_empty(), "storage.key must not be empty");
        anyhow::ensure!(
            self.limits.content_read_bytes > 0,
            "limits.content_read_bytes must be greater than 0"
        );
        Ok(())
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.data_dir).to_string())
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            key: self.storage.key.clone(),
            max_persisted_content_chars: self.limits.content_persist_chars,
            seed_demo_records: self.storage.seed_demo_records,
        }
    }

    /// Copy safe to print: the API key is masked.
    pub fn masked(&self) -> Self {
        let mut copy = self.clone();
        if !copy.gemini.api_key.is_empty() {
            copy.gemini.api_key = "****".to_string();
        }
        copy
    }

    pub fn json_schema() -> Result<String> {
        serde_json::to_string_pretty(&schemars::schema_for!(Config))
            .context("Failed to render config schema")
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "docspace").map(|dirs| dirs.config_dir().join("config.toml"))
}
