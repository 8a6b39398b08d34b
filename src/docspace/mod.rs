//! DocSpace — personal file manager core
//!
//! File records with favorites, categories and trash, persisted to a
//! string store, plus upload text extraction, previews and Gemini-backed
//! document generation and analysis.

pub mod classify;
pub mod describe;
pub mod extract;
pub mod format;
pub mod generate;
pub mod preview;
pub mod schema;
pub mod service;
pub mod session;
pub mod storage;
pub mod store;

pub use generate::{ContentGenerator, GeminiClient, GenerateError};
pub use schema::{AiSummary, Category, FileRecord, Section, StoreStats};
pub use service::{DocSpace, DocSpaceError};
pub use store::{RecordStore, StoreOptions};
