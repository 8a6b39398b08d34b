pub mod config;
pub mod docspace;

pub use config::Config;
pub use docspace::{
    AiSummary, Category, ContentGenerator, DocSpace, DocSpaceError, FileRecord, GeminiClient,
    GenerateError, RecordStore, Section, StoreOptions, StoreStats,
};
