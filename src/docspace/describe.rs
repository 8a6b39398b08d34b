use super::format::format_size;
use super::schema::{AiSummary, FileRecord};
use serde::Deserialize;

/// Content preview length included in the analysis prompt.
pub const ANALYSIS_PREVIEW_CHARS: usize = 200;

/// Summary attached to documents produced by AI create.
pub const GENERATED_DOCUMENT_SUMMARY: &str = "Document generated by Gemini AI.";

/// Summary shown when the analysis reply cannot be parsed.
pub const FALLBACK_SUMMARY: &str = "Unable to parse AI response";

/// Prompt asking for a complete markdown document.
pub fn document_prompt(user_prompt: &str) -> String {
    format!(
        "You are a document assistant. Write a document in Markdown that fulfils the user's request.\n\
         Do not wrap the answer in code fences such as ```markdown; return the document body directly.\n\n\
         User request: {user_prompt}"
    )
}

/// Prompt asking for a one-line summary and three tags, derived from the
/// record's metadata and the start of its content.
pub fn analysis_prompt(record: &FileRecord, preview_chars: usize) -> String {
    let preview = record
        .content
        .as_deref()
        .map(|content| {
            let head: String = content.chars().take(preview_chars).collect();
            format!("First {preview_chars} characters of the content: \"{head}...\"\n")
        })
        .unwrap_or_default();

    format!(
        "I have a file named \"{name}\" of type \"{mime}\", {size} in size.\n\
         {preview}\
         Based on this metadata (the file name usually carries the most information):\n\
         1. Guess what the file most likely contains, as a one-sentence summary.\n\
         2. Suggest 3 related category tags.\n\
         Reply in JSON using exactly this shape: {{ \"summary\": \"...\", \"tags\": [\"tag1\", \"tag2\", \"tag3\"] }}.",
        name = record.name,
        mime = record.mime_type,
        size = format_size(record.size),
    )
}

/// Remove every ```json and ``` marker, then trim.
pub fn strip_code_fences(reply: &str) -> String {
    reply.replace("```json", "").replace("```", "").trim().to_string()
}

#[derive(Deserialize)]
struct AnalysisReply {
    summary: String,
    #[serde(default)]
    tags: Vec<String>,
}

/// Parse the model's analysis reply. None when it is not the expected JSON.
pub fn parse_analysis(reply: &str) -> Option<AiSummary> {
    match serde_json::from_str::<AnalysisReply>(&strip_code_fences(reply)) {
        Ok(parsed) => Some(AiSummary::new(parsed.summary, parsed.tags)),
        Err(e) => {
            tracing::warn!("Failed to parse analysis reply: {e}");
            None
        }
    }
}

pub fn fallback_summary() -> AiSummary {
    AiSummary::new(FALLBACK_SUMMARY, Vec::new())
}
