use super::schema::Category;

/// Extensions filed under documents.
pub const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "txt", "md", "xls", "xlsx", "ppt"];

/// Extensions shown with the code icon.
pub const CODE_EXTENSIONS: &[&str] = &[
    "js", "jsx", "ts", "tsx", "html", "css", "json", "py", "c", "cpp",
];

/// Lowercased text after the last dot. A name without a dot yields the whole name.
pub fn extension(filename: &str) -> String {
    filename.rsplit('.').next().unwrap_or("").to_lowercase()
}

/// Map a MIME type and file name to the record's category.
pub fn classify(mime_type: &str, filename: &str) -> Category {
    if mime_type.starts_with("image/") {
        return Category::Images;
    }
    if mime_type.starts_with("audio/") || mime_type.starts_with("video/") {
        return Category::Media;
    }
    if DOCUMENT_EXTENSIONS.contains(&extension(filename).as_str()) {
        return Category::Documents;
    }
    Category::Others
}

/// Icon family used when listing a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Image,
    Audio,
    Video,
    Code,
    Document,
    Other,
}

impl FileKind {
    pub fn icon(self) -> &'static str {
        match self {
            FileKind::Image => "🖼️",
            FileKind::Audio => "🎵",
            FileKind::Video => "🎬",
            FileKind::Code => "💻",
            FileKind::Document => "📄",
            FileKind::Other => "📁",
        }
    }
}

pub fn file_kind(mime_type: &str, filename: &str) -> FileKind {
    if mime_type.starts_with("image/") {
        return FileKind::Image;
    }
    if mime_type.starts_with("audio/") {
        return FileKind::Audio;
    }
    if mime_type.starts_with("video/") {
        return FileKind::Video;
    }
    let ext = extension(filename);
    if CODE_EXTENSIONS.contains(&ext.as_str()) {
        FileKind::Code
    } else if DOCUMENT_EXTENSIONS.contains(&ext.as_str()) {
        FileKind::Document
    } else {
        FileKind::Other
    }
}
