//! Upload content-type allow-list.
//!
//! Pure string functions. A file is only ever uploaded if its declared MIME
//! type is one of [`ALLOWED`].

pub const PDF: &str = "application/pdf";
pub const CSV: &str = "text/csv";
pub const TEXT: &str = "text/plain";
pub const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MP4: &str = "video/mp4";
pub const MOV: &str = "video/quicktime";
pub const M4V: &str = "video/x-m4v";

/// Fallback for files whose extension maps to nothing we know.
pub const OCTET_STREAM: &str = "application/octet-stream";

pub const ALLOWED: [&str; 7] = [PDF, CSV, TEXT, DOCX, MP4, MOV, M4V];

/// Exact match against the allow-list. Declared types are compared verbatim.
pub fn is_allowed(content_type: &str) -> bool {
    ALLOWED.contains(&content_type)
}

/// Map a file extension (with or without the leading dot) to its content type.
pub fn for_extension(ext: &str) -> Option<&'static str> {
    let ext = ext.trim_start_matches('.').to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some(PDF),
        "csv" => Some(CSV),
        "txt" => Some(TEXT),
        "docx" => Some(DOCX),
        "mp4" => Some(MP4),
        "mov" => Some(MOV),
        "m4v" => Some(M4V),
        _ => None,
    }
}

pub fn is_video(content_type: &str) -> bool {
    content_type.starts_with("video/")
}
