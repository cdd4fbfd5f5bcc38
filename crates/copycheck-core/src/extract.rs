//! Text extraction seam.
//!
//! The pipeline hands raw bytes plus a media type to a [`TextExtractor`] and
//! gets plain text back, or [`Error::UnsupportedFormat`](crate::Error).

use crate::error::Result;

pub const MIME_TEXT_PLAIN: &str = "text/plain";
pub const MIME_TEXT_MARKDOWN: &str = "text/markdown";
pub const MIME_OCTET_STREAM: &str = "application/octet-stream";

/// Maps `(bytes, media_type)` to plain text.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8], media_type: &str) -> Result<String>;
}

/// Lowercased media type without parameters (`"Text/Plain; charset=utf-8"` → `"text/plain"`).
pub fn essence(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Resolve the media type of an upload.
///
/// A missing or `application/octet-stream` type is replaced by what the file
/// extension says for `.txt`, `.md`, and `.markdown`; anything else is kept.
pub fn resolve_media_type(declared: Option<&str>, file_name: &str) -> String {
    let declared = declared.map(essence).filter(|d| !d.is_empty());
    match declared.as_deref() {
        Some(d) if d != MIME_OCTET_STREAM => d.to_string(),
        _ => {
            let ext = file_name
                .rsplit_once('.')
                .map(|(_, ext)| ext.to_ascii_lowercase())
                .unwrap_or_default();
            match ext.as_str() {
                "txt" => MIME_TEXT_PLAIN.to_string(),
                "md" | "markdown" => MIME_TEXT_MARKDOWN.to_string(),
                _ => MIME_OCTET_STREAM.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn essence_strips_parameters() {
        assert_eq!(essence("Text/Plain; charset=utf-8"), "text/plain");
        assert_eq!(essence("text/markdown"), "text/markdown");
        assert_eq!(essence(""), "");
    }

    #[test]
    fn declared_text_type_wins() {
        assert_eq!(resolve_media_type(Some("text/plain"), "essay.md"), "text/plain");
    }

    #[test]
    fn octet_stream_falls_back_to_extension() {
        assert_eq!(
            resolve_media_type(Some("application/octet-stream"), "essay.MD"),
            "text/markdown"
        );
        assert_eq!(resolve_media_type(None, "notes.txt"), "text/plain");
        assert_eq!(
            resolve_media_type(Some("application/octet-stream"), "blob.bin"),
            "application/octet-stream"
        );
        assert_eq!(resolve_media_type(None, "README"), "application/octet-stream");
    }
}
