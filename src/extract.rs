//! Plain-text extraction.
//!
//! Uploads are plain text or Markdown; both are decoded as UTF-8, with
//! invalid sequences replaced by U+FFFD. Everything else is reported as
//! unsupported and the pipeline decides what to do with that.

use copycheck_core::extract::{essence, TextExtractor, MIME_TEXT_MARKDOWN, MIME_TEXT_PLAIN};
use copycheck_core::{Error, Result};

/// Media types this extractor accepts.
pub const SUPPORTED: &[&str] = &[MIME_TEXT_PLAIN, MIME_TEXT_MARKDOWN];

#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

impl PlainTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, bytes: &[u8], media_type: &str) -> Result<String> {
        let media_type = essence(media_type);
        if !SUPPORTED.contains(&media_type.as_str()) {
            return Err(Error::UnsupportedFormat(format!(
                "unsupported content-type: {}",
                media_type
            )));
        }
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through() {
        let text = PlainTextExtractor.extract(b"hello\nworld", "text/plain").unwrap();
        assert_eq!(text, "hello\nworld");
    }

    #[test]
    fn markdown_and_charset_parameters_are_accepted() {
        let ex = PlainTextExtractor::new();
        assert_eq!(ex.extract(b"# Title", "text/markdown").unwrap(), "# Title");
        assert_eq!(ex.extract(b"abc", "text/plain; charset=utf-8").unwrap(), "abc");
    }

    #[test]
    fn unsupported_content_type_returns_error() {
        let err = PlainTextExtractor.extract(b"%PDF-1.4", "application/pdf").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
        let err = PlainTextExtractor.extract(b"foo", "application/octet-stream").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let text = PlainTextExtractor.extract(b"copied essay\xff", "text/plain").unwrap();
        assert_eq!(text, "copied essay\u{FFFD}");
        let text = PlainTextExtractor.extract(&[0xff, 0xfe], "text/markdown").unwrap();
        assert_eq!(text, "\u{FFFD}\u{FFFD}");
    }
}
