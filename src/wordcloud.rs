//! Word-cloud links for submitted works.
//!
//! Builds a QuickChart word-cloud URL from the start of a work's extracted
//! text. Only the URL is produced; nothing is fetched.

use std::sync::Arc;

use reqwest::Url;
use serde::Serialize;
use uuid::Uuid;

use copycheck_core::extract::TextExtractor;
use copycheck_core::store::{ContentRecordStore, ContentStore, WorkStore};
use copycheck_core::{Error, Result};

pub const WORD_CLOUD_ENDPOINT: &str = "https://quickchart.io/wordcloud";

/// Bytes of text sent along in the query string.
pub const MAX_WORD_CLOUD_BYTES: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordCloud {
    pub work_id: Uuid,
    pub word_cloud_url: String,
}

/// Longest prefix of `text` that fits in `max` bytes without splitting a char.
pub fn truncate_on_char_boundary(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

pub fn word_cloud_url(text: &str) -> Result<Url> {
    let text = truncate_on_char_boundary(text, MAX_WORD_CLOUD_BYTES);
    Url::parse_with_params(
        WORD_CLOUD_ENDPOINT,
        &[
            ("text", text),
            ("format", "png"),
            ("width", "800"),
            ("height", "600"),
        ],
    )
    .map_err(|e| Error::Validation(format!("word cloud url: {}", e)))
}

#[derive(Clone)]
pub struct WordCloudService {
    works: Arc<dyn WorkStore>,
    contents: Arc<dyn ContentRecordStore>,
    blobs: Arc<dyn ContentStore>,
    extractor: Arc<dyn TextExtractor>,
}

impl WordCloudService {
    pub fn new(
        works: Arc<dyn WorkStore>,
        contents: Arc<dyn ContentRecordStore>,
        blobs: Arc<dyn ContentStore>,
        extractor: Arc<dyn TextExtractor>,
    ) -> Self {
        Self {
            works,
            contents,
            blobs,
            extractor,
        }
    }

    pub async fn for_work(&self, work_id: Uuid) -> Result<WordCloud> {
        let work = self.works.get_by_id(work_id).await?;
        let content = self.contents.get_by_id(work.content_id).await?;
        let bytes = self.blobs.get(&content.handle).await?;
        let text = self.extractor.extract(&bytes, &content.media_type)?;
        Ok(WordCloud {
            work_id,
            word_cloud_url: word_cloud_url(&text)?.to_string(),
        })
    }
}
