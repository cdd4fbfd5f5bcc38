//! Core data models for submissions and similarity reports.
//!
//! A [`Work`] and its [`Report`] are created together by one submission and
//! never mutated afterwards. A report refers to its work by id only.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// One student's submission for an assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Work {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub student_id: Uuid,
    /// Id of the [`StoredContent`] record holding the submitted file.
    pub content_id: Uuid,
    pub submitted_at: DateTime<Utc>,
}

impl Work {
    pub fn new(assignment_id: Uuid, student_id: Uuid, content_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            assignment_id,
            student_id,
            content_id,
            submitted_at: now_millis(),
        }
    }
}

/// Metadata for an uploaded blob.
///
/// Uploading the same bytes twice produces two records with the same
/// `content_hash` and different ids and handles.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredContent {
    pub id: Uuid,
    /// Handle returned by the content store for the raw bytes.
    pub handle: String,
    pub original_name: String,
    pub media_type: String,
    pub size: u64,
    /// SHA-256 of the raw bytes, lowercase hex.
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
}

impl StoredContent {
    pub fn new(
        handle: String,
        original_name: impl Into<String>,
        media_type: impl Into<String>,
        size: u64,
        content_hash: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            handle,
            original_name: original_name.into(),
            media_type: media_type.into(),
            size,
            content_hash,
            created_at: now_millis(),
        }
    }
}

/// Descriptive metadata attached to a report when a match is found.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisDetails {
    #[serde(rename = "algorithm", default)]
    pub algorithm: String,
    #[serde(default)]
    pub matched_tokens: usize,
    #[serde(default)]
    pub total_tokens: usize,
}

/// Outcome of scanning one submission against its assignment corpus.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub id: Uuid,
    pub work_id: Uuid,
    /// Highest similarity found, 0.0 for an empty or unreadable corpus.
    pub score: f64,
    /// `score > threshold`, strictly.
    pub is_plagiarized: bool,
    pub matched_work_id: Option<Uuid>,
    pub details: AnalysisDetails,
    pub created_at: DateTime<Utc>,
}

impl Report {
    pub fn new(work_id: Uuid, score: f64, threshold: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            work_id,
            score,
            is_plagiarized: score > threshold,
            matched_work_id: None,
            details: AnalysisDetails::default(),
            created_at: now_millis(),
        }
    }

    pub fn set_match(&mut self, matched_work_id: Uuid, details: AnalysisDetails) {
        self.matched_work_id = Some(matched_work_id);
        self.details = details;
    }
}

/// Read-side projection of a [`Report`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportResponse {
    pub work_id: Uuid,
    pub is_plagiarized: bool,
    pub similarity_score: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub matched_work_id: Option<Uuid>,
    pub created_at: String,
    pub details: AnalysisDetails,
}

impl From<&Report> for ReportResponse {
    fn from(report: &Report) -> Self {
        Self {
            work_id: report.work_id,
            is_plagiarized: report.is_plagiarized,
            similarity_score: report.score,
            matched_work_id: report.matched_work_id,
            created_at: report.created_at.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            details: report.details.clone(),
        }
    }
}

/// What the submit endpoint hands back to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub work_id: Uuid,
    pub submitted_at: DateTime<Utc>,
    #[serde(rename = "plagiarism_check")]
    pub plagiarism: PlagiarismInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlagiarismInfo {
    pub is_plagiarized: bool,
    pub score: f64,
    pub status: String,
}

impl SubmissionReceipt {
    pub fn new(work: &Work, report: &Report) -> Self {
        Self {
            work_id: work.id,
            submitted_at: work.submitted_at,
            plagiarism: PlagiarismInfo {
                is_plagiarized: report.is_plagiarized,
                score: report.score,
                status: "checked".to_string(),
            },
        }
    }
}

/// SHA-256 of `bytes` as lowercase hex.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

// Stores keep millisecond timestamps; truncating here keeps round-trips exact.
fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}
