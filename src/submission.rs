//! Submission pipeline.
//!
//! Drives one submission end-to-end:
//!
//! ```text
//! bytes ─▶ ContentStore.put ─▶ ContentRecordStore.save ─▶ WorkStore.save
//!                                                             │
//!        extract current text ◀───────────────────────────────┘
//!                 │
//!                 ▼
//!   WorkStore.find_by_assignment ─▶ for each prior work (bounded, ordered):
//!        content record ─▶ blob ─▶ extract ─▶ compare
//!                 │
//!                 ▼
//!   select_best (first max wins) ─▶ Report ─▶ ReportStore.save
//! ```
//!
//! Failure policy: upload, metadata, work, and report persistence of the
//! current submission are fatal. Extraction of the current document falls
//! back to empty text. Anything that goes wrong for a prior work skips that
//! one comparison. Cancellation aborts before a report is written.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, BoxStream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use copycheck_core::extract::TextExtractor;
use copycheck_core::matching::select_best;
use copycheck_core::models::{
    content_hash, AnalysisDetails, Report, StoredContent, SubmissionReceipt, Work,
};
use copycheck_core::similarity::{tokenize, PreparedText, SimilarityDetector};
use copycheck_core::store::{ContentRecordStore, ContentStore, ReportStore, WorkStore};
use copycheck_core::{Error, Result};

use crate::config::DetectionConfig;

/// One incoming submission.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub assignment_id: Uuid,
    pub student_id: Uuid,
    pub file_name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

/// Everything a successful submission created.
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub work: Work,
    pub content: StoredContent,
    pub report: Report,
}

impl SubmissionOutcome {
    pub fn receipt(&self) -> SubmissionReceipt {
        SubmissionReceipt::new(&self.work, &self.report)
    }
}

/// Fixed detection parameters, taken from `[detection]` at startup.
#[derive(Debug, Clone, Copy)]
pub struct DetectionSettings {
    pub threshold: f64,
    pub scan_concurrency: usize,
}

impl From<&DetectionConfig> for DetectionSettings {
    fn from(cfg: &DetectionConfig) -> Self {
        Self {
            threshold: cfg.threshold,
            scan_concurrency: cfg.scan_concurrency,
        }
    }
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self::from(&DetectionConfig::default())
    }
}

/// A blob that gets deleted again unless it is committed.
///
/// Dropping an uncommitted guard (e.g. when the submit future is dropped)
/// schedules the delete on the current runtime.
struct PendingBlob {
    store: Arc<dyn ContentStore>,
    handle: Option<String>,
}

impl PendingBlob {
    fn new(store: Arc<dyn ContentStore>, handle: String) -> Self {
        Self {
            store,
            handle: Some(handle),
        }
    }

    fn commit(mut self) {
        self.handle = None;
    }

    async fn rollback(mut self) {
        if let Some(handle) = self.handle.take() {
            delete_blob(self.store.as_ref(), &handle).await;
        }
    }
}

impl Drop for PendingBlob {
    fn drop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(rt) => {
                let store = self.store.clone();
                rt.spawn(async move { delete_blob(store.as_ref(), &handle).await });
            }
            Err(_) => error!(handle = %handle, "blob left behind: no runtime to clean it up"),
        }
    }
}

async fn delete_blob(store: &dyn ContentStore, handle: &str) {
    match store.delete(handle).await {
        Ok(()) => debug!(handle = %handle, "removed blob of aborted submission"),
        Err(e) => error!(handle = %handle, error = %e, "failed to clean up blob after aborted submission"),
    }
}

/// Orchestrates submissions against swappable collaborators.
#[derive(Clone)]
pub struct SubmissionService {
    blobs: Arc<dyn ContentStore>,
    contents: Arc<dyn ContentRecordStore>,
    works: Arc<dyn WorkStore>,
    reports: Arc<dyn ReportStore>,
    extractor: Arc<dyn TextExtractor>,
    detector: Arc<dyn SimilarityDetector>,
    settings: DetectionSettings,
}

impl SubmissionService {
    pub fn new(
        blobs: Arc<dyn ContentStore>,
        contents: Arc<dyn ContentRecordStore>,
        works: Arc<dyn WorkStore>,
        reports: Arc<dyn ReportStore>,
        extractor: Arc<dyn TextExtractor>,
        detector: Arc<dyn SimilarityDetector>,
        settings: DetectionSettings,
    ) -> Self {
        Self {
            blobs,
            contents,
            works,
            reports,
            extractor,
            detector,
            settings,
        }
    }

    pub fn settings(&self) -> DetectionSettings {
        self.settings
    }

    /// Store, register, and grade one submission.
    ///
    /// Returns [`Error::Cancelled`] if `cancel` fires first; no report is
    /// written in that case.
    pub async fn submit(
        &self,
        req: SubmitRequest,
        cancel: &CancellationToken,
    ) -> Result<SubmissionOutcome> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let hash = content_hash(&req.bytes);
        let handle = self
            .blobs
            .put(&req.bytes)
            .await
            .map_err(|e| e.context("content upload failed"))?;
        let pending = PendingBlob::new(self.blobs.clone(), handle.clone());

        let content = StoredContent::new(
            handle,
            req.file_name.as_str(),
            req.media_type.as_str(),
            req.bytes.len() as u64,
            hash,
        );
        if cancel.is_cancelled() {
            pending.rollback().await;
            return Err(Error::Cancelled);
        }
        if let Err(e) = self.contents.save(&content).await {
            pending.rollback().await;
            return Err(e.context("content metadata save failed"));
        }
        pending.commit();

        // From here on the content row stays even if later steps fail.
        let work = Work::new(req.assignment_id, req.student_id, content.id);
        self.works
            .save(&work)
            .await
            .map_err(|e| e.context("work save failed"))?;

        info!(
            work_id = %work.id,
            assignment_id = %work.assignment_id,
            file = %content.original_name,
            bytes = content.size,
            "work registered"
        );

        let current_text = match self.extractor.extract(&req.bytes, &req.media_type) {
            Ok(text) => text,
            Err(e) => {
                warn!(work_id = %work.id, error = %e, "text extraction failed; comparing as empty");
                String::new()
            }
        };

        let corpus = self.load_corpus(&work).await;
        let compared = corpus.len();
        let current = Arc::new(self.detector.prepare(&current_text));
        let scored = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(work_id = %work.id, "submission cancelled during corpus scan");
                return Err(Error::Cancelled);
            }
            scored = self.scan_corpus(current, corpus) => scored,
        };

        let best = select_best(scored);
        let mut report = Report::new(work.id, best.score, self.settings.threshold);
        if let Some(matched) = best.work_id {
            report.set_match(
                matched,
                AnalysisDetails {
                    algorithm: self.detector.name().to_string(),
                    matched_tokens: 0,
                    total_tokens: tokenize(&current_text).len(),
                },
            );
        }

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        self.reports
            .save(&report)
            .await
            .map_err(|e| e.context("report save failed"))?;

        info!(
            work_id = %work.id,
            score = report.score,
            plagiarized = report.is_plagiarized,
            matched_work_id = ?report.matched_work_id,
            compared,
            "report saved"
        );

        Ok(SubmissionOutcome {
            work,
            content,
            report,
        })
    }

    /// Other works of the same assignment. A failing lookup counts as an
    /// empty corpus.
    async fn load_corpus(&self, work: &Work) -> Vec<Work> {
        match self.works.find_by_assignment(work.assignment_id).await {
            Ok(works) => works.into_iter().filter(|w| w.id != work.id).collect(),
            Err(e) => {
                warn!(
                    assignment_id = %work.assignment_id,
                    error = %e,
                    "corpus lookup failed; treating corpus as empty"
                );
                Vec::new()
            }
        }
    }

    /// Score every prior work, at most `scan_concurrency` at a time.
    ///
    /// `buffered` yields results in input order, so the returned vector
    /// follows corpus-lookup order regardless of completion order. Each scan
    /// owns its inputs so the stream is `Send + 'static`.
    fn scan_corpus(
        &self,
        current: Arc<PreparedText>,
        corpus: Vec<Work>,
    ) -> BoxFuture<'static, Vec<(Uuid, Option<f64>)>> {
        let service = self.clone();
        let limit = self.settings.scan_concurrency.max(1);
        let scans: BoxStream<'static, (Uuid, Option<f64>)> = stream::iter(corpus)
            .map(move |work| {
                let service = service.clone();
                let current = current.clone();
                async move {
                    let score = service.score_against(&current, &work).await;
                    (work.id, score)
                }
            })
            .buffered(limit)
            .boxed();
        scans.collect().boxed()
    }

    /// `None` means this prior work was skipped.
    async fn score_against(&self, current: &PreparedText, work: &Work) -> Option<f64> {
        let content = match self.contents.get_by_id(work.content_id).await {
            Ok(c) => c,
            Err(e) => {
                warn!(work_id = %work.id, error = %e, "skipping prior work: no content record");
                return None;
            }
        };
        let bytes = match self.blobs.get(&content.handle).await {
            Ok(b) => b,
            Err(e) => {
                warn!(work_id = %work.id, error = %e, "skipping prior work: content unavailable");
                return None;
            }
        };
        let text = match self.extractor.extract(&bytes, &content.media_type) {
            Ok(t) => t,
            Err(e) => {
                warn!(work_id = %work.id, error = %e, "skipping prior work: extraction failed");
                return None;
            }
        };
        match self.detector.compare_prepared(current, &text) {
            Ok(score) => {
                debug!(work_id = %work.id, score, "compared");
                Some(score)
            }
            Err(e) => {
                warn!(work_id = %work.id, error = %e, "skipping prior work: comparison failed");
                None
            }
        }
    }
}
