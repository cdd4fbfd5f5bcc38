//! Storage collaborators for the submission pipeline.
//!
//! Each concern is its own trait so backends can be swapped independently
//! at startup (SQLite records with a local blob directory in production,
//! [`memory`] backends in tests).
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`ContentStore`] | Raw blob bytes, addressed by an opaque handle |
//! | [`ContentRecordStore`] | [`StoredContent`] metadata rows |
//! | [`WorkStore`] | Works, including the per-assignment corpus lookup |
//! | [`ReportStore`] | Similarity reports, latest-by-work reads |
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Report, StoredContent, Work};

/// Blob storage addressed by handle.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store `bytes` and return a fresh, stable handle.
    async fn put(&self, bytes: &[u8]) -> Result<String>;

    /// Fetch the bytes behind `handle`; `NotFound` if there are none.
    async fn get(&self, handle: &str) -> Result<Vec<u8>>;

    async fn delete(&self, handle: &str) -> Result<()>;
}

/// Metadata records for stored blobs.
#[async_trait]
pub trait ContentRecordStore: Send + Sync {
    async fn save(&self, content: &StoredContent) -> Result<()>;

    async fn get_by_id(&self, id: Uuid) -> Result<StoredContent>;

    /// First record whose bytes hash to `hash`. Not used for dedup.
    async fn get_by_hash(&self, hash: &str) -> Result<StoredContent>;
}

/// Work records and the corpus lookup.
#[async_trait]
pub trait WorkStore: Send + Sync {
    async fn save(&self, work: &Work) -> Result<()>;

    async fn get_by_id(&self, id: Uuid) -> Result<Work>;

    /// All works for an assignment. The order is stable within one call.
    async fn find_by_assignment(&self, assignment_id: Uuid) -> Result<Vec<Work>>;

    async fn exists(&self, student_id: Uuid, assignment_id: Uuid) -> Result<bool>;
}

/// Report persistence.
///
/// Nothing here enforces one report per work; readers get the most recent.
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn save(&self, report: &Report) -> Result<()>;

    /// Most recent report for `work_id` by creation time.
    async fn get_latest_by_work(&self, work_id: Uuid) -> Result<Report>;
}
