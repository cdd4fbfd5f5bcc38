//! In-memory store implementations for testing.
//!
//! Uses `HashMap` and `Vec` behind `std::sync::RwLock`. Locks are never held
//! across an `.await`.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{Report, StoredContent, Work};

use super::{ContentRecordStore, ContentStore, ReportStore, WorkStore};

fn poisoned<T>(_: T) -> Error {
    Error::storage("in-memory store lock poisoned")
}

/// Blob store keeping bytes in a map keyed by a generated handle.
#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.read().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ContentStore for InMemoryBlobStore {
    async fn put(&self, bytes: &[u8]) -> Result<String> {
        let handle = Uuid::new_v4().to_string();
        self.blobs
            .write()
            .map_err(poisoned)?
            .insert(handle.clone(), bytes.to_vec());
        Ok(handle)
    }

    async fn get(&self, handle: &str) -> Result<Vec<u8>> {
        self.blobs
            .read()
            .map_err(poisoned)?
            .get(handle)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("blob {}", handle)))
    }

    async fn delete(&self, handle: &str) -> Result<()> {
        match self.blobs.write().map_err(poisoned)?.remove(handle) {
            Some(_) => Ok(()),
            None => Err(Error::not_found(format!("blob {}", handle))),
        }
    }
}

/// Record store for contents, works, and reports.
///
/// Works and reports are kept in insertion order, so corpus lookups return
/// works in the order they were saved.
#[derive(Default)]
pub struct InMemoryStore {
    contents: RwLock<Vec<StoredContent>>,
    works: RwLock<Vec<Work>>,
    reports: RwLock<Vec<Report>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report_count(&self) -> usize {
        self.reports.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn work_count(&self) -> usize {
        self.works.read().map(|w| w.len()).unwrap_or(0)
    }

    pub fn content_count(&self) -> usize {
        self.contents.read().map(|c| c.len()).unwrap_or(0)
    }
}

#[async_trait]
impl ContentRecordStore for InMemoryStore {
    async fn save(&self, content: &StoredContent) -> Result<()> {
        let mut contents = self.contents.write().map_err(poisoned)?;
        if contents.iter().any(|c| c.id == content.id) {
            return Err(Error::storage(format!("duplicate content id {}", content.id)));
        }
        contents.push(content.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<StoredContent> {
        self.contents
            .read()
            .map_err(poisoned)?
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("content {}", id)))
    }

    async fn get_by_hash(&self, hash: &str) -> Result<StoredContent> {
        self.contents
            .read()
            .map_err(poisoned)?
            .iter()
            .find(|c| c.content_hash == hash)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("content with hash {}", hash)))
    }
}

#[async_trait]
impl WorkStore for InMemoryStore {
    async fn save(&self, work: &Work) -> Result<()> {
        let mut works = self.works.write().map_err(poisoned)?;
        if works.iter().any(|w| w.id == work.id) {
            return Err(Error::storage(format!("duplicate work id {}", work.id)));
        }
        works.push(work.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Work> {
        self.works
            .read()
            .map_err(poisoned)?
            .iter()
            .find(|w| w.id == id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("work {}", id)))
    }

    async fn find_by_assignment(&self, assignment_id: Uuid) -> Result<Vec<Work>> {
        Ok(self
            .works
            .read()
            .map_err(poisoned)?
            .iter()
            .filter(|w| w.assignment_id == assignment_id)
            .cloned()
            .collect())
    }

    async fn exists(&self, student_id: Uuid, assignment_id: Uuid) -> Result<bool> {
        Ok(self
            .works
            .read()
            .map_err(poisoned)?
            .iter()
            .any(|w| w.student_id == student_id && w.assignment_id == assignment_id))
    }
}

#[async_trait]
impl ReportStore for InMemoryStore {
    async fn save(&self, report: &Report) -> Result<()> {
        self.reports.write().map_err(poisoned)?.push(report.clone());
        Ok(())
    }

    async fn get_latest_by_work(&self, work_id: Uuid) -> Result<Report> {
        // Later insertions win ties on created_at.
        self.reports
            .read()
            .map_err(poisoned)?
            .iter()
            .filter(|r| r.work_id == work_id)
            .fold(None::<&Report>, |latest, r| match latest {
                Some(l) if l.created_at > r.created_at => Some(l),
                _ => Some(r),
            })
            .cloned()
            .ok_or_else(|| Error::not_found(format!("report for work {}", work_id)))
    }
}
