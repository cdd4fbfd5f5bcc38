//! SQLite-backed record stores.
//!
//! [`SqliteStore`] implements [`ContentRecordStore`], [`WorkStore`], and
//! [`ReportStore`] over the schema created by [`crate::migrate`]. Ids are
//! stored as hyphenated UUID text and timestamps as Unix milliseconds.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use copycheck_core::models::{AnalysisDetails, Report, StoredContent, Work};
use copycheck_core::store::{ContentRecordStore, ReportStore, WorkStore};
use copycheck_core::{Error, Result};

/// SQLite implementation of the record store traits.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Liveness check for `/health`.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

fn db_err(e: sqlx::Error) -> Error {
    Error::storage(e)
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| Error::storage(format!("corrupt id {:?}: {}", s, e)))
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| Error::storage(format!("timestamp out of range: {}", ms)))
}

fn content_from_row(row: &SqliteRow) -> Result<StoredContent> {
    let id: String = row.get("id");
    let size: i64 = row.get("size");
    Ok(StoredContent {
        id: parse_uuid(&id)?,
        handle: row.get("handle"),
        original_name: row.get("original_name"),
        media_type: row.get("media_type"),
        size: size.max(0) as u64,
        content_hash: row.get("content_hash"),
        created_at: from_millis(row.get("created_at"))?,
    })
}

fn work_from_row(row: &SqliteRow) -> Result<Work> {
    let id: String = row.get("id");
    let assignment_id: String = row.get("assignment_id");
    let student_id: String = row.get("student_id");
    let content_id: String = row.get("content_id");
    Ok(Work {
        id: parse_uuid(&id)?,
        assignment_id: parse_uuid(&assignment_id)?,
        student_id: parse_uuid(&student_id)?,
        content_id: parse_uuid(&content_id)?,
        submitted_at: from_millis(row.get("submitted_at"))?,
    })
}

fn report_from_row(row: &SqliteRow) -> Result<Report> {
    let id: String = row.get("id");
    let work_id: String = row.get("work_id");
    let matched: Option<String> = row.get("matched_work_id");
    let details_json: String = row.get("details_json");
    let details: AnalysisDetails = serde_json::from_str(&details_json)
        .map_err(|e| Error::storage(format!("corrupt report details: {}", e)))?;
    Ok(Report {
        id: parse_uuid(&id)?,
        work_id: parse_uuid(&work_id)?,
        score: row.get("score"),
        is_plagiarized: row.get("is_plagiarized"),
        matched_work_id: matched.as_deref().map(parse_uuid).transpose()?,
        details,
        created_at: from_millis(row.get("created_at"))?,
    })
}

const CONTENT_COLUMNS: &str =
    "id, handle, original_name, media_type, size, content_hash, created_at";

#[async_trait]
impl ContentRecordStore for SqliteStore {
    async fn save(&self, content: &StoredContent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO contents (id, handle, original_name, media_type, size, content_hash, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(content.id.to_string())
        .bind(&content.handle)
        .bind(&content.original_name)
        .bind(&content.media_type)
        .bind(content.size as i64)
        .bind(&content.content_hash)
        .bind(content.created_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<StoredContent> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM contents WHERE id = ?",
            CONTENT_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or_else(|| Error::not_found(format!("content {}", id)))?;
        content_from_row(&row)
    }

    async fn get_by_hash(&self, hash: &str) -> Result<StoredContent> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM contents WHERE content_hash = ? ORDER BY created_at ASC, rowid ASC LIMIT 1",
            CONTENT_COLUMNS
        ))
        .bind(hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or_else(|| Error::not_found(format!("content with hash {}", hash)))?;
        content_from_row(&row)
    }
}

#[async_trait]
impl WorkStore for SqliteStore {
    async fn save(&self, work: &Work) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO works (id, assignment_id, student_id, content_id, submitted_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(work.id.to_string())
        .bind(work.assignment_id.to_string())
        .bind(work.student_id.to_string())
        .bind(work.content_id.to_string())
        .bind(work.submitted_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Work> {
        let row = sqlx::query(
            "SELECT id, assignment_id, student_id, content_id, submitted_at FROM works WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or_else(|| Error::not_found(format!("work {}", id)))?;
        work_from_row(&row)
    }

    async fn find_by_assignment(&self, assignment_id: Uuid) -> Result<Vec<Work>> {
        let rows = sqlx::query(
            r#"
            SELECT id, assignment_id, student_id, content_id, submitted_at
            FROM works
            WHERE assignment_id = ?
            ORDER BY submitted_at ASC, rowid ASC
            "#,
        )
        .bind(assignment_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(work_from_row).collect()
    }

    async fn exists(&self, student_id: Uuid, assignment_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM works WHERE student_id = ? AND assignment_id = ?)",
        )
        .bind(student_id.to_string())
        .bind(assignment_id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(exists)
    }
}

#[async_trait]
impl ReportStore for SqliteStore {
    async fn save(&self, report: &Report) -> Result<()> {
        let details_json = serde_json::to_string(&report.details)
            .map_err(|e| Error::storage(format!("failed to encode report details: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO reports (id, work_id, score, is_plagiarized, matched_work_id, details_json, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(report.id.to_string())
        .bind(report.work_id.to_string())
        .bind(report.score)
        .bind(report.is_plagiarized)
        .bind(report.matched_work_id.map(|id| id.to_string()))
        .bind(details_json)
        .bind(report.created_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_latest_by_work(&self, work_id: Uuid) -> Result<Report> {
        let row = sqlx::query(
            r#"
            SELECT id, work_id, score, is_plagiarized, matched_work_id, details_json, created_at
            FROM reports
            WHERE work_id = ?
            ORDER BY created_at DESC, rowid DESC
            LIMIT 1
            "#,
        )
        .bind(work_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or_else(|| Error::not_found(format!("report for work {}", work_id)))?;
        report_from_row(&row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::{db, migrate};
    use copycheck_core::models::content_hash;
    use tempfile::TempDir;

    async fn open(tmp: &TempDir) -> SqliteStore {
        let cfg = parse_config(&format!(
            "[db]\npath = \"{}\"\n\n[storage]\nroot = \"{}\"\n",
            tmp.path().join("test.sqlite").display(),
            tmp.path().join("files").display()
        ))
        .unwrap();
        let pool = db::connect(&cfg).await.unwrap();
        migrate::apply(&pool).await.unwrap();
        SqliteStore::new(pool)
    }

    fn content(handle: &str, bytes: &[u8]) -> StoredContent {
        StoredContent::new(
            handle.to_string(),
            "essay.txt",
            "text/plain",
            bytes.len() as u64,
            content_hash(bytes),
        )
    }

    #[tokio::test]
    async fn content_round_trip() {
        let tmp = TempDir::new().unwrap();
        let store = open(&tmp).await;
        let c = content("h1", b"some essay");
        ContentRecordStore::save(&store, &c).await.unwrap();

        assert_eq!(ContentRecordStore::get_by_id(&store, c.id).await.unwrap(), c);
        assert_eq!(store.get_by_hash(&c.content_hash).await.unwrap(), c);
        assert!(ContentRecordStore::get_by_id(&store, Uuid::new_v4())
            .await
            .unwrap_err()
            .is_not_found());
        store.ping().await.unwrap();
    }

    #[tokio::test]
    async fn works_come_back_in_submission_order() {
        let tmp = TempDir::new().unwrap();
        let store = open(&tmp).await;
        let c = content("h1", b"text");
        ContentRecordStore::save(&store, &c).await.unwrap();

        let assignment = Uuid::new_v4();
        let first = Work::new(assignment, Uuid::new_v4(), c.id);
        let mut second = Work::new(assignment, Uuid::new_v4(), c.id);
        // Same millisecond as the first; insertion order breaks the tie.
        second.submitted_at = first.submitted_at;
        let elsewhere = Work::new(Uuid::new_v4(), Uuid::new_v4(), c.id);
        for w in [&first, &second, &elsewhere] {
            WorkStore::save(&store, w).await.unwrap();
        }

        let found = store.find_by_assignment(assignment).await.unwrap();
        assert_eq!(found, vec![first.clone(), second]);
        assert_eq!(WorkStore::get_by_id(&store, first.id).await.unwrap(), first);
        assert!(store.exists(first.student_id, assignment).await.unwrap());
        assert!(!store.exists(elsewhere.student_id, assignment).await.unwrap());
    }

    #[tokio::test]
    async fn work_needs_existing_content() {
        let tmp = TempDir::new().unwrap();
        let store = open(&tmp).await;
        let orphan = Work::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let err = WorkStore::save(&store, &orphan).await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
    }

    #[tokio::test]
    async fn latest_report_and_details_survive() {
        let tmp = TempDir::new().unwrap();
        let store = open(&tmp).await;
        let work_id = Uuid::new_v4();
        let matched = Uuid::new_v4();

        let mut older = Report::new(work_id, 0.1, 0.85);
        older.created_at -= chrono::Duration::seconds(5);
        let mut newer = Report::new(work_id, 0.95, 0.85);
        newer.set_match(
            matched,
            AnalysisDetails {
                algorithm: "shingle".into(),
                matched_tokens: 0,
                total_tokens: 42,
            },
        );
        ReportStore::save(&store, &newer).await.unwrap();
        ReportStore::save(&store, &older).await.unwrap();

        let latest = store.get_latest_by_work(work_id).await.unwrap();
        assert_eq!(latest.id, newer.id);
        assert!(latest.is_plagiarized);
        assert_eq!(latest.matched_work_id, Some(matched));
        assert_eq!(latest.details.total_tokens, 42);
        assert_eq!(latest.created_at, newer.created_at);
        assert!(store
            .get_latest_by_work(Uuid::new_v4())
            .await
            .unwrap_err()
            .is_not_found());
    }
}
