use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Create the database and schema. Safe to run repeatedly.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}

pub async fn apply(pool: &SqlitePool) -> Result<()> {
    // Blob metadata; content_hash is indexed but not unique
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS contents (
            id TEXT PRIMARY KEY,
            handle TEXT NOT NULL UNIQUE,
            original_name TEXT NOT NULL,
            media_type TEXT NOT NULL,
            size INTEGER NOT NULL,
            content_hash TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS works (
            id TEXT PRIMARY KEY,
            assignment_id TEXT NOT NULL,
            student_id TEXT NOT NULL,
            content_id TEXT NOT NULL,
            submitted_at INTEGER NOT NULL,
            FOREIGN KEY (content_id) REFERENCES contents(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // No UNIQUE(work_id): readers take the most recent row
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reports (
            id TEXT PRIMARY KEY,
            work_id TEXT NOT NULL,
            score REAL NOT NULL,
            is_plagiarized INTEGER NOT NULL,
            matched_work_id TEXT,
            details_json TEXT NOT NULL DEFAULT '{}',
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_contents_hash ON contents(content_hash)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_works_assignment ON works(assignment_id, submitted_at)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_works_student ON works(student_id, assignment_id)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_reports_work ON reports(work_id, created_at DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
