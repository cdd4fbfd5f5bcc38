//! Service wiring.
//!
//! Builds the production collaborators from a [`Config`] (SQLite records,
//! a local blob directory, the plain-text extractor, and the shingle
//! detector) and hands them to the services the CLI and server call.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use copycheck_core::similarity::ShingleDetector;

use crate::blob::LocalBlobStore;
use crate::config::Config;
use crate::db;
use crate::extract::PlainTextExtractor;
use crate::migrate;
use crate::reports::ReportService;
use crate::sqlite_store::SqliteStore;
use crate::submission::{DetectionSettings, SubmissionService};
use crate::wordcloud::WordCloudService;

#[derive(Clone)]
pub struct Services {
    pub store: SqliteStore,
    pub submissions: SubmissionService,
    pub reports: ReportService,
    pub word_clouds: WordCloudService,
}

impl Services {
    /// Connect, migrate, and wire everything up.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::apply(&pool).await?;

        let store = SqliteStore::new(pool);
        let records = Arc::new(store.clone());
        let blobs = Arc::new(LocalBlobStore::open(&config.storage.root)?);
        let extractor = Arc::new(PlainTextExtractor::new());
        let detector = Arc::new(ShingleDetector::new(config.detection.shingle_len));

        info!(
            db = %config.db.path.display(),
            storage = %blobs.root().display(),
            threshold = config.detection.threshold,
            shingle_len = detector.shingle_len(),
            "services ready"
        );

        let submissions = SubmissionService::new(
            blobs.clone(),
            records.clone(),
            records.clone(),
            records.clone(),
            extractor.clone(),
            detector,
            DetectionSettings::from(&config.detection),
        );
        let reports = ReportService::new(records.clone(), records.clone());
        let word_clouds = WordCloudService::new(records.clone(), records, blobs, extractor);

        Ok(Self {
            store,
            submissions,
            reports,
            word_clouds,
        })
    }

    pub async fn close(&self) {
        self.store.pool().close().await;
    }
}
