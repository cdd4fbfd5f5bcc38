//! Report retrieval.
//!
//! Read side of the pipeline: latest report for one work, and the latest
//! report for every work of an assignment. Used by the `copycheck report`
//! and `copycheck reports` commands and by the HTTP report endpoints.

use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use copycheck_core::models::ReportResponse;
use copycheck_core::store::{ReportStore, WorkStore};
use copycheck_core::Result;

#[derive(Clone)]
pub struct ReportService {
    reports: Arc<dyn ReportStore>,
    works: Arc<dyn WorkStore>,
}

impl ReportService {
    pub fn new(reports: Arc<dyn ReportStore>, works: Arc<dyn WorkStore>) -> Self {
        Self { reports, works }
    }

    /// Latest report for `work_id`; `NotFound` if none was written.
    pub async fn get_report(&self, work_id: Uuid) -> Result<ReportResponse> {
        let report = self.reports.get_latest_by_work(work_id).await?;
        Ok(ReportResponse::from(&report))
    }

    /// Latest report of each work in the assignment, in corpus order.
    ///
    /// Works without a report (still processing, or cancelled) are left out.
    pub async fn list_for_assignment(&self, assignment_id: Uuid) -> Result<Vec<ReportResponse>> {
        let works = self.works.find_by_assignment(assignment_id).await?;
        let mut out = Vec::with_capacity(works.len());
        for work in works {
            match self.reports.get_latest_by_work(work.id).await {
                Ok(report) => out.push(ReportResponse::from(&report)),
                Err(e) if e.is_not_found() => {}
                Err(e) => warn!(work_id = %work.id, error = %e, "skipping unreadable report"),
            }
        }
        Ok(out)
    }
}

/// Print a report in the CLI's key/value layout.
pub fn print_report(report: &ReportResponse) {
    println!("work_id:          {}", report.work_id);
    println!("similarity_score: {:.4}", report.similarity_score);
    println!("is_plagiarized:   {}", report.is_plagiarized);
    if let Some(matched) = report.matched_work_id {
        println!("matched_work_id:  {}", matched);
    }
    println!("algorithm:        {}", report.details.algorithm);
    println!("total_tokens:     {}", report.details.total_tokens);
    println!("created_at:       {}", report.created_at);
}
