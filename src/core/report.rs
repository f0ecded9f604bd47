use crate::core::{FailureKind, FetchError};
use crate::validator::RejectionKind;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

/// Input URLs finished so far, successfully or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UrlFailure {
    pub url: String,
    pub kind: FailureKind,
    pub message: String,
}

impl UrlFailure {
    pub fn new(url: impl Into<String>, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind,
            message: message.into(),
        }
    }

    pub fn from_fetch(url: impl Into<String>, error: &FetchError) -> Self {
        Self::new(url, error.kind(), error.to_string())
    }
}

/// Per-site tallies folded into the report as tasks finish.
#[derive(Debug, Default)]
pub(crate) struct SiteSummary {
    pub extracted: usize,
    pub written: usize,
    pub duplicates: usize,
    pub rejections: Vec<RejectionKind>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub total: usize,
    pub completed: usize,
    pub rows_written: usize,
    pub duplicates: usize,
    pub records_extracted: usize,
    pub records_rejected: usize,
    pub rejections: HashMap<RejectionKind, usize>,
    pub failures: Vec<UrlFailure>,
    /// URLs abandoned mid-fetch or never started because the run was
    /// cancelled.
    pub cancelled: Vec<String>,
}

impl CrawlReport {
    pub fn new(total: usize) -> Self {
        Self {
            run_id: Uuid::now_v7(),
            started_at: Utc::now(),
            finished_at: None,
            total,
            completed: 0,
            rows_written: 0,
            duplicates: 0,
            records_extracted: 0,
            records_rejected: 0,
            rejections: HashMap::new(),
            failures: Vec::new(),
            cancelled: Vec::new(),
        }
    }

    pub fn progress(&self) -> Progress {
        Progress {
            completed: self.completed,
            total: self.total,
        }
    }

    pub fn was_cancelled(&self) -> bool {
        !self.cancelled.is_empty()
    }

    pub(crate) fn record_site(&mut self, summary: SiteSummary) {
        self.completed += 1;
        self.records_extracted += summary.extracted;
        self.rows_written += summary.written;
        self.duplicates += summary.duplicates;
        self.records_rejected += summary.rejections.len();
        for kind in summary.rejections {
            *self.rejections.entry(kind).or_insert(0) += 1;
        }
    }

    pub(crate) fn record_failure(&mut self, failure: UrlFailure) {
        self.completed += 1;
        self.failures.push(failure);
    }

    pub(crate) fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn print_summary(&self) {
        println!("\nRun {}:", self.run_id);
        println!("URLs: {}/{} completed", self.completed, self.total);
        println!("Records Extracted: {}", self.records_extracted);
        println!("Records Rejected: {}", self.records_rejected);
        println!("Rows Written: {}", self.rows_written);
        println!("Duplicates: {}", self.duplicates);

        if !self.failures.is_empty() {
            println!("\nFailures:");
            for failure in &self.failures {
                println!("  {} [{}] {}", failure.url, failure.kind, failure.message);
            }
        }
        if !self.cancelled.is_empty() {
            println!("\nCancelled: {}", self.cancelled.len());
        }
    }
}
