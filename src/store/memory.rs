use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::crawl_run::CrawlSummary;
use crate::models::job::{JobIdentity, JobRecord};
use crate::store::JobStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadFailure {
    Unavailable,
    Structural,
}

/// In-memory store with optional injected failures.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    collections: Mutex<HashMap<String, Vec<JobRecord>>>,
    runs: Mutex<Vec<CrawlSummary>>,
    read_failure: Option<ReadFailure>,
    /// Restricts `read_failure` to one collection; all of them when unset.
    failing_read_collection: Option<String>,
    failing_write_collection: Option<String>,
}

impl MemoryJobStore {
    /// Every read fails with `failure`.
    pub fn failing_reads(failure: ReadFailure) -> Self {
        Self {
            read_failure: Some(failure),
            ..Default::default()
        }
    }

    /// Reads of `collection` fail with `failure`; other collections read fine.
    pub fn failing_reads_of(collection: &str, failure: ReadFailure) -> Self {
        Self {
            read_failure: Some(failure),
            failing_read_collection: Some(collection.to_string()),
            ..Default::default()
        }
    }

    /// Inserts into `collection` fail as if the pool had closed.
    pub fn failing_writes_to(collection: &str) -> Self {
        Self {
            failing_write_collection: Some(collection.to_string()),
            ..Default::default()
        }
    }

    pub fn jobs(&self, collection: &str) -> Vec<JobRecord> {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn runs(&self) -> Vec<CrawlSummary> {
        self.runs.lock().unwrap().clone()
    }

    pub fn seed(&self, collection: &str, jobs: Vec<JobRecord>) {
        self.collections
            .lock()
            .unwrap()
            .entry(collection.to_string())
            .or_default()
            .extend(jobs);
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn existing_jobs(&self, collection: &str) -> Result<Vec<JobIdentity>, AppError> {
        let applies = self
            .failing_read_collection
            .as_deref()
            .is_none_or(|failing| failing == collection);
        match self.read_failure.filter(|_| applies) {
            Some(ReadFailure::Unavailable) => {
                Err(AppError::from(sqlx::Error::PoolTimedOut))
            }
            Some(ReadFailure::Structural) => Err(AppError::from(sqlx::Error::ColumnNotFound(
                "job_url".to_string(),
            ))),
            None => Ok(self.jobs(collection).iter().map(JobIdentity::from).collect()),
        }
    }

    async fn insert_jobs(&self, collection: &str, jobs: &[JobRecord]) -> Result<u64, AppError> {
        if self.failing_write_collection.as_deref() == Some(collection) {
            return Err(AppError::from(sqlx::Error::PoolClosed));
        }
        self.seed(collection, jobs.to_vec());
        Ok(jobs.len() as u64)
    }

    async fn record_run(&self, summary: &CrawlSummary) -> Result<(), AppError> {
        self.runs.lock().unwrap().push(summary.clone());
        Ok(())
    }
}
