//! Persistence gateway: two collections of job documents plus a run log.

mod postgres;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::crawl_run::CrawlSummary;
use crate::models::job::{JobIdentity, JobRecord};

pub use postgres::PgJobStore;

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Identity projection of every job stored in `collection`.
    async fn existing_jobs(&self, collection: &str) -> Result<Vec<JobIdentity>, AppError>;

    /// Batch insert; returns how many documents were written.
    async fn insert_jobs(&self, collection: &str, jobs: &[JobRecord]) -> Result<u64, AppError>;

    async fn record_run(&self, summary: &CrawlSummary) -> Result<(), AppError>;
}
