use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::AppError;
use crate::models::crawl_run::{CrawlRun, CrawlSummary};
use crate::models::job::{JobIdentity, JobRecord};
use crate::store::JobStore;

/// Job documents kept in the `job_documents` table, one logical
/// collection per `collection` value.
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn existing_jobs(&self, collection: &str) -> Result<Vec<JobIdentity>, AppError> {
        JobRecord::existing(&self.pool, collection).await
    }

    async fn insert_jobs(&self, collection: &str, jobs: &[JobRecord]) -> Result<u64, AppError> {
        JobRecord::insert_many(&self.pool, collection, jobs).await
    }

    async fn record_run(&self, summary: &CrawlSummary) -> Result<(), AppError> {
        let run = CrawlRun::record(&self.pool, summary).await?;
        tracing::debug!("Recorded crawl run {}", run.id);
        Ok(())
    }
}
