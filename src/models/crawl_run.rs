use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::error::AppError;

/// Outcome of one crawl run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlSummary {
    /// Listing cards read before deduplication.
    pub scraped: usize,
    /// Candidates left after novelty resolution.
    pub novel: usize,
    pub accepted: usize,
    pub filtered: usize,
    pub duration: Duration,
    pub had_errors: bool,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct CrawlRun {
    pub id: i32,
    pub scraped: i64,
    pub novel: i64,
    pub accepted: i64,
    pub filtered: i64,
    pub duration_ms: i64,
    pub had_errors: bool,
    pub finished_at: DateTime<Utc>,
}

impl CrawlRun {
    /// Append an audit row for a finished run.
    pub async fn record(pool: &PgPool, summary: &CrawlSummary) -> Result<CrawlRun, AppError> {
        let run = sqlx::query_as::<_, CrawlRun>(
            "INSERT INTO crawl_runs (scraped, novel, accepted, filtered, duration_ms, had_errors) VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(saturating_i64(summary.scraped))
        .bind(saturating_i64(summary.novel))
        .bind(saturating_i64(summary.accepted))
        .bind(saturating_i64(summary.filtered))
        .bind(saturating_i64(summary.duration.as_millis()))
        .bind(summary.had_errors)
        .fetch_one(pool)
        .await?;
        Ok(run)
    }
}

/// Postgres has no unsigned integers; clamp rather than wrap.
fn saturating_i64<T: TryInto<i64>>(n: T) -> i64 {
    n.try_into().unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oversized_values_clamp_instead_of_wrapping() {
        assert_eq!(saturating_i64(42usize), 42);
        assert_eq!(saturating_i64(usize::MAX), i64::MAX);
        assert_eq!(saturating_i64(Duration::MAX.as_millis()), i64::MAX);
        assert_eq!(saturating_i64(Duration::from_secs(3).as_millis()), 3000);
    }
}
