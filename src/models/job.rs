use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::error::AppError;

/// Placeholder description for a detail page without a rich-text body.
/// Filtered like any other text.
pub const DESCRIPTION_NOT_FOUND: &str = "Could not find Job Description";

/// Date format of `posted_date`.
pub const POSTED_DATE_FORMAT: &str = "%Y-%m-%d";

/// Rows per multi-row INSERT; keeps us under the Postgres bind limit.
const INSERT_CHUNK: usize = 1000;

/// A job posting as it moves through the crawl.
///
/// Serialized field names match the documents already stored by earlier
/// crawler versions (`date`, `job_url`, `job_description`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub title: String,
    pub company: String,
    pub location: String,
    #[serde(rename = "date")]
    pub posted_date: String,
    #[serde(rename = "job_url")]
    pub source_url: String,
    #[serde(rename = "job_description")]
    pub description: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applicant_count: Option<u32>,
    #[serde(default)]
    pub stack: Vec<String>,
    #[serde(default)]
    pub applied: bool,
}

/// The projection of a stored posting used for identity checks: two
/// postings are the same iff their URLs match, or title, company and date
/// all match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobIdentity {
    pub title: String,
    pub company: String,
    pub date: String,
    pub job_url: String,
}

impl From<&JobRecord> for JobIdentity {
    fn from(job: &JobRecord) -> Self {
        JobIdentity {
            title: job.title.clone(),
            company: job.company.clone(),
            date: job.posted_date.clone(),
            job_url: job.source_url.clone(),
        }
    }
}

impl JobRecord {
    /// A partial record as read from a listing card: no description yet.
    pub fn listed(
        title: String,
        company: String,
        location: String,
        posted_date: String,
        source_url: String,
        role: &str,
        search_location: Option<&str>,
    ) -> JobRecord {
        JobRecord {
            title,
            company,
            location,
            posted_date,
            source_url,
            description: String::new(),
            role: role.to_string(),
            search_location: search_location.map(String::from),
            applicant_count: None,
            stack: Vec::new(),
            applied: false,
        }
    }

    /// Returns the record with the detail-page fields filled in.
    pub fn with_details(self, description: String, applicant_count: Option<u32>) -> JobRecord {
        JobRecord {
            description,
            applicant_count,
            ..self
        }
    }

    /// Key used for in-batch deduplication.
    pub fn dedup_key(&self) -> (&str, &str) {
        (&self.title, &self.company)
    }

    pub fn posted_on(&self) -> Result<NaiveDate, chrono::ParseError> {
        NaiveDate::parse_from_str(&self.posted_date, POSTED_DATE_FORMAT)
    }

    /// Projected read of every posting stored in `collection`.
    pub async fn existing(pool: &PgPool, collection: &str) -> Result<Vec<JobIdentity>, AppError> {
        let rows = sqlx::query_as::<_, JobIdentity>(
            "SELECT title, company, date, job_url FROM job_documents WHERE collection = $1",
        )
        .bind(collection)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Batch insert into `collection`. Returns the number of rows written.
    pub async fn insert_many(
        pool: &PgPool,
        collection: &str,
        jobs: &[JobRecord],
    ) -> Result<u64, AppError> {
        let mut written = 0;
        for chunk in jobs.chunks(INSERT_CHUNK) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO job_documents (collection, title, company, date, job_url, document) ",
            );
            builder.push_values(chunk, |mut row, job| {
                row.push_bind(collection.to_string())
                    .push_bind(job.title.clone())
                    .push_bind(job.company.clone())
                    .push_bind(job.posted_date.clone())
                    .push_bind(job.source_url.clone())
                    .push_bind(Json(job.clone()));
            });
            let result = builder.build().execute(pool).await?;
            written += result.rows_affected();
        }
        Ok(written)
    }
}
