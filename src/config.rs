use std::collections::BTreeMap;
use std::time::Duration;

use clap::Parser;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::AppError;

#[derive(Parser, Debug, Clone)]
#[command(name = "jobscout", about = "Crawl job listings and store new, relevant postings")]
pub struct Config {
    /// Database connection URL
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Run database migrations on startup
    #[arg(long, env = "RUN_MIGRATIONS", default_value = "true")]
    pub run_migrations: bool,

    /// Proxy URLs keyed by scheme, as a JSON object
    #[arg(long, env = "PROXIES", default_value = "{}")]
    pub proxies: String,

    /// Extra request headers, as a JSON object
    #[arg(long, env = "HEADERS", default_value = "{}")]
    pub headers: String,

    /// JSON array of {"keywords", "location", "f_WT"} objects
    #[arg(long, env = "SEARCH_QUERIES")]
    pub search_queries: String,

    /// Words that reject a job when found in its description (JSON array)
    #[arg(long, env = "DESC_WORDS", default_value = "[]")]
    pub desc_words: String,

    /// Words that reject a job when found in its title (JSON array)
    #[arg(long, env = "TITLE_EXCLUDE", default_value = "[]")]
    pub title_exclude: String,

    /// Words of which at least one must appear in the title (JSON array)
    #[arg(long, env = "TITLE_INCLUDE", default_value = "[]")]
    pub title_include: String,

    /// Words that reject a job when found in its company name (JSON array)
    #[arg(long, env = "COMPANY_EXCLUDE", default_value = "[]")]
    pub company_exclude: String,

    /// Accepted description languages, ISO 639-1 or 639-3 codes (JSON array)
    #[arg(long, env = "LANGUAGES", default_value = "[]")]
    pub languages: String,

    /// Search time window token, e.g. r86400
    #[arg(long, env = "TIMESPAN", default_value = "")]
    pub timespan: String,

    #[arg(long, env = "JOBS_TABLENAME", default_value = "jobs")]
    pub jobs_tablename: String,

    #[arg(long, env = "FILTERED_JOBS_TABLENAME", default_value = "filtered_jobs")]
    pub filtered_jobs_tablename: String,

    #[arg(long, env = "PAGES_TO_SCRAPE", default_value = "1")]
    pub pages_to_scrape: u32,

    #[arg(long, env = "ROUNDS", default_value = "1")]
    pub rounds: u32,

    /// Postings older than this many days are not enriched
    #[arg(long, env = "DAYS_TO_SCRAPE", default_value = "7")]
    pub days_to_scrape: i64,

    /// Tag stored on every job from this run
    #[arg(long, env = "ROLE", default_value = "")]
    pub role: String,

    /// Seconds to wait between requests
    #[arg(long, env = "DELAY_BETWEEN_REQUESTS", default_value = "1")]
    pub delay_between_requests: u64,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,

    /// Repeat the crawl every N seconds until interrupted (single run when unset)
    #[arg(long, env = "CRAWL_INTERVAL")]
    pub crawl_interval: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchQuery {
    pub keywords: String,
    pub location: String,
    #[serde(rename = "f_WT", default)]
    pub workplace_type: String,
}

/// Everything a crawl run needs, validated once at startup.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub proxies: BTreeMap<String, String>,
    pub headers: HeaderMap,
    pub search_queries: Vec<SearchQuery>,
    pub description_exclude: Vec<String>,
    pub title_exclude: Vec<String>,
    pub title_include: Vec<String>,
    pub company_exclude: Vec<String>,
    pub languages: Vec<String>,
    pub timespan: String,
    pub days_to_scrape: i64,
    pub pages_to_scrape: u32,
    pub rounds: u32,
    pub delay_between_requests: Duration,
    pub role: String,
    pub jobs_collection: String,
    pub filtered_jobs_collection: String,
}

impl Config {
    /// Parse the JSON-valued settings into a [`CrawlConfig`].
    pub fn crawl_config(&self) -> Result<CrawlConfig, AppError> {
        let proxies: BTreeMap<String, String> = parse_json("PROXIES", &self.proxies)?;
        for url in proxies.values() {
            reqwest::Proxy::all(url.as_str())
                .map_err(|e| AppError::Config(format!("PROXIES: invalid proxy '{url}': {e}")))?;
        }

        let raw_headers: BTreeMap<String, String> = parse_json("HEADERS", &self.headers)?;
        let mut headers = HeaderMap::new();
        for (name, value) in &raw_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| AppError::Config(format!("HEADERS: invalid name '{name}': {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| AppError::Config(format!("HEADERS: invalid value for {name}: {e}")))?;
            headers.insert(name, value);
        }

        let search_queries: Vec<SearchQuery> = parse_json("SEARCH_QUERIES", &self.search_queries)?;
        if search_queries.is_empty() {
            return Err(AppError::Config("SEARCH_QUERIES must not be empty".to_string()));
        }

        if self.jobs_tablename == self.filtered_jobs_tablename {
            return Err(AppError::Config(
                "JOBS_TABLENAME and FILTERED_JOBS_TABLENAME must differ".to_string(),
            ));
        }

        Ok(CrawlConfig {
            proxies,
            headers,
            search_queries,
            description_exclude: parse_words("DESC_WORDS", &self.desc_words)?,
            title_exclude: parse_words("TITLE_EXCLUDE", &self.title_exclude)?,
            title_include: parse_words("TITLE_INCLUDE", &self.title_include)?,
            company_exclude: parse_words("COMPANY_EXCLUDE", &self.company_exclude)?,
            languages: parse_words("LANGUAGES", &self.languages)?,
            timespan: self.timespan.clone(),
            days_to_scrape: self.days_to_scrape,
            pages_to_scrape: self.pages_to_scrape,
            rounds: self.rounds,
            delay_between_requests: Duration::from_secs(self.delay_between_requests),
            role: self.role.clone(),
            jobs_collection: self.jobs_tablename.clone(),
            filtered_jobs_collection: self.filtered_jobs_tablename.clone(),
        })
    }
}

fn parse_json<T: DeserializeOwned>(name: &str, raw: &str) -> Result<T, AppError> {
    serde_json::from_str(raw).map_err(|e| AppError::Config(format!("{name}: {e}")))
}

/// Blank entries are dropped: an empty word would match every text.
fn parse_words(name: &str, raw: &str) -> Result<Vec<String>, AppError> {
    let words: Vec<String> = parse_json(name, raw)?;
    Ok(words
        .into_iter()
        .map(|w| w.trim().to_string())
        .filter(|w| !w.is_empty())
        .collect())
}

#[cfg(test)]
impl CrawlConfig {
    /// A config with no filters, no delay and a single query.
    pub fn for_tests() -> CrawlConfig {
        CrawlConfig {
            proxies: BTreeMap::new(),
            headers: HeaderMap::new(),
            search_queries: vec![SearchQuery {
                keywords: "DevOps Engineer".to_string(),
                location: "United States".to_string(),
                workplace_type: String::new(),
            }],
            description_exclude: Vec::new(),
            title_exclude: Vec::new(),
            title_include: Vec::new(),
            company_exclude: Vec::new(),
            languages: Vec::new(),
            timespan: "r86400".to_string(),
            days_to_scrape: 10,
            pages_to_scrape: 1,
            rounds: 1,
            delay_between_requests: Duration::ZERO,
            role: "devops".to_string(),
            jobs_collection: "jobs".to_string(),
            filtered_jobs_collection: "filtered_jobs".to_string(),
        }
    }
}
