//! Crawl events and the sinks that receive them.
//!
//! Pipeline stages report what happened through an injected [`EventSink`]
//! instead of logging directly, so tests can assert on what was emitted.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::Level;

use crate::collectors::filter::Rejection;
use crate::models::crawl_run::CrawlSummary;

#[derive(Debug, Clone, PartialEq)]
pub enum CrawlEvent {
    FetchTimeout { url: String, attempt: usize },
    FetchFailed { url: String, attempt: usize, error: String },
    FetchExhausted { url: String, attempts: usize },
    PageScraped { url: String, jobs: usize },
    CardSkipped { reason: &'static str },
    StageFinished { stage: &'static str, remaining: usize },
    Rejected { title: String, company: String, reason: Rejection },
    StoreReadFailed { collection: String, error: String, fail_open: bool },
    InvalidDate { title: String, date: String },
    TooOld { title: String, date: String },
    NewJob { title: String, company: String, url: String },
    LanguageNotAccepted { url: String, reason: Rejection },
    JobsStored { collection: String, count: u64 },
    StoreWriteFailed { collection: String, error: String },
    RunFinished(CrawlSummary),
}

impl CrawlEvent {
    pub fn level(&self) -> Level {
        match self {
            CrawlEvent::FetchFailed { .. }
            | CrawlEvent::StoreReadFailed { .. }
            | CrawlEvent::InvalidDate { .. }
            | CrawlEvent::StoreWriteFailed { .. } => Level::ERROR,
            CrawlEvent::FetchTimeout { .. }
            | CrawlEvent::FetchExhausted { .. }
            | CrawlEvent::CardSkipped { .. } => Level::WARN,
            CrawlEvent::Rejected { .. } | CrawlEvent::TooOld { .. } => Level::DEBUG,
            _ => Level::INFO,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CrawlEvent::FetchTimeout { .. } => "fetch.timeout",
            CrawlEvent::FetchFailed { .. } => "fetch.failed",
            CrawlEvent::FetchExhausted { .. } => "fetch.exhausted",
            CrawlEvent::PageScraped { .. } => "listing.page",
            CrawlEvent::CardSkipped { .. } => "listing.card_skipped",
            CrawlEvent::StageFinished { .. } => "stage.finished",
            CrawlEvent::Rejected { .. } => "filter.rejected",
            CrawlEvent::StoreReadFailed { .. } => "store.read_failed",
            CrawlEvent::InvalidDate { .. } => "detail.invalid_date",
            CrawlEvent::TooOld { .. } => "detail.too_old",
            CrawlEvent::NewJob { .. } => "detail.new_job",
            CrawlEvent::LanguageNotAccepted { .. } => "detail.language",
            CrawlEvent::JobsStored { .. } => "store.inserted",
            CrawlEvent::StoreWriteFailed { .. } => "store.write_failed",
            CrawlEvent::RunFinished(_) => "run.finished",
        }
    }
}

impl fmt::Display for CrawlEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrawlEvent::FetchTimeout { url, attempt } => {
                write!(f, "Timeout occurred on attempt {attempt} for URL: {url}")
            }
            CrawlEvent::FetchFailed { url, attempt, error } => {
                write!(f, "Attempt {attempt} for {url} failed: {error}")
            }
            CrawlEvent::FetchExhausted { url, attempts } => {
                write!(f, "Giving up on {url} after {attempts} attempts")
            }
            CrawlEvent::PageScraped { url, jobs } => {
                write!(f, "Finished scraping page ({jobs} cards): {url}")
            }
            CrawlEvent::CardSkipped { reason } => write!(f, "Skipping listing card: {reason}"),
            CrawlEvent::StageFinished { stage, remaining } => {
                write!(f, "{remaining} jobs left after {stage}")
            }
            CrawlEvent::Rejected { title, company, reason } => {
                write!(f, "Rejected '{title}' at '{company}': {reason}")
            }
            CrawlEvent::StoreReadFailed { collection, error, fail_open } => {
                let policy = if *fail_open {
                    "keeping candidates not matched so far"
                } else {
                    "treating all candidates as already seen"
                };
                write!(f, "Failed to read '{collection}' ({error}), {policy}")
            }
            CrawlEvent::InvalidDate { title, date } => {
                write!(f, "The date '{date}' for job '{title}' is not in the correct format")
            }
            CrawlEvent::TooOld { title, date } => {
                write!(f, "Skipping '{title}' posted {date}, outside the scrape window")
            }
            CrawlEvent::NewJob { title, company, url } => {
                write!(f, "Found new job: {title} at {company} {url}")
            }
            CrawlEvent::LanguageNotAccepted { url, reason } => {
                write!(f, "Job description language not supported: {reason} ({url})")
            }
            CrawlEvent::JobsStored { collection, count } => {
                write!(f, "Added {count} new records to the {collection} collection")
            }
            CrawlEvent::StoreWriteFailed { collection, error } => {
                write!(f, "Failed to write to the {collection} collection: {error}")
            }
            CrawlEvent::RunFinished(s) => write!(
                f,
                "Scraping finished in {:.2} seconds: {} scraped, {} new, {} accepted, {} filtered",
                s.duration.as_secs_f64(),
                s.scraped,
                s.novel,
                s.accepted,
                s.filtered
            ),
        }
    }
}

/// Receives crawl events. Emitting never fails.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: CrawlEvent);
}

/// Forwards events to `tracing` at each event's own level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: CrawlEvent) {
        let kind = event.kind();
        match event.level() {
            Level::ERROR => tracing::error!(kind, "{event}"),
            Level::WARN => tracing::warn!(kind, "{event}"),
            Level::INFO => tracing::info!(kind, "{event}"),
            Level::DEBUG => tracing::debug!(kind, "{event}"),
            _ => tracing::trace!(kind, "{event}"),
        }
    }
}

/// Wraps a sink and counts the error-level events passing through it.
pub struct CountingSink<'a> {
    inner: &'a dyn EventSink,
    errors: AtomicUsize,
}

impl<'a> CountingSink<'a> {
    pub fn new(inner: &'a dyn EventSink) -> Self {
        Self {
            inner,
            errors: AtomicUsize::new(0),
        }
    }

    pub fn errors(&self) -> usize {
        self.errors.load(Ordering::Relaxed)
    }
}

impl EventSink for CountingSink<'_> {
    fn emit(&self, event: CrawlEvent) {
        if event.level() == Level::ERROR {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
        self.inner.emit(event);
    }
}

/// Keeps every event in memory.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: std::sync::Mutex<Vec<CrawlEvent>>,
}

#[cfg(test)]
impl CollectingEventSink {
    pub fn events(&self) -> Vec<CrawlEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.events().iter().filter(|e| e.kind() == kind).count()
    }
}

#[cfg(test)]
impl EventSink for CollectingEventSink {
    fn emit(&self, event: CrawlEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting_sink_counts_only_errors() {
        let collected = CollectingEventSink::default();
        let counting = CountingSink::new(&collected);

        counting.emit(CrawlEvent::PageScraped {
            url: "u".into(),
            jobs: 3,
        });
        counting.emit(CrawlEvent::InvalidDate {
            title: "t".into(),
            date: "bad".into(),
        });

        assert_eq!(counting.errors(), 1);
        assert_eq!(collected.events().len(), 2);
    }

    #[test]
    fn test_store_read_failure_message_names_policy() {
        let event = CrawlEvent::StoreReadFailed {
            collection: "jobs".into(),
            error: "boom".into(),
            fail_open: false,
        };
        assert!(event.to_string().contains("already seen"));
        assert_eq!(event.level(), Level::ERROR);
    }
}
