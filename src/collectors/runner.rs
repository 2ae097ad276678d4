use std::time::{Duration, Instant};

use chrono::NaiveDateTime;

use crate::collectors::dedup::remove_duplicates;
use crate::collectors::enricher::enrich_jobs;
use crate::collectors::fetcher::PageFetcher;
use crate::collectors::filter::RelevanceFilter;
use crate::collectors::listing::{extract_listing, search_url};
use crate::collectors::novelty::find_new_jobs;
use crate::config::CrawlConfig;
use crate::events::{CountingSink, CrawlEvent, EventSink};
use crate::models::crawl_run::CrawlSummary;
use crate::models::job::JobRecord;
use crate::store::JobStore;

/// Everything one crawl run needs. Requests are issued one at a time.
pub struct Crawler<'a> {
    pub config: &'a CrawlConfig,
    pub filter: &'a RelevanceFilter,
    pub fetcher: &'a dyn PageFetcher,
    pub store: &'a dyn JobStore,
}

/// Crawl once, or every `interval` until Ctrl-C when one is given.
/// A run in progress is never interrupted. Returns whether any run
/// reported an error.
pub async fn run(crawler: &Crawler<'_>, events: &dyn EventSink, interval: Option<Duration>) -> bool {
    let Some(interval) = interval else {
        return crawler.crawl(local_now(), events).await.had_errors;
    };

    tracing::info!("Crawling every {}s", interval.as_secs());
    let mut had_errors = false;
    loop {
        had_errors |= crawler.crawl(local_now(), events).await.had_errors;
        tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received, exiting gracefully");
                break;
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
    had_errors
}

fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

impl Crawler<'_> {
    /// One full pass: listings, dedup, coarse filter, novelty, details,
    /// final filter, persistence. `now` anchors the scrape window.
    pub async fn crawl(&self, now: NaiveDateTime, events: &dyn EventSink) -> CrawlSummary {
        let started = Instant::now();
        let counting = CountingSink::new(events);
        let events: &dyn EventSink = &counting;

        let listed = self.collect_listings(events).await;
        let scraped = listed.len();
        stage(events, "scraping", scraped);

        let jobs = remove_duplicates(listed);
        stage(events, "removing duplicates", jobs.len());

        let jobs = self.filter.retain_relevant(jobs, events);
        stage(events, "removing irrelevant jobs", jobs.len());

        let collections = [
            self.config.jobs_collection.as_str(),
            self.config.filtered_jobs_collection.as_str(),
        ];
        let jobs = find_new_jobs(jobs, self.store, &collections, events).await;
        let novel = jobs.len();
        stage(events, "comparing to the database", novel);

        let enriched = enrich_jobs(jobs, self.config, self.filter, self.fetcher, now, events).await;
        let (accepted, filtered) = self.filter.partition(enriched, events);

        self.persist(&self.config.jobs_collection, &accepted, events)
            .await;
        self.persist(&self.config.filtered_jobs_collection, &filtered, events)
            .await;

        let mut summary = CrawlSummary {
            scraped,
            novel,
            accepted: accepted.len(),
            filtered: filtered.len(),
            duration: started.elapsed(),
            had_errors: counting.errors() > 0,
        };
        if let Err(e) = self.store.record_run(&summary).await {
            events.emit(CrawlEvent::StoreWriteFailed {
                collection: "crawl_runs".to_string(),
                error: e.to_string(),
            });
            summary.had_errors = true;
        }
        events.emit(CrawlEvent::RunFinished(summary.clone()));
        summary
    }

    /// Every results page of every query, `rounds` times over. A page with
    /// no cards ends that query for the round.
    async fn collect_listings(&self, events: &dyn EventSink) -> Vec<JobRecord> {
        let config = self.config;
        let mut all = Vec::new();
        for _ in 0..config.rounds {
            for query in &config.search_queries {
                for page in 0..config.pages_to_scrape {
                    let url = search_url(
                        &query.keywords,
                        &query.location,
                        &query.workplace_type,
                        &config.timespan,
                        page,
                    );
                    let doc = self.fetcher.fetch(&url, events).await;
                    let jobs = extract_listing(doc.as_ref(), &config.role, Some(&query.location), events);
                    events.emit(CrawlEvent::PageScraped {
                        url,
                        jobs: jobs.len(),
                    });

                    let exhausted = jobs.is_empty();
                    all.extend(jobs);
                    tokio::time::sleep(config.delay_between_requests).await;
                    if exhausted {
                        break;
                    }
                }
            }
        }
        all
    }

    /// Writes are independent per collection; a failure is reported and
    /// the other collection is still written.
    async fn persist(&self, collection: &str, jobs: &[JobRecord], events: &dyn EventSink) {
        if jobs.is_empty() {
            return;
        }
        match self.store.insert_jobs(collection, jobs).await {
            Ok(count) => events.emit(CrawlEvent::JobsStored {
                collection: collection.to_string(),
                count,
            }),
            Err(e) => events.emit(CrawlEvent::StoreWriteFailed {
                collection: collection.to_string(),
                error: e.to_string(),
            }),
        }
    }
}

fn stage(events: &dyn EventSink, stage: &'static str, remaining: usize) {
    events.emit(CrawlEvent::StageFinished { stage, remaining });
}
