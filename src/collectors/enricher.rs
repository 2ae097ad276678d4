use chrono::{NaiveDateTime, NaiveTime, TimeDelta};

use crate::collectors::detail::extract_details;
use crate::collectors::fetcher::PageFetcher;
use crate::collectors::filter::RelevanceFilter;
use crate::config::CrawlConfig;
use crate::events::{CrawlEvent, EventSink};
use crate::models::job::JobRecord;

/// Fetch the detail page of each job, one at a time.
///
/// Jobs with an unparseable date, or posted before `now - days_to_scrape`,
/// are dropped without a request.
pub async fn enrich_jobs(
    jobs: Vec<JobRecord>,
    config: &CrawlConfig,
    filter: &RelevanceFilter,
    fetcher: &dyn PageFetcher,
    now: NaiveDateTime,
    events: &dyn EventSink,
) -> Vec<JobRecord> {
    let cutoff = TimeDelta::try_days(config.days_to_scrape)
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(NaiveDateTime::MIN);

    let mut enriched = Vec::with_capacity(jobs.len());
    for job in jobs {
        let posted_at = match job.posted_on() {
            Ok(date) => date.and_time(NaiveTime::MIN),
            Err(_) => {
                events.emit(CrawlEvent::InvalidDate {
                    title: job.title,
                    date: job.posted_date,
                });
                continue;
            }
        };
        if posted_at < cutoff {
            events.emit(CrawlEvent::TooOld {
                title: job.title,
                date: job.posted_date,
            });
            continue;
        }

        events.emit(CrawlEvent::NewJob {
            title: job.title.clone(),
            company: job.company.clone(),
            url: job.source_url.clone(),
        });
        let page = fetcher.fetch(&job.source_url, events).await;
        let details = extract_details(page.as_ref());
        let job = job.with_details(details.description, details.applicant_count);

        if let Some(reason) = filter.language_rejection(&job.description) {
            events.emit(CrawlEvent::LanguageNotAccepted {
                url: job.source_url.clone(),
                reason,
            });
        }
        enriched.push(job);

        tokio::time::sleep(config.delay_between_requests).await;
    }
    enriched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::detail::tests::{detail_page, rich_description};
    use crate::collectors::runner::tests::FakeFetcher;
    use crate::events::CollectingEventSink;
    use crate::models::job::DESCRIPTION_NOT_FOUND;
    use crate::models::job::tests::job;
    use chrono::NaiveDate;

    fn jan_20() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 20)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    fn setup() -> (CrawlConfig, RelevanceFilter) {
        let config = CrawlConfig::for_tests();
        let filter = RelevanceFilter::new(&config).unwrap();
        (config, filter)
    }

    #[tokio::test]
    async fn test_fills_description_and_applicants() {
        let (config, filter) = setup();
        let fetcher = FakeFetcher::default().page(
            "https://x/1/",
            detail_page(&format!(
                "{}<figcaption class=\"num-applicants__caption\">37 applicants</figcaption>",
                rich_description("<p>Own the CI pipelines.</p>")
            )),
        );
        let events = CollectingEventSink::default();

        let out = enrich_jobs(
            vec![job("SRE", "Acme", "2024-01-18", "https://x/1/")],
            &config,
            &filter,
            &fetcher,
            jan_20(),
            &events,
        )
        .await;

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].description, "Own the CI pipelines.");
        assert_eq!(out[0].applicant_count, Some(37));
        assert_eq!(events.count("detail.new_job"), 1);
    }

    #[tokio::test]
    async fn test_window_boundary_is_midnight_of_posting_day() {
        let (config, filter) = setup();
        let fetcher = FakeFetcher::default();
        let events = CollectingEventSink::default();
        // 10 days before 2024-01-20 09:30 is 2024-01-10 09:30; midnight of the 10th is older.
        let jobs = vec![
            job("Old", "Acme", "2024-01-10", "https://x/old/"),
            job("Fresh", "Acme", "2024-01-11", "https://x/fresh/"),
        ];

        let out = enrich_jobs(jobs, &config, &filter, &fetcher, jan_20(), &events).await;

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "Fresh");
        assert_eq!(out[0].description, DESCRIPTION_NOT_FOUND);
        assert_eq!(events.count("detail.too_old"), 1);
        assert_eq!(fetcher.requested(), vec!["https://x/fresh/".to_string()]);
    }

    #[tokio::test]
    async fn test_unparseable_date_skips_job_with_error_event() {
        let (config, filter) = setup();
        let fetcher = FakeFetcher::default();
        let events = CollectingEventSink::default();

        let out = enrich_jobs(
            vec![job("SRE", "Acme", "", "https://x/1/")],
            &config,
            &filter,
            &fetcher,
            jan_20(),
            &events,
        )
        .await;

        assert!(out.is_empty());
        assert!(fetcher.requested().is_empty());
        assert_eq!(events.count("detail.invalid_date"), 1);
    }

    #[tokio::test]
    async fn test_reports_unaccepted_language() {
        let mut config = CrawlConfig::for_tests();
        config.languages = vec!["ja".into()];
        let filter = RelevanceFilter::new(&config).unwrap();
        let fetcher = FakeFetcher::default();
        let events = CollectingEventSink::default();

        let out = enrich_jobs(
            vec![job("SRE", "Acme", "2024-01-19", "https://x/1/")],
            &config,
            &filter,
            &fetcher,
            jan_20(),
            &events,
        )
        .await;

        assert_eq!(out.len(), 1);
        assert_eq!(events.count("detail.language"), 1);
    }
}
