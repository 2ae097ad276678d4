//! Search-results page extraction.
//!
//! The markup is an unversioned third-party contract. Anything missing
//! degrades to an empty result or a default field value.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::collectors::fetcher::Document;
use crate::events::{CrawlEvent, EventSink};
use crate::models::job::JobRecord;

/// Detail page address for a posting id.
pub const JOB_VIEW_URL: &str = "https://www.linkedin.com/jobs/view/";

const SEARCH_URL: &str = "https://www.linkedin.com/jobs-guest/jobs/api/seeMoreJobPostings/search";

/// Cards per results page.
pub const PAGE_SIZE: u32 = 25;

static CARD: LazyLock<Selector> = LazyLock::new(|| parse("div.base-search-card__info"));
static TITLE: LazyLock<Selector> = LazyLock::new(|| parse("h3"));
static COMPANY: LazyLock<Selector> = LazyLock::new(|| parse("a.hidden-nested-link"));
static LOCATION: LazyLock<Selector> = LazyLock::new(|| parse("span.job-search-card__location"));
static DATE_NEW: LazyLock<Selector> =
    LazyLock::new(|| parse("time.job-search-card__listdate--new"));
static DATE_CLASSIC: LazyLock<Selector> = LazyLock::new(|| parse("time.job-search-card__listdate"));

pub(crate) fn parse(css: &'static str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid static selector {css}: {e}"))
}

/// Search URL for one results page of a query.
pub fn search_url(keywords: &str, location: &str, workplace_type: &str, timespan: &str, page: u32) -> String {
    use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};

    const QUERY_SET: &percent_encoding::AsciiSet = &NON_ALPHANUMERIC
        .remove(b'-')
        .remove(b'_')
        .remove(b'.')
        .remove(b'~')
        .remove(b'/');

    format!(
        "{SEARCH_URL}?keywords={}&location={}&f_TPR=&f_WT={workplace_type}&geoId=&f_TPR={timespan}&start={}",
        utf8_percent_encode(keywords, QUERY_SET),
        utf8_percent_encode(location, QUERY_SET),
        PAGE_SIZE * page
    )
}

/// Partial records for every well-formed card on a results page.
/// An absent document or a page without cards yields nothing.
pub fn extract_listing(
    doc: Option<&Document>,
    role: &str,
    search_location: Option<&str>,
    events: &dyn EventSink,
) -> Vec<JobRecord> {
    let Some(doc) = doc else {
        return Vec::new();
    };
    let html = Html::parse_document(&doc.html);

    let mut jobs = Vec::new();
    for card in html.select(&CARD) {
        match parse_card(card, role, search_location) {
            Ok(job) => jobs.push(job),
            Err(reason) => events.emit(CrawlEvent::CardSkipped { reason }),
        }
    }
    jobs
}

fn parse_card(
    card: ElementRef<'_>,
    role: &str,
    search_location: Option<&str>,
) -> Result<JobRecord, &'static str> {
    let title = first_text(card, &TITLE).ok_or("missing title")?;

    let posting_id = card
        .parent()
        .and_then(ElementRef::wrap)
        .and_then(|parent| parent.value().attr("data-entity-urn"))
        .and_then(|urn| urn.rsplit(':').next())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or("missing posting id")?;

    let company = first_text(card, &COMPANY)
        .map(|c| c.replace('\n', " "))
        .unwrap_or_default();
    let location = first_text(card, &LOCATION).unwrap_or_default();

    let posted_date = datetime_attr(card, &DATE_NEW)
        .or_else(|| datetime_attr(card, &DATE_CLASSIC))
        .unwrap_or_default();

    Ok(JobRecord::listed(
        title,
        company,
        location,
        posted_date,
        format!("{JOB_VIEW_URL}{posting_id}/"),
        role,
        search_location,
    ))
}

/// Trimmed text of the first match, if it has any.
fn first_text(el: ElementRef<'_>, selector: &Selector) -> Option<String> {
    el.select(selector)
        .next()
        .map(|found| found.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
}

fn datetime_attr(el: ElementRef<'_>, selector: &Selector) -> Option<String> {
    el.select(selector)
        .next()
        .and_then(|found| found.value().attr("datetime"))
        .map(|d| d.trim().to_string())
}
