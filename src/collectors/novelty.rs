use std::collections::HashSet;

use crate::error::AppError;
use crate::events::{CrawlEvent, EventSink};
use crate::models::job::{JobIdentity, JobRecord};
use crate::store::JobStore;

/// Keep only candidates that match no job already stored in any of
/// `collections`.
///
/// When the store cannot be reached, candidates are compared only against
/// what was read before the failure (nothing, if the first read failed).
/// Any other read failure counts every candidate as already seen, so a
/// broken store never causes duplicate writes.
pub async fn find_new_jobs(
    candidates: Vec<JobRecord>,
    store: &dyn JobStore,
    collections: &[&str],
    events: &dyn EventSink,
) -> Vec<JobRecord> {
    let mut existing = Vec::new();
    for collection in collections {
        match store.existing_jobs(collection).await {
            Ok(jobs) => existing.extend(jobs),
            Err(AppError::StoreUnavailable(error)) => {
                events.emit(CrawlEvent::StoreReadFailed {
                    collection: collection.to_string(),
                    error,
                    fail_open: true,
                });
                break;
            }
            Err(e) => {
                events.emit(CrawlEvent::StoreReadFailed {
                    collection: collection.to_string(),
                    error: e.to_string(),
                    fail_open: false,
                });
                return Vec::new();
            }
        }
    }

    let seen = SeenJobs::new(&existing);
    candidates
        .into_iter()
        .filter(|job| !seen.contains(job))
        .collect()
}

/// Identity index over stored jobs. A job is already stored when its URL
/// matches, or its title, company and date all match.
struct SeenJobs<'a> {
    urls: HashSet<&'a str>,
    keys: HashSet<(&'a str, &'a str, &'a str)>,
}

impl<'a> SeenJobs<'a> {
    fn new(existing: &'a [JobIdentity]) -> Self {
        Self {
            urls: existing.iter().map(|e| e.job_url.as_str()).collect(),
            keys: existing
                .iter()
                .map(|e| (e.title.as_str(), e.company.as_str(), e.date.as_str()))
                .collect(),
        }
    }

    fn contains(&self, job: &JobRecord) -> bool {
        self.urls.contains(job.source_url.as_str())
            || self.keys.contains(&(
                job.title.as_str(),
                job.company.as_str(),
                job.posted_date.as_str(),
            ))
    }
}
