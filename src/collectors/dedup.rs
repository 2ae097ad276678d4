use crate::models::job::JobRecord;

/// Keep one job per (title, company).
///
/// Jobs are sorted by that key and the first of each run survives. Which
/// duplicate is kept carries no meaning; callers must not rely on it.
pub fn remove_duplicates(mut jobs: Vec<JobRecord>) -> Vec<JobRecord> {
    jobs.sort_by(|a, b| a.dedup_key().cmp(&b.dedup_key()));
    jobs.dedup_by(|a, b| a.dedup_key() == b.dedup_key());
    jobs
}
