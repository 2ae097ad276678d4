pub mod crawl_run;
pub mod job;
