//! The crawl pipeline, one module per stage.
//!
//! fetcher -> listing -> dedup -> filter (coarse) -> novelty -> enricher
//! (detail pages) -> filter (final) -> store. `runner` wires them together.

pub mod dedup;
pub mod detail;
pub mod enricher;
pub mod fetcher;
pub mod filter;
pub mod listing;
pub mod novelty;
pub mod retry;
pub mod runner;
