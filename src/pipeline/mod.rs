//! Pipeline orchestration
//!
//! # Components
//!
//! - `coordinator`: run creation, bounded-concurrency entity scheduling and run status
//! - `processor`: the search → rank → crawl → extract → store steps for one company
//! - `ranker`: URL relevance scoring
//! - `debug`: the same steps for one company without storage

mod coordinator;
mod debug;
mod processor;
pub mod ranker;
mod stages;

pub use coordinator::{Coordinator, RunOutcome};
pub use debug::{CategoryReport, CrawlReport, DebugReport, ExtractionReport};
pub use stages::{assets_query, leadership_query, PAGE_SEPARATOR};
