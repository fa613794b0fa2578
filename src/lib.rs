//! Scrape-and-normalize pipeline behind the brand reputation dashboard.
//!
//! Harvests products, testimonials and reviews from a paginated HTML listing
//! site into one CSV table per kind, and provides the monthly review summary
//! the dashboard reads from the sentiment-enriched review table.

pub mod config;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod normalizer;
pub mod paginator;
pub mod parser;
pub mod pipeline;
pub mod report;
pub mod table;
pub mod traits;

pub use config::Config;
pub use error::{ConfigError, FetchError, ParseError, PipelineError, TableError};
pub use fetcher::HttpFetcher;
pub use models::{EntityKind, MonthBucket, PageRangePolicy};
pub use paginator::{Collected, Paginator, StopReason};
pub use parser::{MalformedPolicy, PageParser};
pub use pipeline::{KindOutcome, KindReport, Pipeline, RunSummary};
pub use table::{TableReader, TableWriter};
pub use traits::PageFetcher;
