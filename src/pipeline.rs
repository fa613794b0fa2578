use std::path::PathBuf;
use std::time::Duration;

use tracing::{error, info};

use crate::config::Config;
use crate::error::{PipelineError, TableError};
use crate::fetcher::HttpFetcher;
use crate::models::EntityKind;
use crate::normalizer;
use crate::paginator::{Paginator, StopReason};
use crate::parser::PageParser;
use crate::table::TableWriter;
use crate::traits::PageFetcher;

/// A table written for one entity kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindReport {
    pub path: PathBuf,
    pub rows: usize,
    /// How the listing ended; partial listings are still written
    pub stop: StopReason,
}

/// What happened to one entity kind during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KindOutcome {
    Written(KindReport),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Artifacts were already present and nothing was fetched
    pub skipped: bool,
    pub outcomes: Vec<(EntityKind, KindOutcome)>,
}

impl RunSummary {
    #[must_use]
    pub fn outcome(&self, kind: EntityKind) -> Option<&KindOutcome> {
        self.outcomes
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, outcome)| outcome)
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.outcomes
            .iter()
            .any(|(_, outcome)| matches!(outcome, KindOutcome::Failed(_)))
    }
}

/// Scrapes every listing and writes one table per entity kind.
///
/// Kinds are processed one after another and in isolation: a kind whose
/// table cannot be written is reported as failed without touching the others.
pub struct Pipeline<F: PageFetcher> {
    fetcher: F,
    parser: PageParser,
    writer: TableWriter,
    product_pages: u32,
    max_pages: u32,
    page_delay: Duration,
}

impl Pipeline<HttpFetcher> {
    /// Pipeline talking to the configured site over HTTP.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError` if the HTTP client or the selectors cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        let fetcher = HttpFetcher::new(config).map_err(PipelineError::Client)?;
        Self::new(fetcher, config)
    }
}

impl<F: PageFetcher> Pipeline<F> {
    /// # Errors
    ///
    /// Returns `PipelineError` if a selector cannot be compiled.
    pub fn new(fetcher: F, config: &Config) -> Result<Self, PipelineError> {
        Ok(Self {
            fetcher,
            parser: PageParser::new(config.malformed)?,
            writer: TableWriter::new(&config.output_dir),
            product_pages: config.product_pages,
            max_pages: config.max_pages,
            page_delay: config.page_delay,
        })
    }

    #[must_use]
    pub const fn writer(&self) -> &TableWriter {
        &self.writer
    }

    /// Runs the pipeline unless every table already exists.
    ///
    /// Existing tables are reused as they are; pass `force` to scrape anyway.
    pub async fn ensure_artifacts(&self, force: bool) -> RunSummary {
        if !force && self.writer.all_present() {
            info!(
                "All tables present in {}, skipping scrape",
                self.writer.dir().display()
            );
            return RunSummary {
                skipped: true,
                outcomes: Vec::new(),
            };
        }

        self.run().await
    }

    /// Scrapes and writes every kind unconditionally.
    pub async fn run(&self) -> RunSummary {
        let mut outcomes = Vec::with_capacity(EntityKind::ALL.len());

        for kind in EntityKind::ALL {
            let outcome = match self.run_kind(kind).await {
                Ok(report) => KindOutcome::Written(report),
                Err(e) => {
                    error!("Failed to write {} table: {}", kind, e);
                    KindOutcome::Failed(e.to_string())
                }
            };
            outcomes.push((kind, outcome));
        }

        let written = outcomes
            .iter()
            .filter(|(_, o)| matches!(o, KindOutcome::Written(_)))
            .count();
        info!("Scrape finished: {} of {} tables written", written, outcomes.len());

        RunSummary {
            skipped: false,
            outcomes,
        }
    }

    /// Scrapes one kind and overwrites its table with whatever was collected,
    /// including partial results from a listing cut short by a failed fetch.
    ///
    /// # Errors
    ///
    /// Returns `TableError` if the table cannot be written.
    pub async fn run_kind(&self, kind: EntityKind) -> Result<KindReport, TableError> {
        info!("Scraping {} listing", kind);

        let collected = Paginator::new(&self.fetcher, &self.parser, self.max_pages)
            .with_delay(self.page_delay)
            .collect(kind, kind.default_policy(self.product_pages))
            .await;
        let stop = collected.stop.clone();

        let (path, rows) = match kind {
            EntityKind::Product => {
                let products = collected.into_products();
                (self.writer.write_products(&products)?, products.len())
            }
            EntityKind::Testimonial => {
                let testimonials = collected.into_testimonials();
                (self.writer.write_testimonials(&testimonials)?, testimonials.len())
            }
            EntityKind::Review => {
                let reviews = normalizer::normalize(collected.into_reviews());
                (self.writer.write_reviews(&reviews)?, reviews.len())
            }
        };

        Ok(KindReport { path, rows, stop })
    }
}
