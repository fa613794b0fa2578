//! CSV persistence for the harvested tables.
//!
//! One UTF-8 file per entity kind, header row always present (even for an
//! empty table). Each write replaces the previous file in full: rows go to a
//! uniquely named temporary file in the same directory which is then
//! persisted over the target.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::TableError;
use crate::models::{
    DATE_FORMAT, EntityKind, ProductRecord, Review, SentimentReview, TestimonialRecord,
};

/// File name of the sentiment-enriched review table.
pub const SENTIMENT_ARTIFACT: &str = "reviews_with_sentiment.csv";

/// On-disk shape of a review row.
#[derive(Debug, Serialize, Deserialize)]
struct ReviewRow {
    date: String,
    text: String,
}

/// On-disk shape of an enriched review row. Dates and star counts are kept
/// loose because enrichment exports rewrite them (pandas turns an integer
/// column with gaps into floats like `5.0`).
#[derive(Debug, Deserialize)]
struct SentimentRow {
    date: String,
    text: String,
    #[serde(default)]
    stars: Option<f64>,
    sentiment: String,
    confidence: f64,
}

impl SentimentRow {
    /// `None` when the date cannot be read; such rows are dropped.
    fn into_review(self) -> Option<SentimentReview> {
        let Some(date) = crate::normalizer::parse_date(&self.date) else {
            debug!("Dropping enriched review with unparseable date {:?}", self.date);
            return None;
        };

        Some(SentimentReview {
            date,
            text: self.text,
            stars: self.stars.and_then(star_count),
            sentiment: self.sentiment,
            confidence: self.confidence,
        })
    }
}

/// Whole star count from a possibly float-typed cell.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn star_count(raw: f64) -> Option<u8> {
    let rounded = raw.round();
    (raw.is_finite() && (0.0..=f64::from(u8::MAX)).contains(&rounded)).then(|| rounded as u8)
}

impl From<&Review> for ReviewRow {
    fn from(review: &Review) -> Self {
        Self {
            date: review.date.format(DATE_FORMAT).to_string(),
            text: review.text.clone(),
        }
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> TableError + '_ {
    move |source| TableError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn csv_err(path: &Path) -> impl FnOnce(csv::Error) -> TableError + '_ {
    move |source| TableError::Csv {
        path: path.to_path_buf(),
        source,
    }
}

/// Writes the per-kind tables into one directory.
#[derive(Debug, Clone)]
pub struct TableWriter {
    dir: PathBuf,
}

impl TableWriter {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Location of the table for `kind`.
    #[must_use]
    pub fn artifact_path(&self, kind: EntityKind) -> PathBuf {
        self.dir.join(kind.artifact_name())
    }

    /// Whether every kind already has a table on disk.
    #[must_use]
    pub fn all_present(&self) -> bool {
        EntityKind::ALL
            .iter()
            .all(|kind| self.artifact_path(*kind).is_file())
    }

    /// # Errors
    ///
    /// Returns `TableError` if the directory or file cannot be written.
    pub fn write_products(&self, products: &[ProductRecord]) -> Result<PathBuf, TableError> {
        self.write_rows(EntityKind::Product, products)
    }

    /// # Errors
    ///
    /// Returns `TableError` if the directory or file cannot be written.
    pub fn write_testimonials(
        &self,
        testimonials: &[TestimonialRecord],
    ) -> Result<PathBuf, TableError> {
        self.write_rows(EntityKind::Testimonial, testimonials)
    }

    /// Writes normalized reviews with their timestamp in [`DATE_FORMAT`].
    ///
    /// # Errors
    ///
    /// Returns `TableError` if the directory or file cannot be written.
    pub fn write_reviews(&self, reviews: &[Review]) -> Result<PathBuf, TableError> {
        let rows: Vec<ReviewRow> = reviews.iter().map(ReviewRow::from).collect();
        self.write_rows(EntityKind::Review, &rows)
    }

    fn write_rows<T: Serialize>(&self, kind: EntityKind, rows: &[T]) -> Result<PathBuf, TableError> {
        fs::create_dir_all(&self.dir).map_err(io_err(&self.dir))?;

        let target = self.artifact_path(kind);
        let mut staging = NamedTempFile::new_in(&self.dir).map_err(io_err(&self.dir))?;

        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(staging.as_file_mut());

            writer
                .write_record(kind.columns())
                .map_err(csv_err(&target))?;
            for row in rows {
                writer.serialize(row).map_err(csv_err(&target))?;
            }
            writer.flush().map_err(io_err(&target))?;
        }

        staging
            .persist(&target)
            .map_err(|e| io_err(&target)(e.error))?;

        info!("Wrote {} {} rows to {}", rows.len(), kind, target.display());
        Ok(target)
    }
}

/// Reads the tables back for downstream consumers.
#[derive(Debug, Clone)]
pub struct TableReader {
    dir: PathBuf,
}

impl TableReader {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// # Errors
    ///
    /// Returns `TableError` if the file is missing, malformed, or has unexpected columns.
    pub fn read_products(&self) -> Result<Vec<ProductRecord>, TableError> {
        self.read_kind(EntityKind::Product)
    }

    /// # Errors
    ///
    /// Returns `TableError` if the file is missing, malformed, or has unexpected columns.
    pub fn read_testimonials(&self) -> Result<Vec<TestimonialRecord>, TableError> {
        self.read_kind(EntityKind::Testimonial)
    }

    /// Reads the normalized review table. Rows with unreadable dates are
    /// dropped the same way the normalizer drops them.
    ///
    /// # Errors
    ///
    /// Returns `TableError` if the file is missing, malformed, or has unexpected columns.
    pub fn read_reviews(&self) -> Result<Vec<Review>, TableError> {
        let rows: Vec<ReviewRow> = self.read_kind(EntityKind::Review)?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                crate::normalizer::parse_date(&row.date).map(|date| Review::new(date, row.text))
            })
            .collect())
    }

    /// Reads the sentiment-enriched review table. Rows with unreadable dates
    /// are dropped rather than failing the whole table.
    ///
    /// # Errors
    ///
    /// Returns `TableError` if the file is missing or a row cannot be decoded.
    pub fn read_sentiment_reviews(&self) -> Result<Vec<SentimentReview>, TableError> {
        let path = self.dir.join(SENTIMENT_ARTIFACT);
        let rows: Vec<SentimentRow> = read_csv(&path)?;
        let total = rows.len();

        let reviews: Vec<SentimentReview> =
            rows.into_iter().filter_map(SentimentRow::into_review).collect();
        if reviews.len() < total {
            info!(
                "Dropped {} of {} enriched reviews with unparseable dates",
                total - reviews.len(),
                total
            );
        }
        Ok(reviews)
    }

    fn read_kind<T: DeserializeOwned>(&self, kind: EntityKind) -> Result<Vec<T>, TableError> {
        let path = self.dir.join(kind.artifact_name());
        let mut reader = csv::Reader::from_path(&path).map_err(csv_err(&path))?;

        let found: Vec<String> = reader
            .headers()
            .map_err(csv_err(&path))?
            .iter()
            .map(str::to_string)
            .collect();
        let expected: Vec<String> = kind.columns().iter().map(|c| (*c).to_string()).collect();
        if found != expected {
            return Err(TableError::Header {
                path,
                expected,
                found,
            });
        }

        reader
            .deserialize()
            .collect::<Result<Vec<T>, _>>()
            .map_err(csv_err(&path))
    }
}

fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, TableError> {
    csv::Reader::from_path(path)
        .map_err(csv_err(path))?
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(csv_err(path))
}
