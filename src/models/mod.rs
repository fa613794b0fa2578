//! Data models for scraped listings, normalized reviews and the tables built from them

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::traits::KindSelectors;

/// Timestamp format used for the `date` column of persisted review tables.
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// The three kinds of listing harvested from the source site.
///
/// Each variant carries everything the pipeline needs to process it as data:
/// where it lives on the site, how its markup is laid out, how many pages to
/// walk, and which artifact it ends up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Product,
    Testimonial,
    Review,
}

impl EntityKind {
    /// All kinds in the order the pipeline processes them.
    pub const ALL: [Self; 3] = [Self::Product, Self::Testimonial, Self::Review];

    /// File name of the persisted table for this kind.
    #[must_use]
    pub const fn artifact_name(self) -> &'static str {
        match self {
            Self::Product => "products.csv",
            Self::Testimonial => "testimonials.csv",
            Self::Review => "reviews.csv",
        }
    }

    /// Path template on the source site with a `{page}` placeholder.
    #[must_use]
    pub const fn path_template(self) -> &'static str {
        match self {
            Self::Product => "/products?page={page}",
            Self::Testimonial => "/api/testimonials?page={page}",
            Self::Review => "/reviews?page={page}",
        }
    }

    /// Relative path for one page of this kind's listing.
    #[must_use]
    pub fn page_path(self, page: u32) -> String {
        self.path_template().replace("{page}", &page.to_string())
    }

    /// Structural selectors for this kind's listing markup.
    #[must_use]
    pub const fn selectors(self) -> KindSelectors {
        match self {
            Self::Product => KindSelectors {
                container: "div.product",
                fields: &[("name", "h3 a"), ("description", "div.short-description")],
                required: &["name"],
            },
            Self::Testimonial => KindSelectors {
                container: "div.testimonial",
                fields: &[("content", "p.text")],
                required: &["content"],
            },
            Self::Review => KindSelectors {
                container: "div.review",
                fields: &[("date", "span"), ("text", "p")],
                required: &["date", "text"],
            },
        }
    }

    /// Default page range policy. Products have a known page count; the
    /// others are walked until an empty page shows up.
    #[must_use]
    pub const fn default_policy(self, product_pages: u32) -> PageRangePolicy {
        match self {
            Self::Product => PageRangePolicy::Fixed(product_pages),
            Self::Testimonial | Self::Review => PageRangePolicy::UntilEmpty,
        }
    }

    /// Column header of the persisted table.
    #[must_use]
    pub const fn columns(self) -> &'static [&'static str] {
        match self {
            Self::Product => &["name", "description"],
            Self::Testimonial => &["content"],
            Self::Review => &["date", "text"],
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Product => "product",
            Self::Testimonial => "testimonial",
            Self::Review => "review",
        };
        f.write_str(name)
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "product" | "products" => Ok(Self::Product),
            "testimonial" | "testimonials" => Ok(Self::Testimonial),
            "review" | "reviews" => Ok(Self::Review),
            other => Err(format!("unknown entity kind: {other}")),
        }
    }
}

/// How many pages of a listing to walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRangePolicy {
    /// Pages `1..=n`, stopping early on an empty page or a failed fetch.
    Fixed(u32),
    /// Keep going until a page comes back empty or a fetch fails.
    UntilEmpty,
}

/// A product listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub name: String,
    pub description: String,
}

/// A customer testimonial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestimonialRecord {
    pub content: String,
}

/// A review as it appears on the page, date still in the site's own format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReview {
    pub date_text: String,
    pub text: String,
}

/// A review whose date has been parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    pub date: NaiveDateTime,
    pub text: String,
    pub month: MonthBucket,
}

impl Review {
    /// Builds a review, deriving the month bucket from `date`.
    #[must_use]
    pub fn new(date: NaiveDateTime, text: String) -> Self {
        Self {
            month: MonthBucket::of(&date),
            date,
            text,
        }
    }
}

/// One record extracted from a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawRecord {
    Product(ProductRecord),
    Testimonial(TestimonialRecord),
    Review(RawReview),
}

/// Records extracted from a single page. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResult {
    pub kind: EntityKind,
    pub page: u32,
    pub records: Vec<RawRecord>,
}

impl PageResult {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Calendar month a review falls in.
///
/// Ordering is chronological (year first, then month).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonthBucket {
    pub year: i32,
    pub month: u32,
}

impl MonthBucket {
    /// Bucket containing the given timestamp.
    #[must_use]
    pub fn of(date: &NaiveDateTime) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Long form label, e.g. `July 2022`.
    #[must_use]
    pub fn label(&self) -> String {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .map_or_else(|| self.to_string(), |d| d.format("%B %Y").to_string())
    }

    /// Whether `date` falls inside this month.
    #[must_use]
    pub fn contains(&self, date: &NaiveDateTime) -> bool {
        Self::of(date) == *self
    }
}

impl fmt::Display for MonthBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthBucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| format!("expected YYYY-MM, got {s:?}"))?;
        let year: i32 = year
            .parse()
            .map_err(|_| format!("invalid year in {s:?}"))?;
        let month: u32 = month
            .parse()
            .map_err(|_| format!("invalid month in {s:?}"))?;
        if !(1..=12).contains(&month) {
            return Err(format!("month out of range in {s:?}"));
        }
        Ok(Self { year, month })
    }
}

/// A review from the sentiment-enriched review table.
///
/// The enrichment step runs a pretrained classifier over `reviews.csv` and
/// appends `sentiment` and `confidence`; some exports also carry a star count.
#[derive(Debug, Clone, PartialEq)]
pub struct SentimentReview {
    pub date: NaiveDateTime,
    pub text: String,
    pub stars: Option<u8>,
    pub sentiment: String,
    pub confidence: f64,
}

impl SentimentReview {
    #[must_use]
    pub fn month(&self) -> MonthBucket {
        MonthBucket::of(&self.date)
    }
}
