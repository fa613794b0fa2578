//! Traits and selector configuration shared by the fetch and parse stages

use async_trait::async_trait;

use crate::error::FetchError;

/// CSS selectors describing one kind of listing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindSelectors {
    /// Selector for the repeated element wrapping a single entry
    pub container: &'static str,
    /// Named sub-fields, each selected relative to the container
    pub fields: &'static [(&'static str, &'static str)],
    /// Fields that must be present and non-empty for the entry to count
    pub required: &'static [&'static str],
}

impl KindSelectors {
    /// Whether `field` must be present for an entry to be kept.
    #[must_use]
    pub fn is_required(&self, field: &str) -> bool {
        self.required.contains(&field)
    }
}

/// Source of raw listing markup.
///
/// Implementations issue exactly one request per call and never retry; the
/// paginator decides what a failure means.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the markup behind a site-relative path
    ///
    /// # Arguments
    /// * `path` - Path on the source site, including any query string
    ///
    /// # Returns
    /// * `Result<String, FetchError>` - Response body, or the reason it could not be fetched
    async fn fetch(&self, path: &str) -> Result<String, FetchError>;
}
