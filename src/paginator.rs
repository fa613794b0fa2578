//! Sequential page walker.
//!
//! Drives a [`PageFetcher`] and a [`PageParser`] across a listing starting at
//! page 1. Pages are requested one at a time, in order: for open-ended
//! listings page N is only known to exist once page N-1 came back non-empty.

use std::fmt;
use std::time::Duration;

use tracing::{info, warn};

use crate::models::{
    EntityKind, PageRangePolicy, ProductRecord, RawRecord, RawReview, TestimonialRecord,
};
use crate::parser::PageParser;
use crate::traits::PageFetcher;

/// Why a pagination run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// A page held no entries. The normal end of a listing.
    EmptyPage(u32),
    /// The fixed page count was exhausted.
    PageLimit(u32),
    /// The open-ended safety cap was hit.
    SafetyCap(u32),
    /// A fetch failed; everything before it is kept.
    FetchFailed { page: u32, reason: String },
    /// A page was rejected by the parser's malformed-entry policy.
    ParseFailed { page: u32, reason: String },
}

impl StopReason {
    /// Whether the listing ended on its own rather than through an error.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        matches!(
            self,
            Self::EmptyPage(_) | Self::PageLimit(_) | Self::SafetyCap(_)
        )
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPage(page) => write!(f, "page {page} was empty"),
            Self::PageLimit(pages) => write!(f, "fixed page count of {pages} reached"),
            Self::SafetyCap(pages) => write!(f, "safety cap of {pages} pages reached"),
            Self::FetchFailed { page, reason } => write!(f, "page {page} failed: {reason}"),
            Self::ParseFailed { page, reason } => write!(f, "page {page} rejected: {reason}"),
        }
    }
}

/// Records accumulated by one pagination run, in page then container order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collected {
    pub kind: EntityKind,
    pub records: Vec<RawRecord>,
    /// Non-empty pages whose records were appended
    pub pages_fetched: u32,
    pub stop: StopReason,
}

impl Collected {
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn into_products(self) -> Vec<ProductRecord> {
        self.records
            .into_iter()
            .filter_map(|record| match record {
                RawRecord::Product(product) => Some(product),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn into_testimonials(self) -> Vec<TestimonialRecord> {
        self.records
            .into_iter()
            .filter_map(|record| match record {
                RawRecord::Testimonial(testimonial) => Some(testimonial),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn into_reviews(self) -> Vec<RawReview> {
        self.records
            .into_iter()
            .filter_map(|record| match record {
                RawRecord::Review(review) => Some(review),
                _ => None,
            })
            .collect()
    }
}

pub struct Paginator<'a, F: PageFetcher + ?Sized> {
    fetcher: &'a F,
    parser: &'a PageParser,
    /// Upper bound for [`PageRangePolicy::UntilEmpty`]
    max_pages: u32,
    delay: Duration,
}

impl<'a, F: PageFetcher + ?Sized> Paginator<'a, F> {
    #[must_use]
    pub const fn new(fetcher: &'a F, parser: &'a PageParser, max_pages: u32) -> Self {
        Self {
            fetcher,
            parser,
            max_pages,
            delay: Duration::ZERO,
        }
    }

    /// Pause between consecutive page requests.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Walks the listing of `kind` from page 1 under `policy`.
    ///
    /// Never fails: a fetch failure ends the run and the records gathered so
    /// far are returned with the failure recorded in [`Collected::stop`].
    pub async fn collect(&self, kind: EntityKind, policy: PageRangePolicy) -> Collected {
        let last_page = match policy {
            PageRangePolicy::Fixed(pages) => pages,
            PageRangePolicy::UntilEmpty => self.max_pages,
        };

        let mut records = Vec::new();
        let mut pages_fetched = 0;
        let mut page = 1;

        let stop = loop {
            if page > last_page {
                break match policy {
                    PageRangePolicy::Fixed(pages) => StopReason::PageLimit(pages),
                    PageRangePolicy::UntilEmpty => {
                        warn!(
                            "Reached maximum page limit ({}) for {} listing",
                            self.max_pages, kind
                        );
                        StopReason::SafetyCap(self.max_pages)
                    }
                };
            }

            if page > 1 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            info!("Fetching {} page {}", kind, page);

            let markup = match self.fetcher.fetch(&kind.page_path(page)).await {
                Ok(markup) => markup,
                Err(e) => {
                    warn!("Stopping {} pagination at page {}: {}", kind, page, e);
                    break StopReason::FetchFailed {
                        page,
                        reason: e.to_string(),
                    };
                }
            };

            let parsed = match self.parser.parse_page(&markup, kind, page) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!("Stopping {} pagination at page {}: {}", kind, page, e);
                    break StopReason::ParseFailed {
                        page,
                        reason: e.to_string(),
                    };
                }
            };

            if parsed.is_empty() {
                info!("No {} entries on page {}, listing exhausted", kind, page);
                break StopReason::EmptyPage(page);
            }

            records.extend(parsed.records);
            pages_fetched += 1;
            page += 1;
        };

        info!(
            "Collected {} {} records from {} pages ({})",
            records.len(),
            kind,
            pages_fetched,
            stop
        );

        Collected {
            kind,
            records,
            pages_fetched,
            stop,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::{FetchCause, FetchError};
    use crate::parser::MalformedPolicy;

    /// Serves canned pages by path; unknown paths fail with a 404.
    #[derive(Default)]
    struct FakeSite {
        pages: HashMap<String, String>,
        requested: Mutex<Vec<String>>,
    }

    impl FakeSite {
        fn page(mut self, kind: EntityKind, page: u32, markup: String) -> Self {
            self.pages.insert(kind.page_path(page), markup);
            self
        }

        fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageFetcher for FakeSite {
        async fn fetch(&self, path: &str) -> Result<String, FetchError> {
            self.requested.lock().unwrap().push(path.to_string());
            self.pages
                .get(path)
                .cloned()
                .ok_or_else(|| FetchError::new(path, FetchCause::Status(404)))
        }
    }

    fn reviews_markup(texts: &[&str]) -> String {
        texts
            .iter()
            .map(|text| format!(r#"<div class="review"><span>2023-01-05</span><p>{text}</p></div>"#))
            .collect()
    }

    fn texts(collected: Collected) -> Vec<String> {
        collected.into_reviews().into_iter().map(|r| r.text).collect()
    }

    fn parser() -> PageParser {
        PageParser::new(MalformedPolicy::Skip).unwrap()
    }

    #[tokio::test]
    async fn stops_at_first_empty_page() {
        let site = FakeSite::default()
            .page(EntityKind::Review, 1, reviews_markup(&["a", "b"]))
            .page(EntityKind::Review, 2, reviews_markup(&["c", "d"]))
            .page(EntityKind::Review, 3, reviews_markup(&[]))
            .page(EntityKind::Review, 4, reviews_markup(&["never"]));
        let parser = parser();

        let collected = Paginator::new(&site, &parser, 50)
            .collect(EntityKind::Review, PageRangePolicy::UntilEmpty)
            .await;

        assert_eq!(collected.stop, StopReason::EmptyPage(3));
        assert_eq!(collected.pages_fetched, 2);
        assert_eq!(texts(collected), vec!["a", "b", "c", "d"]);
        assert_eq!(site.requested().len(), 3);
    }

    #[tokio::test]
    async fn fetch_failure_keeps_earlier_pages_only() {
        let site = FakeSite::default()
            .page(EntityKind::Review, 1, reviews_markup(&["first", "second"]))
            .page(EntityKind::Review, 3, reviews_markup(&["third"]))
            .page(EntityKind::Review, 4, reviews_markup(&["fourth"]))
            .page(EntityKind::Review, 5, reviews_markup(&["fifth"]));
        let parser = parser();

        let collected = Paginator::new(&site, &parser, 50)
            .collect(EntityKind::Review, PageRangePolicy::UntilEmpty)
            .await;

        assert!(matches!(collected.stop, StopReason::FetchFailed { page: 2, .. }));
        assert!(!collected.stop.is_clean());
        assert_eq!(texts(collected), vec!["first", "second"]);
        assert_eq!(
            site.requested(),
            vec!["/reviews?page=1".to_string(), "/reviews?page=2".to_string()]
        );
    }

    #[tokio::test]
    async fn preserves_page_then_container_order() {
        let pages: [&[&str]; 3] = [&["p1-a", "p1-b", "p1-c"], &["p2-a"], &["p3-a", "p3-b"]];
        let mut site = FakeSite::default();
        for (i, page) in pages.iter().enumerate() {
            site = site.page(EntityKind::Review, i as u32 + 1, reviews_markup(page));
        }
        let parser = parser();

        let collected = Paginator::new(&site, &parser, 50)
            .collect(EntityKind::Review, PageRangePolicy::UntilEmpty)
            .await;

        let expected: Vec<String> = pages.concat().into_iter().map(String::from).collect();
        // Page 4 is missing, so the run ends on a fetch failure after page 3.
        assert!(matches!(collected.stop, StopReason::FetchFailed { page: 4, .. }));
        assert_eq!(texts(collected), expected);
    }

    #[tokio::test]
    async fn fixed_policy_never_requests_past_the_page_count() {
        let product = |name: &str| {
            format!(r#"<div class="product"><h3><a>{name}</a></h3><div class="short-description">d</div></div>"#)
        };
        let site = FakeSite::default()
            .page(EntityKind::Product, 1, product("one"))
            .page(EntityKind::Product, 2, product("two"))
            .page(EntityKind::Product, 3, product("three"));
        let parser = parser();

        let collected = Paginator::new(&site, &parser, 50)
            .collect(EntityKind::Product, PageRangePolicy::Fixed(2))
            .await;

        assert_eq!(collected.stop, StopReason::PageLimit(2));
        let names: Vec<String> = collected.into_products().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["one", "two"]);
        assert_eq!(site.requested().len(), 2);
    }

    #[tokio::test]
    async fn open_ended_policy_respects_safety_cap() {
        let mut site = FakeSite::default();
        for page in 1..=10 {
            site = site.page(EntityKind::Review, page, reviews_markup(&["again"]));
        }
        let parser = parser();

        let collected = Paginator::new(&site, &parser, 3)
            .collect(EntityKind::Review, PageRangePolicy::UntilEmpty)
            .await;

        assert_eq!(collected.stop, StopReason::SafetyCap(3));
        assert_eq!(collected.len(), 3);
    }

    #[tokio::test]
    async fn rejected_page_stops_like_a_failed_fetch() {
        let site = FakeSite::default()
            .page(EntityKind::Review, 1, reviews_markup(&["ok"]))
            .page(
                EntityKind::Review,
                2,
                r#"<div class="review"><span>2023-01-05</span></div>"#.to_string(),
            );
        let parser = PageParser::new(MalformedPolicy::FailPage).unwrap();

        let collected = Paginator::new(&site, &parser, 50)
            .collect(EntityKind::Review, PageRangePolicy::UntilEmpty)
            .await;

        assert!(matches!(collected.stop, StopReason::ParseFailed { page: 2, .. }));
        assert_eq!(texts(collected), vec!["ok"]);
    }

    #[tokio::test]
    async fn two_containers_per_page_scenario() {
        let site = FakeSite::default()
            .page(EntityKind::Review, 1, reviews_markup(&["r1", "r2"]))
            .page(EntityKind::Review, 2, reviews_markup(&["r3", "r4"]))
            .page(EntityKind::Review, 3, String::from("<html><body></body></html>"));
        let parser = parser();

        let collected = Paginator::new(&site, &parser, 50)
            .collect(EntityKind::Review, PageRangePolicy::UntilEmpty)
            .await;

        assert_eq!(texts(collected), vec!["r1", "r2", "r3", "r4"]);
    }
}
