//! Review date normalization.
//!
//! Raw reviews carry their date as free text in whatever format the site
//! renders. Rows whose date cannot be read are dropped; the rest get a
//! canonical timestamp and a month bucket.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::{debug, info};

use crate::models::{RawReview, Review};

/// Formats carrying a time of day, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Date-only formats, tried in order. These resolve to midnight.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d.%m.%Y",
    "%m/%d/%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

/// Parses a date as rendered by the source site.
///
/// Offsets in RFC 3339 input are dropped, keeping the local wall-clock time.
#[must_use]
pub fn parse_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Parses every review's date, keeping survivors in their original order.
#[must_use]
pub fn normalize(raw: Vec<RawReview>) -> Vec<Review> {
    let total = raw.len();

    let reviews: Vec<Review> = raw
        .into_iter()
        .filter_map(|review| match parse_date(&review.date_text) {
            Some(date) => Some(Review::new(date, review.text)),
            None => {
                debug!("Dropping review with unparseable date {:?}", review.date_text);
                None
            }
        })
        .collect();

    let dropped = total - reviews.len();
    if dropped > 0 {
        info!("Dropped {} of {} reviews with unparseable dates", dropped, total);
    }

    reviews
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MonthBucket;

    fn raw(date_text: &str, text: &str) -> RawReview {
        RawReview {
            date_text: date_text.to_string(),
            text: text.to_string(),
        }
    }

    fn ymd_hms(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn parses_supported_formats() {
        let midnight = ymd_hms(2022, 7, 22, 0, 0, 0);
        for text in [
            "2022-07-22",
            " 2022-07-22 ",
            "2022/07/22",
            "22.07.2022",
            "07/22/2022",
            "July 22, 2022",
            "Jul 22, 2022",
            "22 July 2022",
            "22 Jul 2022",
        ] {
            assert_eq!(parse_date(text), Some(midnight), "format {text:?}");
        }

        let afternoon = ymd_hms(2022, 7, 22, 14, 30, 5);
        for text in [
            "2022-07-22T14:30:05",
            "2022-07-22 14:30:05",
            "2022-07-22T14:30:05+02:00",
        ] {
            assert_eq!(parse_date(text), Some(afternoon), "format {text:?}");
        }
    }

    #[test]
    fn rejects_garbage() {
        for text in ["", "   ", "yesterday", "2022-13-40", "32.01.2022"] {
            assert_eq!(parse_date(text), None, "input {text:?}");
        }
    }

    #[test]
    fn drops_unparseable_rows_and_keeps_order() {
        let reviews = normalize(vec![
            raw("2022-07-22", "first"),
            raw("soon", "bad one"),
            raw("2023-01-03", "second"),
            raw("", "bad two"),
            raw("2021-12-31", "third"),
        ]);

        assert_eq!(reviews.len(), 3);
        assert_eq!(
            reviews.iter().map(|r| r.text.as_str()).collect::<Vec<_>>(),
            vec!["first", "second", "third"]
        );
        for review in &reviews {
            assert_eq!(review.month, MonthBucket::of(&review.date));
        }
        assert_eq!(reviews[2].month, MonthBucket { year: 2021, month: 12 });
    }

    #[test]
    fn empty_input_is_empty_output() {
        assert!(normalize(Vec::new()).is_empty());
    }
}
