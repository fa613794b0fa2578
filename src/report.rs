//! Monthly view over the sentiment-enriched review table.
//!
//! This is the filtering contract the dashboard relies on: list the months
//! that have reviews, pick one, and summarise that month's reviews.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use crate::models::{MonthBucket, SentimentReview};

/// Combined text shorter than this is not worth a word cloud.
const MIN_TEXT_CHARS: usize = 10;

/// Words too common to say anything about a review.
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "had", "has", "have",
    "i", "in", "is", "it", "its", "me", "my", "not", "of", "on", "or", "so", "that", "the",
    "this", "to", "was", "we", "were", "with", "you", "your",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthReport {
    /// `YYYY-MM`
    pub month: String,
    /// Long form, e.g. `July 2022`
    pub label: String,
    pub total: usize,
    pub sentiment_counts: BTreeMap<String, usize>,
    pub average_confidence: Option<f64>,
    pub top_words: Vec<(String, usize)>,
}

/// Months that have at least one review, oldest first.
#[must_use]
pub fn months(reviews: &[SentimentReview]) -> Vec<MonthBucket> {
    reviews
        .iter()
        .map(SentimentReview::month)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Reviews falling in `month`, in table order.
#[must_use]
pub fn filter_month(reviews: &[SentimentReview], month: MonthBucket) -> Vec<&SentimentReview> {
    reviews.iter().filter(|r| r.month() == month).collect()
}

/// Sentiment distribution, mean confidence and most frequent words for `month`.
#[must_use]
pub fn summarize(reviews: &[SentimentReview], month: MonthBucket, top_n: usize) -> MonthReport {
    let selected = filter_month(reviews, month);

    let mut sentiment_counts = BTreeMap::new();
    for review in &selected {
        *sentiment_counts.entry(review.sentiment.clone()).or_insert(0) += 1;
    }

    let average_confidence = if selected.is_empty() {
        None
    } else {
        #[allow(clippy::cast_precision_loss)]
        let count = selected.len() as f64;
        Some(selected.iter().map(|r| r.confidence).sum::<f64>() / count)
    };

    let top_words = word_frequencies(selected.iter().map(|r| r.text.as_str()), top_n);

    MonthReport {
        month: month.to_string(),
        label: month.label(),
        total: selected.len(),
        sentiment_counts,
        average_confidence,
        top_words,
    }
}

/// Most frequent words across `texts`, highest count first, ties broken
/// alphabetically.
///
/// Returns nothing when the combined text, trimmed at both ends, is
/// ten characters or shorter. Inner spaces count.
#[must_use]
pub fn word_frequencies<'a, I>(texts: I, top_n: usize) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = &'a str>,
{
    let combined = texts.into_iter().collect::<Vec<_>>().join(" ");
    if combined.trim().chars().count() <= MIN_TEXT_CHARS {
        return Vec::new();
    }

    let mut counts: HashMap<String, usize> = HashMap::new();
    for word in combined
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .map(|w| w.trim_matches('\'').to_lowercase())
        .filter(|w| w.chars().count() > 1 && !STOPWORDS.contains(&w.as_str()))
    {
        *counts.entry(word).or_insert(0) += 1;
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(top_n);
    ranked
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn review(y: i32, m: u32, d: u32, text: &str, sentiment: &str, confidence: f64) -> SentimentReview {
        SentimentReview {
            date: NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
            text: text.to_string(),
            stars: None,
            sentiment: sentiment.to_string(),
            confidence,
        }
    }

    fn sample() -> Vec<SentimentReview> {
        vec![
            review(2023, 1, 4, "Great taste, great price", "POSITIVE", 0.9),
            review(2022, 7, 22, "Arrived broken", "NEGATIVE", 0.8),
            review(2023, 1, 20, "Terrible packaging", "NEGATIVE", 0.7),
            review(2022, 7, 2, "Love the chocolate", "POSITIVE", 1.0),
            review(2023, 1, 31, "Great again", "POSITIVE", 0.5),
        ]
    }

    #[test]
    fn months_are_unique_and_chronological() {
        let listed: Vec<String> = months(&sample()).iter().map(ToString::to_string).collect();
        assert_eq!(listed, vec!["2022-07", "2023-01"]);
    }

    #[test]
    fn filter_keeps_table_order() {
        let reviews = sample();
        let january = filter_month(&reviews, MonthBucket { year: 2023, month: 1 });
        let texts: Vec<&str> = january.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["Great taste, great price", "Terrible packaging", "Great again"]
        );
    }

    #[test]
    fn summary_counts_sentiment_and_averages_confidence() {
        let report = summarize(&sample(), MonthBucket { year: 2023, month: 1 }, 3);

        assert_eq!(report.month, "2023-01");
        assert_eq!(report.label, "January 2023");
        assert_eq!(report.total, 3);
        assert_eq!(report.sentiment_counts.get("POSITIVE"), Some(&2));
        assert_eq!(report.sentiment_counts.get("NEGATIVE"), Some(&1));
        let avg = report.average_confidence.unwrap();
        assert!((avg - 0.7).abs() < 1e-9);
        assert_eq!(report.top_words[0], ("great".to_string(), 3));
    }

    #[test]
    fn summary_of_empty_month_has_no_average() {
        let report = summarize(&sample(), MonthBucket { year: 2020, month: 5 }, 10);
        assert_eq!(report.total, 0);
        assert!(report.sentiment_counts.is_empty());
        assert_eq!(report.average_confidence, None);
        assert!(report.top_words.is_empty());
    }

    #[test]
    fn word_frequencies_needs_enough_text() {
        assert!(word_frequencies(["too short"], 5).is_empty());
        assert!(word_frequencies(["  ", "tiny", " "], 5).is_empty());
        assert!(word_frequencies(["  too short  "], 5).is_empty());
    }

    #[test]
    fn word_frequencies_counts_inner_spaces_toward_the_minimum() {
        // Eleven characters once trimmed, only ten of them non-blank.
        assert_eq!(
            word_frequencies(["Sweet candy"], 5),
            vec![("candy".to_string(), 1), ("sweet".to_string(), 1)]
        );
        assert!(word_frequencies(["Sweet", "cand"], 5).is_empty());
    }

    #[test]
    fn word_frequencies_ranks_and_filters_stopwords() {
        let words = word_frequencies(
            ["The candy is sweet and the box is pretty", "Sweet candy, sweet price!"],
            3,
        );
        assert_eq!(
            words,
            vec![
                ("sweet".to_string(), 3),
                ("candy".to_string(), 2),
                ("box".to_string(), 1),
            ]
        );
    }
}
