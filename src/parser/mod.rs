//! Listing page parser
//!
//! Turns one page of listing markup into raw records by locating the repeated
//! container element for an entity kind and reading its named sub-fields.
//! Parsing is pure: the same markup always produces the same records.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::error::ParseError;
use crate::models::{
    EntityKind, PageResult, ProductRecord, RawRecord, RawReview, TestimonialRecord,
};
use crate::traits::KindSelectors;

/// What to do with a container that lacks a required field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MalformedPolicy {
    /// Drop that one entry and keep reading the page
    #[default]
    Skip,
    /// Treat the whole page as unreadable
    FailPage,
}

impl FromStr for MalformedPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "fail-page" | "fail_page" | "fail" => Ok(Self::FailPage),
            other => Err(format!("expected \"skip\" or \"fail-page\", got {other:?}")),
        }
    }
}

impl fmt::Display for MalformedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Skip => "skip",
            Self::FailPage => "fail-page",
        })
    }
}

/// Selectors for one kind, compiled once.
struct CompiledKind {
    layout: KindSelectors,
    container: Selector,
    fields: Vec<(&'static str, Selector)>,
}

impl CompiledKind {
    fn compile(kind: EntityKind) -> Result<Self, ParseError> {
        let layout = kind.selectors();
        let container = compile_selector(kind, "container", layout.container)?;
        let fields = layout
            .fields
            .iter()
            .map(|&(name, selector)| Ok((name, compile_selector(kind, name, selector)?)))
            .collect::<Result<Vec<_>, ParseError>>()?;

        Ok(Self {
            layout,
            container,
            fields,
        })
    }
}

fn compile_selector(
    kind: EntityKind,
    field: &'static str,
    selector: &'static str,
) -> Result<Selector, ParseError> {
    Selector::parse(selector).map_err(|e| ParseError::Selector {
        kind,
        field,
        selector,
        reason: format!("{e:?}"),
    })
}

/// Parser holding the compiled selectors for every entity kind.
pub struct PageParser {
    kinds: HashMap<EntityKind, CompiledKind>,
    malformed: MalformedPolicy,
}

impl PageParser {
    /// Compiles the selectors of every kind.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Selector`] if a kind's selector text is not valid CSS.
    pub fn new(malformed: MalformedPolicy) -> Result<Self, ParseError> {
        let kinds = EntityKind::ALL
            .into_iter()
            .map(|kind| Ok((kind, CompiledKind::compile(kind)?)))
            .collect::<Result<HashMap<_, _>, ParseError>>()?;

        Ok(Self { kinds, malformed })
    }

    #[must_use]
    pub const fn malformed_policy(&self) -> MalformedPolicy {
        self.malformed
    }

    /// Extracts the records of `kind` from one page, in document order.
    ///
    /// An empty result means the page holds no entries of that kind, which is
    /// how the end of a listing shows up.
    ///
    /// # Errors
    ///
    /// Only under [`MalformedPolicy::FailPage`]: returns
    /// [`ParseError::MissingField`] for the first entry lacking a required field.
    pub fn parse(&self, markup: &str, kind: EntityKind) -> Result<Vec<RawRecord>, ParseError> {
        let Some(compiled) = self.kinds.get(&kind) else {
            return Ok(Vec::new());
        };

        let document = Html::parse_document(markup);
        let mut records = Vec::new();

        for (index, container) in document.select(&compiled.container).enumerate() {
            let mut values = extract_fields(container, &compiled.fields);

            if let Some(field) = missing_required(&compiled.layout, &values) {
                match self.malformed {
                    MalformedPolicy::Skip => {
                        debug!("Skipping {} entry #{}: missing {}", kind, index, field);
                        continue;
                    }
                    MalformedPolicy::FailPage => {
                        return Err(ParseError::MissingField { kind, index, field });
                    }
                }
            }

            let mut take = |name: &str| values.remove(name).flatten().unwrap_or_default();

            let record = match kind {
                EntityKind::Product => RawRecord::Product(ProductRecord {
                    name: take("name"),
                    description: take("description"),
                }),
                EntityKind::Testimonial => RawRecord::Testimonial(TestimonialRecord {
                    content: take("content"),
                }),
                EntityKind::Review => RawRecord::Review(RawReview {
                    date_text: take("date"),
                    text: take("text"),
                }),
            };
            records.push(record);
        }

        Ok(records)
    }

    /// Same as [`parse`](Self::parse), tagged with the page it came from.
    ///
    /// # Errors
    ///
    /// See [`parse`](Self::parse).
    pub fn parse_page(
        &self,
        markup: &str,
        kind: EntityKind,
        page: u32,
    ) -> Result<PageResult, ParseError> {
        Ok(PageResult {
            kind,
            page,
            records: self.parse(markup, kind)?,
        })
    }
}

/// Reads each named field from the first match inside `container`.
/// Empty text counts as absent.
fn extract_fields(
    container: ElementRef<'_>,
    fields: &[(&'static str, Selector)],
) -> HashMap<&'static str, Option<String>> {
    fields
        .iter()
        .map(|(name, selector)| {
            let value = container
                .select(selector)
                .next()
                .map(|el| collapse_whitespace(&el.text().collect::<String>()))
                .filter(|text| !text.is_empty());
            (*name, value)
        })
        .collect()
}

fn missing_required(
    layout: &KindSelectors,
    values: &HashMap<&'static str, Option<String>>,
) -> Option<&'static str> {
    layout.required
        .iter()
        .copied()
        .find(|field| !matches!(values.get(field), Some(Some(_))))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
