use std::fmt;

use serde::Serialize;

/// A product pulled from a detail page before it is scored.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScrapedProduct {
    /// Position of the product's card on the results page.
    pub card: usize,
    pub url: String,
    pub description: String,
}

/// One row of the ranking table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProductRecord {
    pub url: String,
    pub description: String,
    /// The search string exactly as the user typed it.
    pub search_key: String,
    pub similarity: Option<f32>,
}

impl ProductRecord {
    pub fn new(product: ScrapedProduct, search_key: &str) -> Self {
        Self {
            url: product.url,
            description: product.description,
            search_key: search_key.to_string(),
            similarity: None,
        }
    }

    /// Consumes the record, attaching its similarity score.
    pub fn scored(self, similarity: f32) -> Self {
        Self {
            similarity: Some(similarity),
            ..self
        }
    }
}

/// Why a result card did not produce a [`ScrapedProduct`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    MissingLink,
    InvalidHref(String),
    FetchFailed(String),
    MissingDescription,
    EmbeddingFailed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingLink => write!(f, "card has no product link"),
            Self::InvalidHref(href) => write!(f, "invalid product href {href}"),
            Self::FetchFailed(error) => write!(f, "unable to access the url: {error}"),
            Self::MissingDescription => write!(f, "detail page has no description"),
            Self::EmbeddingFailed(error) => write!(f, "failed to embed description: {error}"),
        }
    }
}

/// A card that was dropped, with the position it had on the results page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SkippedProduct {
    pub card: usize,
    pub url: Option<String>,
    pub reason: SkipReason,
}

pub type CardResult = Result<ScrapedProduct, SkippedProduct>;

/// Everything a crawler got out of one search-results page.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ScrapeOutcome {
    /// Products in the order their cards appeared.
    pub products: Vec<ScrapedProduct>,
    pub skipped: Vec<SkippedProduct>,
}

impl ScrapeOutcome {
    /// Folds one card's result into the outcome.
    pub fn push(&mut self, result: CardResult) {
        match result {
            Ok(product) => self.products.push(product),
            Err(skipped) => {
                log::warn!(
                    "Skipping card {} ({}): {}",
                    skipped.card,
                    skipped.url.as_deref().unwrap_or("no url"),
                    skipped.reason
                );
                self.skipped.push(skipped);
            }
        }
    }
}
