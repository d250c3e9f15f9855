use serde::Serialize;
use thiserror::Error;

use crate::crawlers::{CrawlerError, WebstoreCrawler};
use crate::domain::product::{ProductRecord, SkippedProduct};
use crate::processing::embedding::{ScoringError, SimilarityScorer};
use crate::processing::ranking::{rank_products, top_urls};

#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Crawler(#[from] CrawlerError),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
}

pub type SearchResult<T> = Result<T, SearchError>;

/// Ranked products for one search string.
#[derive(Debug, Serialize)]
pub struct SearchReport {
    pub query: String,
    /// At most `top_k` records, best match first.
    pub records: Vec<ProductRecord>,
    /// Cards that were dropped, in card order.
    pub skipped: Vec<SkippedProduct>,
}

impl SearchReport {
    pub fn urls(&self) -> Vec<String> {
        top_urls(&self.records, self.records.len())
    }
}

/// Recommends products for clothing search strings.
///
/// Owns a crawler and a loaded scorer so repeated searches reuse the same
/// HTTP client and embedding model.
pub struct ProductSearch {
    crawler: Box<dyn WebstoreCrawler>,
    scorer: SimilarityScorer,
    top_k: usize,
}

impl ProductSearch {
    pub fn new(crawler: Box<dyn WebstoreCrawler>, scorer: SimilarityScorer, top_k: usize) -> Self {
        Self {
            crawler,
            scorer,
            top_k,
        }
    }

    /// Scrapes, scores and ranks the products for `search_string`.
    ///
    /// Returns `Ok(None)` without touching the network when the search string
    /// is blank or has no keywords after cleaning.
    pub async fn search(&self, search_string: &str) -> SearchResult<Option<SearchReport>> {
        if self
            .scorer
            .normalizer()
            .clean_text(search_string)
            .is_empty()
        {
            log::warn!("please enter a valid search string");
            return Ok(None);
        }
        log::info!("Received search: {search_string}");

        let outcome = self.crawler.search_products(search_string).await?;
        let ranking = rank_products(outcome.products, search_string, &self.scorer)?;

        let mut skipped = outcome.skipped;
        skipped.extend(ranking.failed);
        skipped.sort_by_key(|s| s.card);

        let mut records = ranking.records;
        records.truncate(self.top_k);

        log::info!(
            "Finished search {search_string:?}: ranked={}, skipped={}",
            records.len(),
            skipped.len()
        );

        Ok(Some(SearchReport {
            query: search_string.to_string(),
            records,
            skipped,
        }))
    }

    /// URLs of the best matching products for `search_string`, best first.
    pub async fn product_list(&self, search_string: &str) -> SearchResult<Option<Vec<String>>> {
        Ok(self
            .search(search_string)
            .await?
            .map(|report| report.urls()))
    }
}
