//! Scoring and ordering of scraped products.

use crate::domain::product::{ProductRecord, ScrapedProduct, SkipReason, SkippedProduct};
use crate::processing::embedding::{ScoringResult, SimilarityScorer};

/// Scored records plus the products whose description could not be embedded.
#[derive(Debug, Default)]
pub struct Ranking {
    /// Sorted by descending similarity, ties in extraction order.
    pub records: Vec<ProductRecord>,
    pub failed: Vec<SkippedProduct>,
}

/// Scores every product against `search_key` and sorts the rows.
///
/// The search string is embedded once for the whole batch. Only a failure to
/// embed it is returned as an error.
pub fn rank_products(
    products: Vec<ScrapedProduct>,
    search_key: &str,
    scorer: &SimilarityScorer,
) -> ScoringResult<Ranking> {
    let key_embedding = scorer.embed_text(search_key)?;

    let mut ranking = Ranking::default();
    for product in products {
        match scorer.score_against(&key_embedding, &product.description) {
            Ok(similarity) => ranking
                .records
                .push(ProductRecord::new(product, search_key).scored(similarity)),
            Err(error) => {
                log::error!("Failed to score {}: {error}", product.url);
                ranking.failed.push(SkippedProduct {
                    card: product.card,
                    url: Some(product.url),
                    reason: SkipReason::EmbeddingFailed(error.to_string()),
                });
            }
        }
    }

    sort_by_similarity(&mut ranking.records);
    Ok(ranking)
}

/// Sorts records by descending similarity.
///
/// The sort is stable, so equally scored records keep their relative order.
pub fn sort_by_similarity(records: &mut [ProductRecord]) {
    records.sort_by(|a, b| {
        let a = a.similarity.unwrap_or(f32::NEG_INFINITY);
        let b = b.similarity.unwrap_or(f32::NEG_INFINITY);
        b.total_cmp(&a)
    });
}

/// URLs of the first `limit` records.
pub fn top_urls(records: &[ProductRecord], limit: usize) -> Vec<String> {
    records
        .iter()
        .take(limit)
        .map(|record| record.url.clone())
        .collect()
}
