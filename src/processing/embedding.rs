use std::sync::{Arc, Mutex};

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use thiserror::Error;

use crate::models::config::EmbeddingSettings;
use crate::processing::text::TextNormalizer;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("unknown embedding model: {0}")]
    UnknownModel(String),
    #[error("failed to initialize embedder: {0}")]
    ModelInit(String),
    #[error("failed to generate embedding: {0}")]
    Embedding(String),
    #[error("embedding model lock poisoned")]
    Poisoned,
}

pub type ScoringResult<T> = Result<T, ScoringError>;

/// A loaded sentence-embedding model.
///
/// Implementations are loaded once and shared; `embed` only borrows them.
pub trait SentenceEmbedder: Send + Sync {
    /// Encodes `text` into a fixed-dimensional vector.
    fn embed(&self, text: &str) -> ScoringResult<Vec<f32>>;
}

/// Maps a sentence-transformers style model name onto a bundled model.
pub fn embedding_model_from_name(name: &str) -> ScoringResult<EmbeddingModel> {
    let normalized = name.trim().to_lowercase();
    let normalized = normalized
        .strip_prefix("sentence-transformers/")
        .unwrap_or(&normalized);
    match normalized {
        "paraphrase-mpnet-base-v2" | "paraphrase-multilingual-mpnet-base-v2" => {
            Ok(EmbeddingModel::ParaphraseMLMpnetBaseV2)
        }
        "paraphrase-multilingual-minilm-l12-v2" => Ok(EmbeddingModel::ParaphraseMLMiniLML12V2),
        "all-minilm-l6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "all-minilm-l12-v2" => Ok(EmbeddingModel::AllMiniLML12V2),
        "multilingual-e5-large" => Ok(EmbeddingModel::MultilingualE5Large),
        "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        _ => Err(ScoringError::UnknownModel(name.to_string())),
    }
}

/// [`SentenceEmbedder`] backed by a local `fastembed` ONNX model.
pub struct FastEmbedder {
    model: Mutex<TextEmbedding>,
}

impl FastEmbedder {
    /// Loads (downloading on first use) the model named in `settings`.
    pub fn try_new(settings: &EmbeddingSettings) -> ScoringResult<Self> {
        let model = embedding_model_from_name(&settings.model)?;
        log::info!("Loading embedding model {}", settings.model);
        let embedder = TextEmbedding::try_new(
            InitOptions::new(model).with_show_download_progress(settings.show_download_progress),
        )
        .map_err(|error| ScoringError::ModelInit(format!("{}: {error}", settings.model)))?;
        Ok(Self {
            model: Mutex::new(embedder),
        })
    }
}

impl SentenceEmbedder for FastEmbedder {
    fn embed(&self, text: &str) -> ScoringResult<Vec<f32>> {
        let mut model = self.model.lock().map_err(|_| ScoringError::Poisoned)?;
        model
            .embed(vec![text], None)
            .map_err(|error| ScoringError::Embedding(error.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| ScoringError::Embedding("model returned no embedding".to_string()))
    }
}

/// Cosine similarity of two vectors.
///
/// Returns `0.0` when either vector has zero norm or the result is not finite.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let similarity = dot / (norm_a * norm_b);
    if similarity.is_finite() {
        similarity
    } else {
        0.0
    }
}

/// Scores descriptions against a search string in a shared embedding space.
#[derive(Clone)]
pub struct SimilarityScorer {
    embedder: Arc<dyn SentenceEmbedder>,
    normalizer: TextNormalizer,
}

impl SimilarityScorer {
    pub fn new(embedder: Arc<dyn SentenceEmbedder>, normalizer: TextNormalizer) -> Self {
        Self {
            embedder,
            normalizer,
        }
    }

    pub fn normalizer(&self) -> &TextNormalizer {
        &self.normalizer
    }

    /// Cleans `text` and embeds what is left.
    pub fn embed_text(&self, text: &str) -> ScoringResult<Vec<f32>> {
        self.embedder.embed(&self.normalizer.clean_text(text))
    }

    /// Similarity between a raw description and a raw search string.
    pub fn score(&self, description: &str, search_key: &str) -> ScoringResult<f32> {
        let key_embedding = self.embed_text(search_key)?;
        self.score_against(&key_embedding, description)
    }

    /// Similarity of a raw description to an already embedded search string.
    pub fn score_against(&self, key_embedding: &[f32], description: &str) -> ScoringResult<f32> {
        let description_embedding = self.embed_text(description)?;
        Ok(cosine_similarity(&description_embedding, key_embedding))
    }
}
