use std::sync::Arc;

use cb_core::ChatBrainError;
use tracing::debug;

/// Sentence embedding backend used for the semantic half of ranking.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, ChatBrainError>;

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, ChatBrainError> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    fn model_name(&self) -> &str;
}

/// Embedder used when semantic ranking is switched on without a host model.
///
/// Built with the `model` feature this loads the sentence model from the
/// HuggingFace cache (downloading it on first use). Without the feature, or
/// when the model cannot be loaded, ranking falls back to
/// [`HashedTrigramEmbedder`].
pub fn default_embedder() -> Arc<dyn Embedder> {
    #[cfg(feature = "model")]
    {
        match crate::MiniLmEmbedder::new() {
            Ok(embedder) => return Arc::new(embedder),
            Err(error) => {
                tracing::warn!(%error, "sentence model unavailable, using hashed trigrams");
            }
        }
    }
    debug!("using hashed trigram embedder");
    Arc::new(HashedTrigramEmbedder::default())
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Deterministic offline embedder: character trigrams of every lower-cased
/// word hashed into a fixed number of buckets. Only spelling overlap counts,
/// so paraphrases with no shared trigrams score zero.
#[derive(Debug, Clone)]
pub struct HashedTrigramEmbedder {
    dimensions: usize,
}

impl HashedTrigramEmbedder {
    pub const DEFAULT_DIMENSIONS: usize = 384;
    pub const MODEL_NAME: &'static str = "hashed-trigram";

    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn bucket(&self, gram: &[char]) -> usize {
        let mut hash = FNV_OFFSET;
        for ch in gram {
            for byte in (*ch as u32).to_le_bytes() {
                hash ^= u64::from(byte);
                hash = hash.wrapping_mul(FNV_PRIME);
            }
        }
        (hash % self.dimensions as u64) as usize
    }
}

impl Default for HashedTrigramEmbedder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIMENSIONS)
    }
}

impl Embedder for HashedTrigramEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, ChatBrainError> {
        let mut vector = vec![0.0f32; self.dimensions];
        for word in crate::tokenize(text) {
            let padded = format!(" {} ", word).chars().collect::<Vec<_>>();
            for gram in padded.windows(3) {
                vector[self.bucket(gram)] += 1.0;
            }
        }
        Ok(vector)
    }

    fn model_name(&self) -> &str {
        Self::MODEL_NAME
    }
}

/// Cosine similarity; zero when either vector has zero norm.
pub fn cosine_similarity(left: &[f32], right: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut left_norm = 0.0f64;
    let mut right_norm = 0.0f64;
    for (a, b) in left.iter().zip(right) {
        let (a, b) = (f64::from(*a), f64::from(*b));
        dot += a * b;
        left_norm += a * a;
        right_norm += b * b;
    }
    let norms = left_norm.sqrt() * right_norm.sqrt();
    if norms == 0.0 {
        return 0.0;
    }
    dot / norms
}
