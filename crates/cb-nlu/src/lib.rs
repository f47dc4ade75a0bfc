mod bm25;
mod embedding;
mod index;
#[cfg(feature = "model")]
mod minilm;
mod policy;
mod tokenize;

pub use bm25::Bm25;
pub use embedding::{cosine_similarity, default_embedder, Embedder, HashedTrigramEmbedder};
#[cfg(feature = "model")]
pub use minilm::{MiniLmEmbedder, EMBEDDING_DIM, MODEL_REPO};
pub use index::{NluIndex, DEFAULT_TOP_K, LEXICAL_WEIGHT, SEMANTIC_WEIGHT};
pub use policy::{Policy, DEFAULT_CONFIDENCE_THRESHOLD, SCORE_EPSILON, SYSTEM_INTENTS};
pub use tokenize::tokenize;
