use std::sync::Arc;

use cb_core::{Candidate, ChatBrainError, Intent, ScriptPack};
use tracing::{debug, instrument};

use crate::{cosine_similarity, default_embedder, tokenize, Bm25, Embedder};

pub const DEFAULT_TOP_K: usize = 3;
pub const LEXICAL_WEIGHT: f64 = 0.6;
pub const SEMANTIC_WEIGHT: f64 = 0.4;

struct BuiltIndex {
    pack: Arc<ScriptPack>,
    bm25: Bm25,
    embeddings: Option<Vec<Vec<f32>>>,
}

/// Hybrid lexical/semantic ranking over one script pack.
pub struct NluIndex {
    embedder: Option<Arc<dyn Embedder>>,
    built: Option<BuiltIndex>,
}

impl NluIndex {
    /// Lexical-only index, or one backed by [`default_embedder`] when
    /// `use_embedding` is set.
    pub fn new(use_embedding: bool) -> Self {
        Self {
            embedder: use_embedding.then(default_embedder),
            built: None,
        }
    }

    /// Semantic ranking enabled with a host-provided model.
    pub fn with_embedder(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder: Some(embedder),
            built: None,
        }
    }

    pub fn uses_embedding(&self) -> bool {
        self.embedder.is_some()
    }

    pub fn embedder(&self) -> Option<&Arc<dyn Embedder>> {
        self.embedder.as_ref()
    }

    pub fn is_built(&self) -> bool {
        self.built.is_some()
    }

    /// Indexes `pack`; on error the previously built index is kept.
    #[instrument(skip_all, fields(intents = pack.len(), embedding = self.uses_embedding()))]
    pub fn build(&mut self, pack: Arc<ScriptPack>) -> Result<(), ChatBrainError> {
        let documents = pack
            .intents()
            .iter()
            .map(Intent::ranking_document)
            .collect::<Vec<_>>();
        let corpus = documents
            .iter()
            .map(|document| tokenize(document))
            .collect::<Vec<_>>();
        let embeddings = match &self.embedder {
            Some(embedder) => {
                let texts = documents.iter().map(String::as_str).collect::<Vec<_>>();
                Some(embedder.embed_batch(&texts)?)
            }
            None => None,
        };
        debug!("ranking index built");

        self.built = Some(BuiltIndex {
            bm25: Bm25::new(&corpus),
            pack,
            embeddings,
        });
        Ok(())
    }

    pub fn rank(&self, text: &str, top_k: usize) -> Result<Vec<Candidate>, ChatBrainError> {
        let built = self
            .built
            .as_ref()
            .ok_or_else(ChatBrainError::ranking_not_built)?;

        let lexical = built.bm25.scores(&tokenize(text));
        let max_lexical = lexical.iter().copied().fold(0.0f64, f64::max);
        let query_embedding = match (&self.embedder, &built.embeddings) {
            (Some(embedder), Some(_)) => Some(embedder.embed(text)?),
            _ => None,
        };

        let mut candidates = built
            .pack
            .intents()
            .iter()
            .enumerate()
            .map(|(index, intent)| {
                let normalized_lexical = if max_lexical > 0.0 {
                    lexical[index] / max_lexical
                } else {
                    0.0
                };
                let score = match (&built.embeddings, &query_embedding) {
                    (Some(embeddings), Some(query)) => {
                        let normalized_semantic =
                            (cosine_similarity(&embeddings[index], query) + 1.0) / 2.0;
                        LEXICAL_WEIGHT * normalized_lexical
                            + SEMANTIC_WEIGHT * normalized_semantic
                    }
                    _ => normalized_lexical,
                };
                Candidate::from_intent(intent, score)
            })
            .collect::<Vec<_>>();

        candidates.sort_by(|left, right| right.score.total_cmp(&left.score));
        candidates.truncate(top_k);
        if let Some(best) = candidates.first() {
            debug!(intent = %best.intent_id, score = best.score, "top candidate");
        }
        Ok(candidates)
    }
}

#[cfg(test)]
mod index_tests {
    use super::*;
    use crate::HashedTrigramEmbedder;
    use std::collections::BTreeMap;

    fn pack() -> Arc<ScriptPack> {
        let documents: BTreeMap<String, String> = [(
            "a.yaml".to_string(),
            r#"
intents:
  - id: cai_va_kich_hoat_vneid
    domain: vneid
    version: 1
    synonyms: ["kích hoạt vneid", "cài đặt vneid"]
    steps: [{id: s, say: a}]
  - id: quen_mat_khau_vneid
    domain: vneid
    version: 1
    can_interrupt: true
    synonyms: ["quên mật khẩu vneid", "quên passcode"]
    steps: [{id: s, say: b}]
  - id: hoi_le_phi
    domain: fees
    version: 1
    examples: ["lệ phí định danh tổ chức"]
    steps: [{id: s, say: c}]
  - id: tra_cuu_ho_so
    domain: fees
    version: 1
    steps: [{id: s, say: d}]
"#
            .to_string(),
        )]
        .into_iter()
        .collect();
        Arc::new(cb_loader::load_from_documents(&documents).expect("pack"))
    }

    fn built(use_embedding: bool) -> NluIndex {
        let mut index = if use_embedding {
            NluIndex::with_embedder(Arc::new(HashedTrigramEmbedder::default()))
        } else {
            NluIndex::new(false)
        };
        index.build(pack()).expect("build");
        index
    }

    #[test]
    fn rank_before_build_fails() {
        let index = NluIndex::new(false);
        let error = index.rank("x", 3).expect_err("not built");
        assert_eq!(error.code, "NLU_NOT_BUILT");
        assert!(!index.is_built());
    }

    #[test]
    fn lexical_rank_normalizes_by_best_score() {
        let index = built(false);
        let ranked = index.rank("quên passcode", 3).expect("rank");
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].intent_id, "quen_mat_khau_vneid");
        assert!((ranked[0].score - 1.0).abs() < 1e-9);
        assert!(ranked[0].can_interrupt);
        assert_eq!(ranked[0].file.as_deref(), Some("a.yaml"));
        assert!(ranked.windows(2).all(|pair| pair[0].score >= pair[1].score));
    }

    #[test]
    fn intents_without_phrases_rank_by_id_words() {
        let index = built(false);
        let ranked = index.rank("tra cuu ho so", 1).expect("rank");
        assert_eq!(ranked[0].intent_id, "tra_cuu_ho_so");
    }

    #[test]
    fn no_lexical_match_keeps_original_order_with_zero_scores() {
        let index = built(false);
        let ranked = index.rank("xyz", 4).expect("rank");
        let ids = ranked
            .iter()
            .map(|candidate| candidate.intent_id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            ids,
            vec![
                "cai_va_kich_hoat_vneid",
                "quen_mat_khau_vneid",
                "hoi_le_phi",
                "tra_cuu_ho_so"
            ]
        );
        assert!(ranked.iter().all(|candidate| candidate.score == 0.0));
    }

    #[test]
    fn ranking_is_deterministic() {
        let index = built(false);
        let first = index.rank("kích hoạt vneid", 3).expect("rank");
        for _ in 0..5 {
            assert_eq!(index.rank("kích hoạt vneid", 3).expect("rank"), first);
        }
    }

    #[test]
    fn semantic_blend_stays_in_unit_range() {
        let index = built(true);
        assert!(index.uses_embedding());
        let ranked = index.rank("kích hoạt vneid", 4).expect("rank");
        assert_eq!(ranked[0].intent_id, "cai_va_kich_hoat_vneid");
        assert!(ranked[0].score <= 1.0 + 1e-9);
        assert!(ranked[0].score >= LEXICAL_WEIGHT);
        assert!(ranked.iter().all(|candidate| candidate.score >= 0.0));
    }

    struct ConstantEmbedder;

    impl Embedder for ConstantEmbedder {
        fn embed(&self, _text: &str) -> Result<Vec<f32>, ChatBrainError> {
            Ok(vec![1.0, 0.0])
        }

        fn model_name(&self) -> &str {
            "constant"
        }
    }

    #[test]
    fn custom_embedder_contributes_semantic_weight() {
        let mut index = NluIndex::with_embedder(Arc::new(ConstantEmbedder));
        index.build(pack()).expect("build");
        let ranked = index.rank("xyz", 1).expect("rank");
        assert!((ranked[0].score - SEMANTIC_WEIGHT).abs() < 1e-9);
    }

    struct UnavailableEmbedder;

    impl Embedder for UnavailableEmbedder {
        fn embed(&self, _text: &str) -> Result<Vec<f32>, ChatBrainError> {
            Err(ChatBrainError::embedding("offline"))
        }

        fn model_name(&self) -> &str {
            "unavailable"
        }
    }

    #[test]
    fn embedding_failure_fails_build_without_replacing_index() {
        let mut index = NluIndex::with_embedder(Arc::new(UnavailableEmbedder));
        let error = index.build(pack()).expect_err("embedder is offline");
        assert_eq!(error.code, "NLU_EMBEDDING");
        assert!(!index.is_built());
        assert_eq!(
            index.embedder().map(|embedder| embedder.model_name()),
            Some("unavailable")
        );
    }
}
