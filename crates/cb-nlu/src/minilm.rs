//! Sentence embeddings from `paraphrase-MiniLM-L6-v2` run with Candle.
//!
//! MiniLM is a paraphrase model: the sentence vector is the attention-masked
//! mean of the token states, L2-normalized so cosine is a dot product.

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use cb_core::ChatBrainError;
use hf_hub::{api::sync::Api, Repo, RepoType};
use tokenizers::Tokenizer;
use tracing::{debug, info, instrument};

use crate::Embedder;

pub const MODEL_REPO: &str = "sentence-transformers/paraphrase-MiniLM-L6-v2";
pub const EMBEDDING_DIM: usize = 384;

pub struct MiniLmEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    model_name: String,
}

fn model_error(error: impl std::fmt::Display) -> ChatBrainError {
    ChatBrainError::embedding(error.to_string())
}

impl MiniLmEmbedder {
    /// Loads the model from the HuggingFace cache, downloading it on first
    /// use (~90MB).
    pub fn new() -> Result<Self, ChatBrainError> {
        Self::with_model(MODEL_REPO)
    }

    #[instrument]
    pub fn with_model(model_name: &str) -> Result<Self, ChatBrainError> {
        info!("loading sentence model");
        let device = Device::Cpu;

        let api = Api::new().map_err(model_error)?;
        let repo = api.repo(Repo::new(model_name.to_string(), RepoType::Model));
        let fetch = |file: &str| {
            repo.get(file).map_err(|error| {
                ChatBrainError::embedding(format!("cannot fetch {}: {}", file, error))
            })
        };
        let config_path = fetch("config.json")?;
        let tokenizer_path = fetch("tokenizer.json")?;
        let weights_path = fetch("model.safetensors")?;
        debug!("model files cached");

        let config_text = std::fs::read_to_string(&config_path).map_err(model_error)?;
        let config: Config = serde_json::from_str(&config_text).map_err(model_error)?;
        let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(model_error)?;

        // SAFETY: the safetensors file lives in the read-only model cache and
        // is not modified while mapped.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, &device)
                .map_err(model_error)?
        };
        let model = BertModel::load(vb, &config).map_err(model_error)?;
        info!(hidden_size = config.hidden_size, "sentence model loaded");

        Ok(Self {
            model,
            tokenizer,
            device,
            model_name: model_name.to_string(),
        })
    }

    fn forward_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, ChatBrainError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(model_error)?;
        let max_len = encodings
            .iter()
            .map(|encoding| encoding.get_ids().len())
            .max()
            .unwrap_or(0);

        let mut input_ids = Vec::with_capacity(texts.len() * max_len);
        let mut attention_mask = Vec::with_capacity(texts.len() * max_len);
        let mut token_type_ids = Vec::with_capacity(texts.len() * max_len);
        for encoding in &encodings {
            let pad = max_len - encoding.get_ids().len();
            input_ids.extend_from_slice(encoding.get_ids());
            input_ids.extend(std::iter::repeat(0).take(pad));
            attention_mask.extend_from_slice(encoding.get_attention_mask());
            attention_mask.extend(std::iter::repeat(0).take(pad));
            token_type_ids.extend_from_slice(encoding.get_type_ids());
            token_type_ids.extend(std::iter::repeat(0).take(pad));
        }

        self.pooled(texts.len(), max_len, input_ids, attention_mask, token_type_ids)
            .map_err(model_error)
    }

    fn pooled(
        &self,
        batch: usize,
        max_len: usize,
        input_ids: Vec<u32>,
        attention_mask: Vec<u32>,
        token_type_ids: Vec<u32>,
    ) -> candle_core::Result<Vec<Vec<f32>>> {
        let input_ids = Tensor::from_vec(input_ids, (batch, max_len), &self.device)?;
        let attention_mask = Tensor::from_vec(attention_mask, (batch, max_len), &self.device)?;
        let token_type_ids = Tensor::from_vec(token_type_ids, (batch, max_len), &self.device)?;

        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        let mask = attention_mask.to_dtype(DType::F32)?.unsqueeze(2)?;
        let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
        let counts = mask.sum(1)?.clamp(1e-9, f64::MAX)?;
        let mean = summed.broadcast_div(&counts)?;

        let norm = mean.sqr()?.sum_keepdim(1)?.sqrt()?.clamp(1e-12, f64::MAX)?;
        mean.broadcast_div(&norm)?.to_vec2::<f32>()
    }
}

impl Embedder for MiniLmEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, ChatBrainError> {
        self.forward_batch(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| ChatBrainError::embedding("model returned no vector"))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, ChatBrainError> {
        self.forward_batch(texts)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod minilm_tests {
    use super::*;
    use crate::{cosine_similarity, HashedTrigramEmbedder};

    #[test]
    #[ignore] // needs the model download
    fn vectors_are_unit_length() {
        let embedder = MiniLmEmbedder::new().expect("model should load");
        let vector = embedder.embed("kích hoạt tài khoản").expect("embed");
        assert_eq!(vector.len(), EMBEDDING_DIM);
        let norm = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01);
        assert_eq!(embedder.model_name(), MODEL_REPO);
    }

    #[test]
    #[ignore] // needs the model download
    fn paraphrase_scores_above_unrelated_text() {
        let embedder = MiniLmEmbedder::new().expect("model should load");
        let vectors = embedder
            .embed_batch(&["quên mật khẩu", "lấy lại passcode", "thời tiết hôm nay"])
            .expect("embed batch");
        let paraphrase = cosine_similarity(&vectors[0], &vectors[1]);
        let unrelated = cosine_similarity(&vectors[0], &vectors[2]);
        assert!(paraphrase > unrelated, "{} <= {}", paraphrase, unrelated);

        let hashed = HashedTrigramEmbedder::default();
        let lexical = hashed
            .embed_batch(&["quên mật khẩu", "lấy lại passcode"])
            .expect("embed batch");
        assert_eq!(cosine_similarity(&lexical[0], &lexical[1]), 0.0);
    }

    #[test]
    #[ignore] // needs the model download
    fn default_embedder_prefers_the_model() {
        assert_eq!(crate::default_embedder().model_name(), MODEL_REPO);
    }
}
