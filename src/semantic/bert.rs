use std::fs;
use std::path::Path;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use super::{Embedder, normalize_vector};
use crate::error::EvalError;

// Sentence-transformers MiniLM checkpoints are trained on at most 256 tokens.
const MAX_SEQ_LEN: usize = 256;

/// Mean-pooled BERT sentence encoder read from a local model directory.
///
/// The directory holds `config.json`, `tokenizer.json` and `model.safetensors`,
/// as exported by sentence-transformers.
pub struct BertEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimensions: usize,
}

impl BertEmbedder {
    pub fn load(model_dir: &Path) -> Result<Self, EvalError> {
        let config_path = model_dir.join("config.json");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let weights_path = model_dir.join("model.safetensors");
        for path in [&config_path, &tokenizer_path, &weights_path] {
            if !path.exists() {
                return Err(load_error(format!("missing {}", path.display())));
            }
        }

        let raw = fs::read_to_string(&config_path)
            .map_err(|err| load_error(format!("failed to read {}: {err}", config_path.display())))?;
        let config: Config = serde_json::from_str(&raw)
            .map_err(|err| load_error(format!("failed to parse {}: {err}", config_path.display())))?;
        let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|err| {
            load_error(format!("failed to load {}: {err}", tokenizer_path.display()))
        })?;

        let device = Device::Cpu;
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path.as_path()], DType::F32, &device)
        }
        .map_err(|err| load_error(err.to_string()))?;
        let model = BertModel::load(vb, &config).map_err(|err| load_error(err.to_string()))?;

        info!(
            model_dir = %model_dir.display(),
            hidden_size = config.hidden_size,
            "loaded BERT encoder"
        );
        Ok(Self {
            model,
            tokenizer,
            device,
            dimensions: config.hidden_size,
        })
    }
}

impl Embedder for BertEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EvalError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|err| EvalError::Inference {
                reason: format!("tokenization failed: {err}"),
            })?;
        let mut ids = encoding.get_ids().to_vec();
        ids.truncate(MAX_SEQ_LEN);
        if ids.is_empty() {
            return Ok(vec![0.0; self.dimensions]);
        }

        let token_count = ids.len();
        debug!(token_count, "encoding text");
        let input_ids = Tensor::new(ids.as_slice(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = input_ids.zeros_like()?;
        // [1, tokens, hidden] -> mean over tokens -> [hidden]
        let hidden = self.model.forward(&input_ids, &token_type_ids, None)?;
        let pooled = (hidden.sum(1)? / token_count as f64)?;
        let mut vector = pooled.squeeze(0)?.to_vec1::<f32>()?;

        normalize_vector(&mut vector);
        Ok(vector)
    }
}

fn load_error(reason: String) -> EvalError {
    EvalError::ModelLoad { reason }
}
