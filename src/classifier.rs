pub use crate::device::Device;
use crate::error::{Error, Result};
use crate::model::config::{ClassifierConfig, DEFAULT_DROPOUT, MAX_LEN, NUM_LABELS};
use crate::model::BertForSequenceClassification;
use crate::tokenizer::load_tokenizer;
use candle_core::{DType, Tensor, D};
use candle_nn::ops::softmax;
use candle_nn::VarBuilder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;

pub const CONFIG_FILE: &str = "config.json";
/// Checkpoint names looked up in the model directory, in order of preference.
pub const WEIGHT_FILES: [&str; 2] = ["model.safetensors", "best_model.pt"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Safe,
    Malicious,
}

impl Label {
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Safe),
            1 => Some(Self::Malicious),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Malicious => "malicious",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub prediction: Label,
    pub confidence: f32,
}

#[derive(Clone, Debug)]
pub struct LoadOptions {
    pub device: Device,
    pub max_len: usize,
    pub dropout: f64,
    /// Explicit checkpoint path; when unset the model directory is searched
    /// for [`WEIGHT_FILES`].
    pub weights: Option<PathBuf>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            device: Device::Cpu,
            max_len: MAX_LEN,
            dropout: DEFAULT_DROPOUT,
            weights: None,
        }
    }
}

/// Fine-tuned BERT that labels URLs as safe or malicious.
///
/// Built once at startup and read-only afterwards, so a single instance can be
/// shared between request handlers behind an `Arc`.
pub struct UrlClassifier {
    model: BertForSequenceClassification,
    tokenizer: Tokenizer,
    device: Device,
}

impl UrlClassifier {
    pub fn load<P: AsRef<Path>>(path: P, options: LoadOptions) -> Result<Self> {
        let dir = path.as_ref();

        let tokenizer = load_tokenizer(dir, options.max_len)?;
        let vocab_size = tokenizer.get_vocab_size(true);

        let config_path = dir.join(CONFIG_FILE);
        if !config_path.exists() {
            return Err(Error::MissingFile(config_path));
        }
        let config = ClassifierConfig::from_file(&config_path, vocab_size, options.dropout)?;
        if config.head_config.max_position_embeddings < options.max_len {
            return Err(Error::ConfigError(format!(
                "max_len {} exceeds max_position_embeddings {}",
                options.max_len, config.head_config.max_position_embeddings
            )));
        }

        let weights = match options.weights {
            Some(weights) => weights,
            None => find_weights(dir)?,
        };
        let model_builder = open_weights(&weights, &options.device)?;
        let model = BertForSequenceClassification::load(model_builder, &config)?;

        let head = &config.head_config;
        tracing::info!(
            "loaded classifier from {} ({:?} layout, vocab size {}, dropout {}/{}, device {:?})",
            weights.display(),
            model.layout(),
            head.vocab_size,
            head.hidden_dropout_prob,
            head.attention_probs_dropout_prob,
            options.device
        );
        Ok(Self {
            model,
            tokenizer,
            device: options.device,
        })
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Softmax distribution over `[safe, malicious]`.
    pub fn class_probabilities(&self, url: &str) -> Result<[f32; NUM_LABELS]> {
        let encoding = self.tokenizer.encode(url, true)?;
        let input_ids = Tensor::new(encoding.get_ids(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = Tensor::new(encoding.get_type_ids(), &self.device)?.unsqueeze(0)?;
        let attention_mask =
            Tensor::new(encoding.get_attention_mask(), &self.device)?.unsqueeze(0)?;

        let logits = self
            .model
            .forward(&input_ids, &token_type_ids, &attention_mask)?;
        let probs: Vec<f32> = softmax(&logits, D::Minus1)?.squeeze(0)?.to_vec1()?;
        <[f32; NUM_LABELS]>::try_from(probs).map_err(|probs| {
            Error::ConfigError(format!(
                "expected {NUM_LABELS} class scores, got {}",
                probs.len()
            ))
        })
    }

    pub fn predict(&self, url: &str) -> Result<Prediction> {
        let probs = self.class_probabilities(url)?;
        let (index, confidence) = argmax(&probs);
        let prediction = Label::from_index(index)
            .ok_or_else(|| Error::ConfigError(format!("no label for class {index}")))?;
        tracing::debug!(%prediction, confidence, "classified url");
        Ok(Prediction {
            prediction,
            confidence,
        })
    }
}

/// Index and value of the largest probability; ties go to the lower index.
fn argmax(probs: &[f32; NUM_LABELS]) -> (usize, f32) {
    probs
        .iter()
        .copied()
        .enumerate()
        .fold((0, probs[0]), |best, (i, p)| if p > best.1 { (i, p) } else { best })
}

fn find_weights(dir: &Path) -> Result<PathBuf> {
    WEIGHT_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
        .ok_or_else(|| Error::MissingFile(dir.join(WEIGHT_FILES[0])))
}

fn open_weights(path: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    if !path.exists() {
        return Err(Error::MissingFile(path.to_path_buf()));
    }
    let is_safetensors = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("safetensors"));
    let model_builder = if is_safetensors {
        // SAFETY: the checkpoint is not modified while the process is running.
        unsafe { VarBuilder::from_mmaped_safetensors(&[path], DType::F32, device) }?
    } else {
        VarBuilder::from_pth(path, DType::F32, device)?
    };
    Ok(model_builder)
}
