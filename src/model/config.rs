use crate::error::{Error, Result};
use candle_transformers::models::bert::Config as BertConfig;
use serde::Deserialize;
use serde_json::Value;
use std::fs::File;
use std::path::Path;

/// Number of output classes of the head: safe and malicious.
pub const NUM_LABELS: usize = 2;
/// Fixed token length every URL is padded or truncated to.
pub const MAX_LEN: usize = 128;
pub const DEFAULT_DROPOUT: f64 = 0.3;

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub bert_config: BertConfig,
    pub head_config: HeadConfig,
}

/// Fields of `config.json` the classification head needs on top of the encoder.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HeadConfig {
    pub hidden_size: usize,
    pub vocab_size: usize,
    pub max_position_embeddings: usize,
    pub hidden_dropout_prob: f64,
    pub attention_probs_dropout_prob: f64,
    pub num_labels: usize,
}

impl ClassifierConfig {
    pub fn from_file<P: AsRef<Path>>(path: P, vocab_size: usize, dropout: f64) -> Result<Self> {
        let reader = File::open(path.as_ref())?;
        let value: Value = serde_json::from_reader(reader)?;
        Self::from_value(value, vocab_size, dropout)
    }

    /// Builds the config from a parsed `config.json`. The vocabulary size is
    /// taken from the tokenizer, since checkpoints are trained after custom
    /// tokens have been added to it.
    pub fn from_value(mut value: Value, vocab_size: usize, dropout: f64) -> Result<Self> {
        if !(0.0..1.0).contains(&dropout) {
            return Err(Error::ConfigError(format!(
                "dropout must be in [0, 1), got {dropout}"
            )));
        }
        let object = value
            .as_object_mut()
            .ok_or_else(|| Error::ConfigError("config.json is not a JSON object".into()))?;
        object.insert("vocab_size".into(), vocab_size.into());
        object.insert("hidden_dropout_prob".into(), dropout.into());
        object.insert("attention_probs_dropout_prob".into(), dropout.into());
        object.insert("num_labels".into(), NUM_LABELS.into());

        let head_config: HeadConfig = serde_json::from_value(value.clone())?;
        let bert_config: BertConfig = serde_json::from_value(value)?;
        Ok(Self {
            bert_config,
            head_config,
        })
    }
}
