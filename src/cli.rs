use crate::classifier::LoadOptions;
use crate::device::DeviceRequest;
use crate::error::Result;
use crate::model::config::{DEFAULT_DROPOUT, MAX_LEN};
use clap::Parser;
use std::path::PathBuf;

/// Serves a fine-tuned BERT classifier that labels URLs as safe or malicious.
#[derive(Parser, Debug)]
#[command(name = "url-classifier", version, about)]
pub struct Cli {
    /// Directory holding config.json, the tokenizer files and the checkpoint.
    #[arg(long, env = "MODEL_PATH")]
    pub model_dir: PathBuf,

    /// Checkpoint to load instead of searching the model directory.
    #[arg(long, env = "WEIGHTS_FILE")]
    pub weights: Option<PathBuf>,

    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, default_value_t = 5055)]
    pub port: u16,

    /// auto, cpu, cuda or cuda:N
    #[arg(long, default_value_t = DeviceRequest::Auto)]
    pub device: DeviceRequest,

    #[arg(long, default_value_t = MAX_LEN)]
    pub max_len: usize,

    #[arg(long, default_value_t = DEFAULT_DROPOUT)]
    pub dropout: f64,
}

impl Cli {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Resolves the device once; it stays fixed for the process lifetime.
    pub fn load_options(&self) -> Result<LoadOptions> {
        Ok(LoadOptions {
            device: self.device.resolve()?,
            max_len: self.max_len,
            dropout: self.dropout,
            weights: self.weights.clone(),
        })
    }
}
