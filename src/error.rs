use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("tokenizer error: {0}")]
    TokenizerError(tokenizers::Error),
    #[error("candle error: {0}")]
    CandleError(#[from] candle_core::Error),
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("missing model file: {}", .0.display())]
    MissingFile(PathBuf),
    #[error("config error: {0}")]
    ConfigError(String),
}

// tokenizers::Error is a `Box<dyn Error>`, which doesn't implement Error itself
// and so can't be a #[source].
impl From<tokenizers::Error> for Error {
    fn from(err: tokenizers::Error) -> Self {
        Self::TokenizerError(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
