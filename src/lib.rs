pub mod classifier;
pub mod cli;
pub mod device;
pub mod error;
pub mod model;
pub mod server;
pub mod tokenizer;

pub use classifier::{Label, LoadOptions, Prediction, UrlClassifier};
pub use error::{Error, Result};
