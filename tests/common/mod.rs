//! Builds a tiny randomly initialised BERT classifier on disk so the real
//! loader and router can be exercised without a trained checkpoint.

#![allow(dead_code)]

use candle_core::{DType, Device};
use candle_nn::{VarBuilder, VarMap};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use url_classifier::model::config::ClassifierConfig;
use url_classifier::model::BertForSequenceClassification;
use url_classifier::{LoadOptions, UrlClassifier};

pub const VOCAB: &[&str] = &[
    "[PAD]", "[UNK]", "[CLS]", "[SEP]", "[MASK]", "http", "https", ":", "/", ".", "-", "?", "=",
    "com", "net", "org", "www", "example", "login", "secure", "account", "verify", "bank",
    "paypal", "##s", "##ing", "update", "index", "php",
];

pub fn config_json() -> Value {
    json!({
        "architectures": ["BertForSequenceClassification"],
        "model_type": "bert",
        "vocab_size": VOCAB.len(),
        "hidden_size": 8,
        "num_hidden_layers": 1,
        "num_attention_heads": 2,
        "intermediate_size": 16,
        "hidden_act": "gelu",
        "hidden_dropout_prob": 0.1,
        "attention_probs_dropout_prob": 0.1,
        "max_position_embeddings": 128,
        "type_vocab_size": 2,
        "initializer_range": 0.02,
        "layer_norm_eps": 1e-12,
        "pad_token_id": 0,
        "position_embedding_type": "absolute",
        "use_cache": true,
        "classifier_dropout": null
    })
}

pub fn write_vocab_and_config(dir: &Path) {
    fs::write(dir.join("vocab.txt"), VOCAB.join("\n")).unwrap();
    fs::write(
        dir.join("config.json"),
        serde_json::to_string_pretty(&config_json()).unwrap(),
    )
    .unwrap();
}

/// PyTorch zip checkpoint of the same architecture, saved from a wrapper module
/// (`bert.bert.*`); regenerate with `tests/fixtures/make_wrapped_pth.py`.
pub fn pth_fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/wrapped_best_model.pt")
}

/// Writes `vocab.txt`, `config.json` and `model.safetensors`. With `wrapped`
/// the weights are nested one level deeper under `bert`, the way a training
/// wrapper module saves its state dict.
pub fn write_model(dir: &Path, wrapped: bool) {
    write_vocab_and_config(dir);

    let config = ClassifierConfig::from_value(config_json(), VOCAB.len(), 0.3).unwrap();
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
    let vb = if wrapped { vb.pp("bert") } else { vb };
    BertForSequenceClassification::load(vb, &config).unwrap();
    varmap.save(dir.join("model.safetensors")).unwrap();
}

pub fn model_dir(wrapped: bool) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_model(dir.path(), wrapped);
    dir
}

pub fn load(dir: &Path) -> UrlClassifier {
    UrlClassifier::load(dir, LoadOptions::default()).unwrap()
}
