//! Loading of the URL tokenizer.
//!
//! A model directory either ships a serialized `tokenizer.json`, or the plain
//! BERT files (`vocab.txt`, optionally `added_tokens.json` and
//! `tokenizer_config.json`) from which an equivalent WordPiece tokenizer is
//! assembled. Either way the result always emits exactly `max_len` tokens.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use tokenizers::models::wordpiece::WordPiece;
use tokenizers::normalizers::{BertNormalizer, NormalizerWrapper};
use tokenizers::pre_tokenizers::{bert::BertPreTokenizer, PreTokenizerWrapper};
use tokenizers::processors::{bert::BertProcessing, PostProcessorWrapper};
use tokenizers::{
    AddedToken, PaddingParams, PaddingStrategy, PostProcessor, Tokenizer, TruncationParams,
};

pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const VOCAB_FILE: &str = "vocab.txt";
pub const ADDED_TOKENS_FILE: &str = "added_tokens.json";
pub const TOKENIZER_CONFIG_FILE: &str = "tokenizer_config.json";

const UNK_TOKEN: &str = "[UNK]";
const CLS_TOKEN: &str = "[CLS]";
const SEP_TOKEN: &str = "[SEP]";
const PAD_TOKEN: &str = "[PAD]";

#[derive(Debug, Deserialize)]
struct TokenizerSettings {
    #[serde(default = "default_lower_case")]
    do_lower_case: bool,
}

fn default_lower_case() -> bool {
    true
}

impl Default for TokenizerSettings {
    fn default() -> Self {
        Self {
            do_lower_case: default_lower_case(),
        }
    }
}

pub fn load_tokenizer(dir: &Path, max_len: usize) -> Result<Tokenizer> {
    let json_path = dir.join(TOKENIZER_FILE);
    let mut tokenizer = if json_path.exists() {
        tracing::debug!("loading tokenizer from {}", json_path.display());
        Tokenizer::from_file(&json_path)?
    } else {
        wordpiece_from_vocab(dir)?
    };
    let special = tokenizer
        .get_post_processor()
        .map_or(0, |processor| processor.added_tokens(false));
    if max_len <= special {
        return Err(Error::ConfigError(format!(
            "max_len {max_len} leaves no room next to {special} special tokens"
        )));
    }
    fix_length(&mut tokenizer, max_len)?;
    Ok(tokenizer)
}

fn wordpiece_from_vocab(dir: &Path) -> Result<Tokenizer> {
    let vocab_path = dir.join(VOCAB_FILE);
    if !vocab_path.exists() {
        return Err(Error::MissingFile(vocab_path));
    }
    let vocab = vocab_path
        .to_str()
        .ok_or_else(|| Error::ConfigError(format!("non UTF-8 path {}", vocab_path.display())))?;
    tracing::debug!("building WordPiece tokenizer from {}", vocab);

    let settings = read_settings(dir)?;
    let wordpiece = WordPiece::from_file(vocab)
        .unk_token(UNK_TOKEN.to_string())
        .build()?;
    let mut tokenizer = Tokenizer::new(wordpiece);

    let cls = special_token_id(&tokenizer, CLS_TOKEN)?;
    let sep = special_token_id(&tokenizer, SEP_TOKEN)?;
    tokenizer
        .with_normalizer(Some(NormalizerWrapper::from(BertNormalizer::new(
            true,
            true,
            None,
            settings.do_lower_case,
        ))))
        .with_pre_tokenizer(Some(PreTokenizerWrapper::from(BertPreTokenizer)))
        .with_post_processor(Some(PostProcessorWrapper::from(BertProcessing::new(
            (SEP_TOKEN.to_string(), sep),
            (CLS_TOKEN.to_string(), cls),
        ))));

    let added = read_added_tokens(dir)?;
    if !added.is_empty() {
        let tokens: Vec<AddedToken> = added
            .iter()
            .map(|(content, _)| AddedToken::from(content.clone(), false))
            .collect();
        let count = tokenizer.add_tokens(&tokens);
        for (content, declared) in &added {
            let assigned = tokenizer.token_to_id(content);
            if assigned != Some(*declared) {
                return Err(Error::ConfigError(format!(
                    "added token {content} declared with id {declared} but got {assigned:?}"
                )));
            }
        }
        tracing::info!("registered {} added tokens", count);
    }
    Ok(tokenizer)
}

fn read_settings(dir: &Path) -> Result<TokenizerSettings> {
    let path = dir.join(TOKENIZER_CONFIG_FILE);
    if !path.exists() {
        return Ok(TokenizerSettings::default());
    }
    Ok(serde_json::from_reader(File::open(path)?)?)
}

/// Tokens from `added_tokens.json` with their declared ids, ordered by id so
/// they are appended to the vocabulary in the positions they had in training.
fn read_added_tokens(dir: &Path) -> Result<Vec<(String, u32)>> {
    let path = dir.join(ADDED_TOKENS_FILE);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let tokens: HashMap<String, u32> = serde_json::from_reader(File::open(path)?)?;
    let mut tokens: Vec<(String, u32)> = tokens.into_iter().collect();
    tokens.sort_by_key(|(_, id)| *id);
    Ok(tokens)
}

fn special_token_id(tokenizer: &Tokenizer, token: &str) -> Result<u32> {
    tokenizer
        .token_to_id(token)
        .ok_or_else(|| Error::ConfigError(format!("vocabulary has no {token} token")))
}

fn fix_length(tokenizer: &mut Tokenizer, max_len: usize) -> Result<()> {
    let pad_id = tokenizer.token_to_id(PAD_TOKEN).unwrap_or(0);
    tokenizer
        .with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::Fixed(max_len),
            pad_id,
            pad_token: PAD_TOKEN.to_string(),
            ..Default::default()
        }))
        .with_truncation(Some(TruncationParams {
            max_length: max_len,
            ..Default::default()
        }))?;
    Ok(())
}
