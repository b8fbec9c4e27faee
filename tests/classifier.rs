mod common;

use std::fs;
use url_classifier::model::CheckpointLayout;
use url_classifier::{Error, Label, LoadOptions, UrlClassifier};

#[test]
fn predicts_a_valid_label_and_confidence() {
    let dir = common::model_dir(false);
    let classifier = common::load(dir.path());

    for url in [
        "http://example.com",
        "https://secure-login.paypal.com.verify-account.net/index.php?id=1",
        "x",
        "日本語.example",
    ] {
        let prediction = classifier.predict(url).unwrap();
        assert!(matches!(prediction.prediction, Label::Safe | Label::Malicious));
        assert!((0.0..=1.0).contains(&prediction.confidence));
        assert!(prediction.confidence >= 0.5);
    }
}

#[test]
fn probabilities_sum_to_one() {
    let dir = common::model_dir(false);
    let classifier = common::load(dir.path());

    let probs = classifier
        .class_probabilities("http://www.bank.com/login")
        .unwrap();
    assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-5);
    assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));

    let prediction = classifier.predict("http://www.bank.com/login").unwrap();
    let index = match prediction.prediction {
        Label::Safe => 0,
        Label::Malicious => 1,
    };
    assert_eq!(prediction.confidence, probs[index]);
}

#[test]
fn predictions_are_deterministic() {
    let dir = common::model_dir(false);
    let classifier = common::load(dir.path());

    let url = "https://update-account.example.org/verify";
    let first = classifier.predict(url).unwrap();
    for _ in 0..3 {
        assert_eq!(classifier.predict(url).unwrap(), first);
    }

    let reloaded = common::load(dir.path());
    assert_eq!(reloaded.predict(url).unwrap(), first);
}

#[test]
fn long_urls_are_truncated() {
    let dir = common::model_dir(false);
    let classifier = common::load(dir.path());

    let url = format!("http://{}example.com", "login.secure.".repeat(200));
    let prediction = classifier.predict(&url).unwrap();
    assert!((0.0..=1.0).contains(&prediction.confidence));
}

#[test]
fn loads_wrapped_checkpoints() {
    let dir = common::model_dir(true);
    let classifier = common::load(dir.path());
    let probs = classifier.class_probabilities("http://example.com").unwrap();
    assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-5);
}

#[test]
fn detects_checkpoint_layout() {
    use candle_core::{DType, Device};
    use candle_nn::VarBuilder;

    for (wrapped, expected) in [
        (false, CheckpointLayout::Plain),
        (true, CheckpointLayout::Wrapped),
    ] {
        let dir = common::model_dir(wrapped);
        let path = dir.path().join("model.safetensors");
        let vb =
            unsafe { VarBuilder::from_mmaped_safetensors(&[path], DType::F32, &Device::Cpu) }
                .unwrap();
        assert_eq!(CheckpointLayout::detect(&vb), expected);
    }
}

#[test]
fn explicit_weights_path_is_used() {
    let dir = common::model_dir(false);
    let custom = dir.path().join("custom.safetensors");
    fs::rename(dir.path().join("model.safetensors"), &custom).unwrap();

    let options = LoadOptions {
        weights: Some(custom),
        ..LoadOptions::default()
    };
    assert!(UrlClassifier::load(dir.path(), options).is_ok());
}

#[test]
fn missing_checkpoint_fails_to_load() {
    let dir = common::model_dir(false);
    fs::remove_file(dir.path().join("model.safetensors")).unwrap();

    let err = UrlClassifier::load(dir.path(), LoadOptions::default())
        .err()
        .unwrap();
    assert!(matches!(err, Error::MissingFile(_)));
}

#[test]
fn missing_config_fails_to_load() {
    let dir = common::model_dir(false);
    fs::remove_file(dir.path().join("config.json")).unwrap();

    let err = UrlClassifier::load(dir.path(), LoadOptions::default())
        .err()
        .unwrap();
    assert!(matches!(err, Error::MissingFile(_)));
}

#[test]
fn vocabulary_mismatch_fails_to_load() {
    let dir = common::model_dir(false);
    // One extra token grows the embedding matrix past what was trained.
    fs::write(
        dir.path().join("added_tokens.json"),
        format!(r#"{{"[IP]": {}}}"#, common::VOCAB.len()),
    )
    .unwrap();

    let err = UrlClassifier::load(dir.path(), LoadOptions::default())
        .err()
        .unwrap();
    assert!(matches!(err, Error::CandleError(_)));
}

#[test]
fn max_len_beyond_position_embeddings_is_rejected() {
    let dir = common::model_dir(false);
    let options = LoadOptions {
        max_len: 512,
        ..LoadOptions::default()
    };
    let err = UrlClassifier::load(dir.path(), options).err().unwrap();
    assert!(matches!(err, Error::ConfigError(_)));
}

#[test]
fn max_len_without_room_for_content_is_rejected() {
    let dir = common::model_dir(false);
    for max_len in [0, 1, 2] {
        let options = LoadOptions {
            max_len,
            ..LoadOptions::default()
        };
        let err = UrlClassifier::load(dir.path(), options).err().unwrap();
        assert!(matches!(err, Error::ConfigError(_)));
    }
}

#[test]
fn gapped_added_token_ids_fail_to_load() {
    let dir = common::model_dir(false);
    fs::write(dir.path().join("added_tokens.json"), r#"{"[IP]": 40}"#).unwrap();

    let err = UrlClassifier::load(dir.path(), LoadOptions::default())
        .err()
        .unwrap();
    assert!(matches!(err, Error::ConfigError(_)));
}

#[test]
fn loads_pytorch_state_dict() {
    let dir = tempfile::tempdir().unwrap();
    common::write_vocab_and_config(dir.path());
    fs::copy(common::pth_fixture(), dir.path().join("best_model.pt")).unwrap();

    let classifier = common::load(dir.path());
    let probs = classifier.class_probabilities("http://example.com").unwrap();
    assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-5);

    let prediction = classifier.predict("https://secure-login.bank.net/verify").unwrap();
    assert!((0.5..=1.0).contains(&prediction.confidence));
    assert_eq!(
        classifier.predict("https://secure-login.bank.net/verify").unwrap(),
        prediction
    );
}

#[test]
fn detects_wrapped_layout_in_pytorch_state_dict() {
    use candle_core::{DType, Device};
    use candle_nn::VarBuilder;

    let vb = VarBuilder::from_pth(common::pth_fixture(), DType::F32, &Device::Cpu).unwrap();
    assert_eq!(CheckpointLayout::detect(&vb), CheckpointLayout::Wrapped);
}
