pub mod config;

use crate::error::Result;
use candle_core::{IndexOp, Tensor};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::BertModel;
use config::ClassifierConfig;

/// Where the HF sequence-classification model sits inside a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointLayout {
    /// `bert.*` and `classifier.*` at the root, as written by `save_pretrained`.
    Plain,
    /// The whole model stored under a `bert` attribute of a wrapper module,
    /// giving `bert.bert.*` and `bert.classifier.*`.
    Wrapped,
}

impl CheckpointLayout {
    pub fn detect(vb: &VarBuilder) -> Self {
        if vb.contains_tensor("bert.bert.embeddings.word_embeddings.weight") {
            Self::Wrapped
        } else {
            Self::Plain
        }
    }

    fn root<'a>(self, vb: VarBuilder<'a>) -> VarBuilder<'a> {
        match self {
            Self::Plain => vb,
            Self::Wrapped => vb.pp("bert"),
        }
    }
}

/// BERT encoder with a pooler and a linear head over the `[CLS]` token.
pub struct BertForSequenceClassification {
    bert: BertModel,
    pooler: Linear,
    classifier: Linear,
    layout: CheckpointLayout,
}

impl BertForSequenceClassification {
    pub fn load(vb: VarBuilder, config: &ClassifierConfig) -> Result<Self> {
        let layout = CheckpointLayout::detect(&vb);
        let vb = layout.root(vb);
        let hidden_size = config.head_config.hidden_size;

        let bert = BertModel::load(vb.pp("bert"), &config.bert_config)?;
        let pooler = candle_nn::linear(hidden_size, hidden_size, vb.pp("bert.pooler.dense"))?;
        let classifier = candle_nn::linear(
            hidden_size,
            config.head_config.num_labels,
            vb.pp("classifier"),
        )?;
        Ok(Self {
            bert,
            pooler,
            classifier,
            layout,
        })
    }

    pub fn layout(&self) -> CheckpointLayout {
        self.layout
    }

    /// Returns `[batch, num_labels]` logits.
    pub fn forward(
        &self,
        input_ids: &Tensor,
        token_type_ids: &Tensor,
        attention_mask: &Tensor,
    ) -> Result<Tensor> {
        let hidden_states = self
            .bert
            .forward(input_ids, token_type_ids, Some(attention_mask))?;
        let cls = hidden_states.i((.., 0))?;
        let pooled = self.pooler.forward(&cls)?.tanh()?;
        Ok(self.classifier.forward(&pooled)?)
    }
}
