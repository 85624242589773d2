use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub mod lexicon;

pub use lexicon::LexiconModel;

/// Longest input (in whitespace tokens) a model is asked to score; longer
/// comments are truncated, never rejected.
pub const MAX_INPUT_TOKENS: usize = 512;

/// The three-way label attached to reviews.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
        }
    }
}

/// The five-way class distribution produced by the backing model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentimentClass {
    VeryNegative,
    Negative,
    Neutral,
    Positive,
    VeryPositive,
}

/// Argmax class and its confidence score.
#[derive(Debug, Clone, Copy)]
pub struct Prediction {
    pub class: SentimentClass,
    pub score: f64,
}

/// Backing model boundary. `predict` is synchronous and may be expensive;
/// the analyzer runs it on a blocking thread.
pub trait SentimentModel: Send + Sync {
    fn predict(&self, text: &str) -> anyhow::Result<Prediction>;
}

/// Model that scores everything as fully neutral.
pub struct NeutralModel;

impl SentimentModel for NeutralModel {
    fn predict(&self, _text: &str) -> anyhow::Result<Prediction> {
        Ok(Prediction {
            class: SentimentClass::Neutral,
            score: 1.0,
        })
    }
}

/// Wraps a model with input truncation, the five-to-three label mapping,
/// a call timeout, and fallback to neutral on any model failure.
pub struct SentimentAnalyzer {
    model: Arc<dyn SentimentModel>,
    timeout: Duration,
}

impl SentimentAnalyzer {
    pub fn new(model: Arc<dyn SentimentModel>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    /// Classify `text`. Runs the model on every call; identical inputs are
    /// never served from a cache. Infallible: a failing or hung model yields
    /// `neutral` rather than failing the surrounding write.
    pub async fn classify(&self, text: &str) -> SentimentLabel {
        let input = truncate_tokens(text, MAX_INPUT_TOKENS);
        let model = Arc::clone(&self.model);
        let call = tokio::task::spawn_blocking(move || model.predict(&input));

        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(Ok(prediction))) => map_prediction(prediction),
            Ok(Ok(Err(e))) => {
                tracing::warn!(error = %e, "sentiment model failed; labeling neutral");
                SentimentLabel::Neutral
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "sentiment task panicked; labeling neutral");
                SentimentLabel::Neutral
            }
            Err(_) => {
                tracing::warn!(timeout_ms = self.timeout.as_millis() as u64, "sentiment model timed out; labeling neutral");
                SentimentLabel::Neutral
            }
        }
    }
}

/// Collapse the five-way prediction to a label. Anything without a confident
/// polarity (score <= 0.5), including ties and the neutral class itself,
/// lands on neutral.
fn map_prediction(p: Prediction) -> SentimentLabel {
    use SentimentClass::*;
    match p.class {
        Positive | VeryPositive if p.score > 0.5 => SentimentLabel::Positive,
        Negative | VeryNegative if p.score > 0.5 => SentimentLabel::Negative,
        _ => SentimentLabel::Neutral,
    }
}

fn truncate_tokens(text: &str, max: usize) -> String {
    let mut tokens = text.split_whitespace();
    let head: Vec<&str> = tokens.by_ref().take(max).collect();
    if tokens.next().is_none() {
        text.to_string()
    } else {
        head.join(" ")
    }
}
