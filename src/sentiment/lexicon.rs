use super::{Prediction, SentimentClass, SentimentModel};

/// Deterministic word-list scorer standing in for a pretrained model.
///
/// Counts polar terms in the input and emits the dominant side with a
/// confidence that grows with the margin between positive and negative hits.
/// A text with no polar terms, or a tie, scores as neutral.
pub struct LexiconModel;

const POSITIVE: &[&str] = &[
    "amazing", "awesome", "beautiful", "best", "brilliant", "captivating",
    "compelling", "delightful", "engaging", "enjoyable", "excellent",
    "fantastic", "favorite", "fun", "good", "great", "gripping", "inspiring",
    "love", "loved", "lovely", "magnificent", "masterpiece", "memorable",
    "outstanding", "perfect", "powerful", "recommend", "recommended",
    "refreshing", "remarkable", "rewarding", "satisfying", "stunning",
    "superb", "touching", "unforgettable", "wonderful",
];

const NEGATIVE: &[&str] = &[
    "annoying", "awful", "bad", "boring", "confusing", "disappointed",
    "disappointing", "dreadful", "dull", "flat", "forgettable", "hate",
    "hated", "horrible", "lame", "mediocre", "mess", "painful", "pointless",
    "poor", "predictable", "regret", "shallow", "slow", "sloppy", "terrible",
    "tedious", "unbearable", "uninspired", "unreadable", "waste", "weak",
    "worst", "worthless",
];

impl LexiconModel {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LexiconModel {
    fn default() -> Self {
        Self::new()
    }
}

impl SentimentModel for LexiconModel {
    fn predict(&self, text: &str) -> anyhow::Result<Prediction> {
        let mut pos = 0usize;
        let mut neg = 0usize;

        for raw in text.split_whitespace() {
            let word: String = raw
                .chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(|c| c.to_lowercase())
                .collect();
            if POSITIVE.contains(&word.as_str()) {
                pos += 1;
            } else if NEGATIVE.contains(&word.as_str()) {
                neg += 1;
            }
        }

        let total = pos + neg;
        if total == 0 {
            return Ok(Prediction {
                class: SentimentClass::Neutral,
                score: 1.0,
            });
        }

        let margin = (pos as f64 - neg as f64).abs() / total as f64;
        let score = 0.5 + 0.45 * margin;
        let class = if pos > neg {
            if neg == 0 && pos >= 2 {
                SentimentClass::VeryPositive
            } else {
                SentimentClass::Positive
            }
        } else if neg > pos {
            if pos == 0 && neg >= 2 {
                SentimentClass::VeryNegative
            } else {
                SentimentClass::Negative
            }
        } else {
            SentimentClass::Neutral
        };

        Ok(Prediction { class, score })
    }
}
