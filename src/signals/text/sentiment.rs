// Sentiment as an explicit fallback chain.
//
// Sources are tried in order until one answers. A model-backed source comes
// first when a sentiment classifier loaded; the built-in lexicon always sits
// last and cannot fail, so the chain only errors when it is empty of working
// sources.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::classifier::traits::ClassifierService;

/// Model sentiment only counts when the NEGATIVE label is this confident.
const MODEL_NEGATIVE_THRESHOLD: f64 = 0.8;

/// Lexicon polarity below this is treated as strongly negative.
const LEXICON_POLARITY_THRESHOLD: f64 = -0.5;

/// One way of deciding whether text is strongly negative.
#[async_trait]
pub trait SentimentSource: Send + Sync {
    fn name(&self) -> &str;

    /// `Some(score)` when the text is strongly negative, `None` when it is not.
    async fn negativity(&self, text: &str) -> Result<Option<f64>>;
}

/// Ordered list of sentiment sources; the first to succeed wins.
#[derive(Default)]
pub struct SentimentChain {
    sources: Vec<Box<dyn SentimentSource>>,
}

impl SentimentChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<S: SentimentSource + 'static>(&mut self, source: S) -> &mut Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Ask each source in turn. An empty chain has no opinion.
    pub async fn assess(&self, text: &str) -> Result<Option<f64>> {
        let mut failures = Vec::new();
        for source in &self.sources {
            match source.negativity(text).await {
                Ok(reading) => {
                    debug!(source = source.name(), reading = ?reading, "Sentiment assessed");
                    return Ok(reading);
                }
                Err(e) => {
                    warn!(source = source.name(), error = %e, "Sentiment source failed, trying next");
                    failures.push(format!("{}: {e:#}", source.name()));
                }
            }
        }

        if failures.is_empty() {
            Ok(None)
        } else {
            anyhow::bail!("every sentiment source failed ({})", failures.join("; "))
        }
    }
}

/// Sentiment from a POSITIVE/NEGATIVE classifier.
pub struct ModelSentiment {
    classifier: Arc<dyn ClassifierService>,
}

impl ModelSentiment {
    pub fn new(classifier: Arc<dyn ClassifierService>) -> Self {
        Self { classifier }
    }
}

#[async_trait]
impl SentimentSource for ModelSentiment {
    fn name(&self) -> &str {
        self.classifier.name()
    }

    async fn negativity(&self, text: &str) -> Result<Option<f64>> {
        let labels = self.classifier.evaluate(text).await?;
        Ok(labels
            .iter()
            .find(|l| l.label.eq_ignore_ascii_case("NEGATIVE"))
            .map(|l| l.score)
            .filter(|&score| score > MODEL_NEGATIVE_THRESHOLD))
    }
}

/// Word → polarity in [-1, 1].
const LEXICON: &[(&str, f64)] = &[
    ("awful", -1.0),
    ("terrible", -1.0),
    ("horrible", -1.0),
    ("worst", -1.0),
    ("disgusting", -1.0),
    ("pathetic", -1.0),
    ("evil", -1.0),
    ("nasty", -1.0),
    ("boring", -1.0),
    ("hate", -0.8),
    ("stupid", -0.8),
    ("idiot", -0.8),
    ("annoying", -0.8),
    ("bad", -0.7),
    ("ugly", -0.7),
    ("useless", -0.5),
    ("angry", -0.5),
    ("wrong", -0.5),
    ("lame", -0.5),
    ("sad", -0.5),
    ("failed", -0.5),
    ("poor", -0.4),
    ("dumb", -0.375),
    ("ridiculous", -0.333),
    ("sucks", -0.3),
    ("awesome", 1.0),
    ("excellent", 1.0),
    ("best", 1.0),
    ("wonderful", 1.0),
    ("perfect", 1.0),
    ("beautiful", 0.85),
    ("great", 0.8),
    ("happy", 0.8),
    ("good", 0.7),
    ("amazing", 0.6),
    ("nice", 0.6),
    ("love", 0.5),
    ("interesting", 0.5),
    ("helpful", 0.5),
    ("fantastic", 0.4),
    ("cool", 0.35),
    ("useful", 0.3),
    ("thanks", 0.2),
];

const NEGATIONS: &[&str] = &["not", "never", "no", "isn't", "don't", "doesn't", "wasn't", "can't"];
const INTENSIFIERS: &[&str] = &["very", "really", "extremely", "so", "totally"];

/// Lexical polarity: the mean polarity of the sentiment-bearing words, with
/// a preceding negation flipping and halving a word and a preceding
/// intensifier boosting it by 30%.
pub struct LexiconSentiment {
    lexicon: HashMap<&'static str, f64>,
}

impl Default for LexiconSentiment {
    fn default() -> Self {
        Self::new()
    }
}

impl LexiconSentiment {
    pub fn new() -> Self {
        Self {
            lexicon: LEXICON.iter().copied().collect(),
        }
    }

    /// Polarity in [-1, 1]; 0.0 when no sentiment words are present.
    pub fn polarity(&self, text: &str) -> f64 {
        let lower = text.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !(c.is_alphanumeric() || c == '\''))
            .filter(|w| !w.is_empty())
            .collect();

        let mut total = 0.0;
        let mut count = 0usize;
        for (i, word) in words.iter().enumerate() {
            let Some(&base) = self.lexicon.get(word) else {
                continue;
            };
            let mut value = base;
            if let Some(prev) = i.checked_sub(1).map(|p| words[p]) {
                if INTENSIFIERS.contains(&prev) {
                    value *= 1.3;
                    if let Some(before) = i.checked_sub(2).map(|p| words[p]) {
                        if NEGATIONS.contains(&before) {
                            value *= -0.5;
                        }
                    }
                } else if NEGATIONS.contains(&prev) {
                    value *= -0.5;
                }
            }
            total += value.clamp(-1.0, 1.0);
            count += 1;
        }

        if count == 0 {
            0.0
        } else {
            total / count as f64
        }
    }
}

#[async_trait]
impl SentimentSource for LexiconSentiment {
    fn name(&self) -> &str {
        "lexicon"
    }

    async fn negativity(&self, text: &str) -> Result<Option<f64>> {
        let polarity = self.polarity(text);
        Ok((polarity < LEXICON_POLARITY_THRESHOLD).then(|| polarity.abs()))
    }
}
