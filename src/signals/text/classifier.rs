// Classifier-adapter provider — turns an external label → score classifier
// into moderation signals, then adds the sentiment chain's verdict.
//
// Labels above 0.5 become categories. A label is additionally flagged only if
// it is one of the severe toxicity labels and scores above 0.7.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::warn;

use crate::classifier::traits::ClassifierService;
use crate::content::ContentItem;
use crate::signals::traits::{SignalProvider, SignalResult};

use super::sentiment::SentimentChain;

const CATEGORY_THRESHOLD: f64 = 0.5;
const FLAG_THRESHOLD: f64 = 0.7;

/// Labels that may be promoted to flagged reasons.
pub const SEVERE_LABELS: [&str; 6] = [
    "toxic",
    "severe_toxic",
    "obscene",
    "threat",
    "insult",
    "identity_hate",
];

pub struct ClassifierAdapter {
    toxicity: Option<Arc<dyn ClassifierService>>,
    sentiment: SentimentChain,
}

impl ClassifierAdapter {
    pub fn new(toxicity: Option<Arc<dyn ClassifierService>>, sentiment: SentimentChain) -> Self {
        Self {
            toxicity,
            sentiment,
        }
    }

    pub async fn classify(&self, text: &str) -> Result<SignalResult> {
        let mut result = SignalResult::new();

        if let Some(classifier) = &self.toxicity {
            match classifier.evaluate(text).await {
                Ok(labels) => {
                    for label in labels.iter().filter(|l| l.score > CATEGORY_THRESHOLD) {
                        result.score(&label.label, label.score);
                        if label.score > FLAG_THRESHOLD
                            && SEVERE_LABELS.contains(&label.label.as_str())
                        {
                            result.flag(&label.label);
                        }
                    }
                }
                // An outage leaves the sentiment chain as the only signal.
                Err(e) => {
                    warn!(
                        classifier = classifier.name(),
                        error = %format!("{e:#}"),
                        "Toxicity classifier failed, falling back to sentiment"
                    );
                    result.degrade(format!("{} classifier failed: {e:#}", classifier.name()));
                }
            }
        }

        if let Some(negativity) = self.sentiment.assess(text).await? {
            result.score_and_flag("negative_sentiment", negativity);
        }

        Ok(result)
    }
}

#[async_trait]
impl SignalProvider for ClassifierAdapter {
    fn name(&self) -> &str {
        "classifier"
    }

    async fn evaluate(&self, item: &ContentItem) -> Result<SignalResult> {
        let text = item
            .as_text()
            .context("classifier provider only handles text")?;
        self.classify(text).await
    }
}
