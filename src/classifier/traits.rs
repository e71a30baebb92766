// Classifier service trait — the swap-ready abstraction over text models.
//
// A classifier turns text into a list of (label, score) pairs. The default
// implementation is a local ONNX toxic-bert model; Google's Perspective API
// is available as a remote alternative. Signal providers only ever see this
// trait, so backends can change without touching the aggregation path.

use anyhow::Result;
use async_trait::async_trait;

/// One label emitted by a classifier, with a probability in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

impl LabelScore {
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// Trait for label → score text classifiers. Async because most backends
/// either call an HTTP API or offload inference to a blocking thread.
#[async_trait]
pub trait ClassifierService: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Classify a single text.
    async fn evaluate(&self, text: &str) -> Result<Vec<LabelScore>>;
}

/// Fixed-output classifier. Useful as a stand-in when wiring the pipeline
/// without a model, and in tests.
pub struct StaticClassifier {
    labels: Vec<LabelScore>,
}

impl StaticClassifier {
    pub fn new(labels: Vec<LabelScore>) -> Self {
        Self { labels }
    }
}

#[async_trait]
impl ClassifierService for StaticClassifier {
    fn name(&self) -> &str {
        "static"
    }

    async fn evaluate(&self, _text: &str) -> Result<Vec<LabelScore>> {
        Ok(self.labels.clone())
    }
}
