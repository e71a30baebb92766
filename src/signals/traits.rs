// Signal provider trait — the contract every detector satisfies.
//
// A provider looks at one content item and reports category scores plus the
// reasons it considers the content inappropriate. It never touches shared
// state; anything it needs (a classifier, a detector) is handed to it at
// construction time.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use async_trait::async_trait;

use crate::content::ContentItem;

/// The partial verdict of a single provider invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalResult {
    /// Category name to score, always within [0, 1].
    pub categories: BTreeMap<String, f64>,
    pub flagged_reasons: BTreeSet<String>,
    /// A soft failure: the provider ran but could not produce signals.
    pub error: Option<String>,
    /// Steps that failed while the provider still produced signals, e.g. a
    /// classifier outage that fell back to the lexicon.
    pub degraded: Vec<String>,
}

impl SignalResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    /// Record a category score, clamping it into [0, 1]. NaN is treated as 0.
    pub fn score(&mut self, category: &str, score: f64) {
        let score = if score.is_nan() {
            0.0
        } else {
            score.clamp(0.0, 1.0)
        };
        self.categories.insert(category.to_string(), score);
    }

    /// Note a failed step without discarding the rest of the result.
    pub fn degrade(&mut self, message: impl Into<String>) {
        self.degraded.push(message.into());
    }

    pub fn flag(&mut self, reason: &str) {
        self.flagged_reasons.insert(reason.to_string());
    }

    /// Record a score and flag the same name as a reason.
    pub fn score_and_flag(&mut self, category: &str, score: f64) {
        self.score(category, score);
        self.flag(category);
    }

    /// Builder form of `score_and_flag`, handy for fixed-result rules.
    pub fn flagged(mut self, category: &str, score: f64) -> Self {
        self.score_and_flag(category, score);
        self
    }

    pub fn is_flagged(&self) -> bool {
        !self.flagged_reasons.is_empty()
    }
}

/// Trait for a single moderation signal. Implementations must be async
/// because some of them call out to models or remote services.
#[async_trait]
pub trait SignalProvider: Send + Sync {
    /// Stable name used in logs and error lists.
    fn name(&self) -> &str;

    /// Evaluate one item. Returning `Err` (or a result with `error` set)
    /// drops this provider's signals for the item without flagging it.
    async fn evaluate(&self, item: &ContentItem) -> Result<SignalResult>;
}
