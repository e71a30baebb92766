// Aggregator — merge provider results into one verdict for an item.
//
// Category scores merge by per-key maximum and reasons by set union, so the
// merge is commutative and associative: provider completion order cannot
// change the outcome. Confidence is the largest merged score.
//
// When nothing produced a usable result the item fails closed: it is marked
// inappropriate with a single `processing_error` category and sent to FLAG.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::content::ContentKind;
use crate::policy::{decide, ModerationAction};
use crate::signals::scheduler::FanOutOutcome;
use crate::signals::traits::SignalResult;

pub const PROCESSING_ERROR: &str = "processing_error";

/// Merged categories and reasons before a decision is made.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Merged {
    pub categories: BTreeMap<String, f64>,
    pub flagged_reasons: BTreeSet<String>,
}

impl Merged {
    pub fn absorb(&mut self, result: &SignalResult) {
        for (category, &score) in &result.categories {
            self.categories
                .entry(category.clone())
                .and_modify(|existing| *existing = existing.max(score))
                .or_insert(score);
        }
        self.flagged_reasons
            .extend(result.flagged_reasons.iter().cloned());
    }

    /// Combine two partial merges.
    pub fn combine(mut self, other: Merged) -> Merged {
        self.absorb(&SignalResult {
            categories: other.categories,
            flagged_reasons: other.flagged_reasons,
            ..SignalResult::default()
        });
        self
    }

    pub fn confidence(&self) -> f64 {
        self.categories.values().copied().fold(0.0, f64::max)
    }
}

pub fn merge<'a>(results: impl IntoIterator<Item = &'a SignalResult>) -> Merged {
    let mut merged = Merged::default();
    for result in results {
        merged.absorb(result);
    }
    merged
}

/// The verdict returned to the caller for one content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResult {
    pub is_appropriate: bool,
    pub confidence: f64,
    pub categories: BTreeMap<String, f64>,
    pub flagged_reasons: BTreeSet<String>,
    pub moderation_action: ModerationAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl AggregatedResult {
    /// Apply the decision policy to a merge.
    pub fn decide(merged: Merged, kind: ContentKind, errors: Vec<String>) -> Self {
        let confidence = merged.confidence();
        let is_appropriate = merged.flagged_reasons.is_empty();
        let moderation_action = decide(is_appropriate, confidence, &merged.categories, kind);
        Self {
            is_appropriate,
            confidence,
            categories: merged.categories,
            flagged_reasons: merged.flagged_reasons,
            moderation_action,
            errors: (!errors.is_empty()).then_some(errors),
        }
    }

    /// Fail-closed verdict for an item nothing could evaluate.
    pub fn total_failure(errors: Vec<String>) -> Self {
        Self {
            is_appropriate: false,
            confidence: 0.0,
            categories: BTreeMap::from([(PROCESSING_ERROR.to_string(), 1.0)]),
            flagged_reasons: BTreeSet::from([PROCESSING_ERROR.to_string()]),
            moderation_action: ModerationAction::Flag,
            errors: Some(errors),
        }
    }

    pub fn is_total_failure(&self) -> bool {
        self.categories.contains_key(PROCESSING_ERROR) && self.confidence == 0.0
    }
}

/// Turn a fan-out into the verdict for an item of `kind`.
pub fn aggregate(kind: ContentKind, outcome: FanOutOutcome) -> AggregatedResult {
    let mut errors = outcome.error_strings();
    if outcome.is_total_failure() {
        if errors.is_empty() {
            errors.push(format!("no signal providers registered for {kind}"));
        }
        return AggregatedResult::total_failure(errors);
    }
    AggregatedResult::decide(merge(&outcome.results), kind, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;

    #[test]
    fn max_wins_per_category() {
        let a = SignalResult::new().flagged("profanity", 0.3);
        let b = SignalResult::new().flagged("profanity", 0.6);
        let merged = merge([&a, &b]);
        assert_eq!(merged.categories["profanity"], 0.6);
        assert_eq!(merged.confidence(), 0.6);
    }

    #[test]
    fn empty_merge_has_zero_confidence() {
        assert_eq!(merge(&Vec::new()).confidence(), 0.0);
    }

    #[test]
    fn unflagged_categories_are_still_allowed() {
        let mut r = SignalResult::new();
        r.score("insult", 0.65);
        let verdict = AggregatedResult::decide(merge([&r]), ContentKind::Text, Vec::new());
        assert!(verdict.is_appropriate);
        assert_eq!(verdict.moderation_action, ModerationAction::Allow);
        assert_eq!(verdict.confidence, 0.65);
        assert!(verdict.errors.is_none());
    }

    #[test]
    fn partial_failure_keeps_errors_without_flagging() {
        let outcome = FanOutOutcome {
            results: vec![SignalResult::new()],
            errors: vec![ProviderError::timed_out("classifier")],
            ..Default::default()
        };
        let verdict = aggregate(ContentKind::Text, outcome);
        assert!(verdict.is_appropriate);
        assert_eq!(verdict.errors, Some(vec!["classifier: timed out".to_string()]));
    }

    #[test]
    fn no_results_fails_closed() {
        let outcome = FanOutOutcome {
            results: vec![],
            errors: vec![ProviderError::failed("color", "boom")],
            ..Default::default()
        };
        let verdict = aggregate(ContentKind::Image, outcome);
        assert!(verdict.is_total_failure());
        assert!(!verdict.is_appropriate);
        assert_eq!(verdict.moderation_action, ModerationAction::Flag);
        assert_eq!(verdict.errors, Some(vec!["color: boom".to_string()]));
    }

    #[test]
    fn serialized_shape() {
        let verdict = AggregatedResult::decide(
            merge([&SignalResult::new().flagged("spam", 0.4)]),
            ContentKind::Text,
            Vec::new(),
        );
        let json = serde_json::to_value(&verdict).unwrap();
        assert_eq!(json["moderation_action"], "flag");
        assert_eq!(json["flagged_reasons"], serde_json::json!(["spam"]));
        assert!(json.get("errors").is_none());
    }
}
