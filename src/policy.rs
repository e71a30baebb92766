// Decision policy — turns an aggregated verdict into ALLOW / FLAG / BLOCK.
//
// Text and images use different threshold tables with the same shape: a
// list of block rules (confidence threshold plus a set of severe categories)
// and a flag threshold. Once anything is flagged the action is FLAG at
// minimum; no confidence is low enough to fall back to ALLOW.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::content::ContentKind;

/// Outcome for one content item, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationAction {
    Allow,
    Flag,
    Block,
}

impl ModerationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationAction::Allow => "allow",
            ModerationAction::Flag => "flag",
            ModerationAction::Block => "block",
        }
    }
}

impl fmt::Display for ModerationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Block when confidence exceeds `threshold` and any of `categories` is present.
#[derive(Debug, Clone, Copy)]
pub struct BlockRule {
    pub threshold: f64,
    pub categories: &'static [&'static str],
}

impl BlockRule {
    fn matches(&self, confidence: f64, categories: &BTreeMap<String, f64>) -> bool {
        confidence > self.threshold && self.categories.iter().any(|c| categories.contains_key(*c))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PolicyTable {
    pub block_rules: &'static [BlockRule],
    /// Above this a flagged item is a confident FLAG; below it the item is
    /// still flagged, never allowed. Informational only: it is logged, and
    /// no branch of `decide` returns ALLOW for a flagged item.
    pub flag_threshold: f64,
}

pub const TEXT_POLICY: PolicyTable = PolicyTable {
    block_rules: &[BlockRule {
        threshold: 0.8,
        categories: &["threats", "hate_speech", "threat"],
    }],
    flag_threshold: 0.6,
};

pub const IMAGE_POLICY: PolicyTable = PolicyTable {
    block_rules: &[
        BlockRule {
            threshold: 0.8,
            categories: &["high_skin_tone"],
        },
        BlockRule {
            threshold: 0.7,
            categories: &["high_edge_density", "red_dominance"],
        },
    ],
    flag_threshold: 0.5,
};

impl PolicyTable {
    /// The table for a content kind. Video has no table of its own and is
    /// judged like an image.
    pub fn for_kind(kind: ContentKind) -> &'static PolicyTable {
        match kind {
            ContentKind::Text => &TEXT_POLICY,
            ContentKind::Image | ContentKind::Video => &IMAGE_POLICY,
        }
    }

    pub fn decide(
        &self,
        is_appropriate: bool,
        confidence: f64,
        categories: &BTreeMap<String, f64>,
    ) -> ModerationAction {
        if is_appropriate {
            return ModerationAction::Allow;
        }

        if self
            .block_rules
            .iter()
            .any(|rule| rule.matches(confidence, categories))
        {
            return ModerationAction::Block;
        }

        debug!(
            confidence,
            above_flag_threshold = confidence > self.flag_threshold,
            "Flagged below block thresholds"
        );
        ModerationAction::Flag
    }
}

/// Pure decision function over an aggregated verdict.
pub fn decide(
    is_appropriate: bool,
    confidence: f64,
    categories: &BTreeMap<String, f64>,
    kind: ContentKind,
) -> ModerationAction {
    PolicyTable::for_kind(kind).decide(is_appropriate, confidence, categories)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cats(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn appropriate_is_always_allowed() {
        let c = cats(&[("threats", 1.0)]);
        assert_eq!(decide(true, 1.0, &c, ContentKind::Text), ModerationAction::Allow);
    }

    #[test]
    fn text_blocks_only_above_point_eight() {
        let c = cats(&[("threats", 0.8)]);
        assert_eq!(decide(false, 0.8, &c, ContentKind::Text), ModerationAction::Flag);
        let c = cats(&[("threats", 0.81)]);
        assert_eq!(decide(false, 0.81, &c, ContentKind::Text), ModerationAction::Block);
    }

    #[test]
    fn confident_non_severe_text_is_flag() {
        let c = cats(&[("profanity", 0.9)]);
        assert_eq!(decide(false, 0.9, &c, ContentKind::Text), ModerationAction::Flag);
    }

    #[test]
    fn image_second_rule_blocks_above_point_seven() {
        let c = cats(&[("red_dominance", 0.75)]);
        assert_eq!(decide(false, 0.75, &c, ContentKind::Image), ModerationAction::Block);
        let c = cats(&[("high_skin_tone", 0.75)]);
        assert_eq!(decide(false, 0.75, &c, ContentKind::Image), ModerationAction::Flag);
    }

    #[test]
    fn video_uses_image_table() {
        assert!(std::ptr::eq(
            PolicyTable::for_kind(ContentKind::Video),
            PolicyTable::for_kind(ContentKind::Image)
        ));
    }

    #[test]
    fn actions_order_by_severity() {
        assert!(ModerationAction::Allow < ModerationAction::Flag);
        assert!(ModerationAction::Flag < ModerationAction::Block);
        assert_eq!(
            serde_json::to_string(&ModerationAction::Block).unwrap(),
            "\"block\""
        );
    }
}
