// Structural heuristics — shape-of-text signals that need no model.

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::content::ContentItem;
use crate::signals::traits::{SignalProvider, SignalResult};

/// More `!`/`?` than this fraction of the word count is excessive.
const PUNCTUATION_RATIO: f64 = 0.3;
const ALL_CAPS_SCORE: f64 = 0.8;
const ALL_CAPS_MIN_WORDS: usize = 3;

pub struct StructuralHeuristics;

impl StructuralHeuristics {
    pub fn inspect(text: &str) -> SignalResult {
        let mut result = SignalResult::new();
        let words = text.split_whitespace().count();
        if words == 0 {
            return result;
        }

        let punctuation = text.chars().filter(|c| matches!(c, '!' | '?')).count();
        if punctuation as f64 > words as f64 * PUNCTUATION_RATIO {
            result.score_and_flag(
                "excessive_punctuation",
                (punctuation as f64 / words as f64).min(1.0),
            );
        }

        if is_all_caps(text) && words > ALL_CAPS_MIN_WORDS {
            result.score_and_flag("all_caps", ALL_CAPS_SCORE);
        }

        result
    }
}

/// At least one cased character and no lowercase ones.
fn is_all_caps(text: &str) -> bool {
    let mut saw_upper = false;
    for c in text.chars() {
        if c.is_lowercase() {
            return false;
        }
        saw_upper |= c.is_uppercase();
    }
    saw_upper
}

#[async_trait]
impl SignalProvider for StructuralHeuristics {
    fn name(&self) -> &str {
        "structural_heuristics"
    }

    async fn evaluate(&self, item: &ContentItem) -> Result<SignalResult> {
        let text = item
            .as_text()
            .context("structural heuristics only handle text")?;
        Ok(Self::inspect(text))
    }
}
