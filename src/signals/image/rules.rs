// Structural rules — dimension, aspect ratio and file size checks.
//
// The rules are evaluated in order and only the first match is reported.

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::content::{ContentItem, ImagePayload};
use crate::signals::traits::{SignalProvider, SignalResult};

const MIN_DIMENSION: u32 = 50;
const MAX_DIMENSION: u32 = 5000;
const MAX_ASPECT: f64 = 10.0;
const MIN_ASPECT: f64 = 0.1;
const MIN_FILE_BYTES: usize = 1000;

pub struct StructuralRuleProvider;

impl StructuralRuleProvider {
    pub fn inspect(image: &ImagePayload) -> SignalResult {
        let (w, h) = (image.width(), image.height());
        let aspect = if h == 0 { f64::INFINITY } else { w as f64 / h as f64 };

        let hit = if w < MIN_DIMENSION || h < MIN_DIMENSION {
            Some(("suspicious_size", 0.8))
        } else if w > MAX_DIMENSION || h > MAX_DIMENSION {
            Some(("oversized", 0.6))
        } else if aspect > MAX_ASPECT || aspect < MIN_ASPECT {
            Some(("unusual_aspect", 0.5))
        } else if image.byte_len < MIN_FILE_BYTES {
            Some(("very_small_file", 0.7))
        } else {
            None
        };

        match hit {
            Some((rule, score)) => SignalResult::new().flagged(rule, score),
            None => SignalResult::new(),
        }
    }
}

#[async_trait]
impl SignalProvider for StructuralRuleProvider {
    fn name(&self) -> &str {
        "structural_rules"
    }

    async fn evaluate(&self, item: &ContentItem) -> Result<SignalResult> {
        let image = item
            .as_image()
            .context("structural rules only handle images")?;
        Ok(Self::inspect(image))
    }
}
