// Batch coordinator types — one request carrying a text item, an image
// item, or both, and the folded verdict.
//
// The overall decision has two states only: BLOCK when any item is
// inappropriate, ALLOW otherwise. A flagged item is inappropriate, so a
// batch with any FLAG item is blocked.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::aggregate::AggregatedResult;
use crate::content::{ContentKind, ContentTag};
use crate::error::ModerationError;

#[derive(Debug, Clone, PartialEq)]
pub struct TextRequest {
    pub content: String,
    pub content_type: ContentTag,
}

/// An image is either uploaded or referenced by URL, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    Bytes(Vec<u8>),
    Url(String),
}

impl ImageSource {
    /// Pick the single source from optional upload and URL fields.
    pub fn from_fields(
        bytes: Option<Vec<u8>>,
        url: Option<String>,
    ) -> Result<Option<Self>, ModerationError> {
        let url = url.filter(|u| !u.trim().is_empty());
        match (bytes, url) {
            (Some(_), Some(_)) => Err(ModerationError::validation(
                "provide either an image file or an image URL, not both",
            )),
            (Some(bytes), None) => Ok(Some(ImageSource::Bytes(bytes))),
            (None, Some(url)) => Ok(Some(ImageSource::Url(url))),
            (None, None) => Ok(None),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchRequest {
    pub text: Option<TextRequest>,
    pub image: Option<ImageSource>,
}

impl BatchRequest {
    pub fn new(
        text: Option<TextRequest>,
        image: Option<ImageSource>,
    ) -> Result<Self, ModerationError> {
        if text.is_none() && image.is_none() {
            return Err(ModerationError::validation(
                "batch must contain text content, an image, or both",
            ));
        }
        Ok(Self { text, image })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallDecision {
    Allow,
    Block,
}

impl OverallDecision {
    pub fn fold<'a>(results: impl IntoIterator<Item = &'a AggregatedResult>) -> Self {
        if results.into_iter().any(|r| !r.is_appropriate) {
            OverallDecision::Block
        } else {
            OverallDecision::Allow
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    /// Keyed by content kind ("text", "image", "video").
    pub results: BTreeMap<String, AggregatedResult>,
    pub overall_decision: OverallDecision,
}

impl Default for BatchResult {
    fn default() -> Self {
        Self {
            results: BTreeMap::new(),
            overall_decision: OverallDecision::Allow,
        }
    }
}

impl BatchResult {
    pub fn insert(&mut self, kind: ContentKind, result: AggregatedResult) {
        self.results.insert(kind.as_str().to_string(), result);
    }

    /// Recompute the overall decision from the items present.
    pub fn finish(mut self) -> Self {
        self.overall_decision = OverallDecision::fold(self.results.values());
        self
    }
}
