// Pattern-match provider — weighted regex lexicons over the raw text.
//
// Each category counts its non-overlapping matches and scores
// `min(count * weight, 1.0)`. Any match flags the category by name.

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex_lite::Regex;

use crate::content::ContentItem;
use crate::signals::traits::{SignalProvider, SignalResult};

struct CategorySpec {
    name: &'static str,
    weight: f64,
    patterns: &'static [&'static str],
}

const CATEGORIES: [CategorySpec; 4] = [
    CategorySpec {
        name: "profanity",
        weight: 0.3,
        patterns: &[
            r"\b(fuck(?:ing|ed|er|s)?|shit(?:ty|s)?|bitch(?:es)?|asshole|dick|pussy|cunt)\b",
            r"\b(nigger|faggot|retard|whore|slut)\b",
            r"\b(kill yourself|kys|stfu|gtfo)\b",
        ],
    },
    CategorySpec {
        name: "hate_speech",
        weight: 0.5,
        patterns: &[
            r"\b(all\s+(white|black|jews|muslims|gays))\s+(are|should)\b",
            r"\b(white\s+supremacy|racial\s+superiority)\b",
            r"\b(hitler|nazi|fascist)\b",
            r"\b(genocide|ethnic\s+cleansing)\b",
        ],
    },
    CategorySpec {
        name: "threats",
        weight: 0.6,
        patterns: &[
            r"\b(i\s+will\s+kill|i\s+want\s+to\s+kill)\b",
            r"\b(bomb|shoot|attack|murder)\s+(you|them|everyone)\b",
            r"\b(die|death|suicide)\b",
        ],
    },
    CategorySpec {
        name: "spam",
        weight: 0.4,
        patterns: &[
            r"\b(buy\s+now|click\s+here|free\s+money|make\s+money\s+fast)\b",
            r"\b(viagra|casino|lottery|winner)\b",
            r"(http|www)\.[^\s]+",
            r"\b(bit\.ly|tinyurl|goo\.gl)\b",
        ],
    },
];

struct CompiledCategory {
    name: &'static str,
    weight: f64,
    regex: Regex,
}

/// Regex lexicon provider for profanity, hate speech, threats and spam.
pub struct PatternProvider {
    categories: Vec<CompiledCategory>,
}

impl PatternProvider {
    /// Compile every category's patterns into one case-insensitive regex.
    pub fn new() -> Result<Self> {
        let categories = CATEGORIES
            .iter()
            .map(|spec| {
                let source = format!("(?i){}", spec.patterns.join("|"));
                let regex = Regex::new(&source)
                    .with_context(|| format!("Invalid {} pattern", spec.name))?;
                Ok(CompiledCategory {
                    name: spec.name,
                    weight: spec.weight,
                    regex,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { categories })
    }

    /// Score text directly, without going through a content item.
    pub fn scan(&self, text: &str) -> SignalResult {
        let mut result = SignalResult::new();
        for category in &self.categories {
            let matches = category.regex.find_iter(text).count();
            if matches > 0 {
                result.score_and_flag(category.name, (matches as f64 * category.weight).min(1.0));
            }
        }
        result
    }
}

#[async_trait]
impl SignalProvider for PatternProvider {
    fn name(&self) -> &str {
        "patterns"
    }

    async fn evaluate(&self, item: &ContentItem) -> Result<SignalResult> {
        let text = item
            .as_text()
            .context("pattern provider only handles text")?;
        Ok(self.scan(text))
    }
}
