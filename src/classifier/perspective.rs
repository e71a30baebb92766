// Google Perspective API classifier.
//
// Perspective scores text for toxicity, insults, threats and so on. It is
// free but rate-limited to ~1 QPS. Its attribute names are mapped onto the
// toxic-bert label vocabulary so the classifier adapter treats both
// backends identically.
//
// API docs: https://developers.perspectiveapi.com/s/about-the-api-methods

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::rate_limiter::RateLimiter;
use super::traits::{ClassifierService, LabelScore};
use crate::output::truncate_chars;

/// Perspective attribute → toxic-bert label.
const ATTRIBUTE_LABELS: [(&str, &str); 6] = [
    ("TOXICITY", "toxic"),
    ("SEVERE_TOXICITY", "severe_toxic"),
    ("PROFANITY", "obscene"),
    ("THREAT", "threat"),
    ("INSULT", "insult"),
    ("IDENTITY_ATTACK", "identity_hate"),
];

const DEFAULT_ENDPOINT: &str = "https://commentanalyzer.googleapis.com/v1alpha1/comments:analyze";

/// Perspective API classifier.
pub struct PerspectiveClassifier {
    client: Client,
    api_key: String,
    endpoint: String,
    rate_limiter: RateLimiter,
}

impl PerspectiveClassifier {
    /// Create a new Perspective API classifier with the given API key.
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            // Perspective free tier: 1 query per second
            rate_limiter: RateLimiter::new(1.0),
        }
    }
}

#[async_trait]
impl ClassifierService for PerspectiveClassifier {
    fn name(&self) -> &str {
        "perspective"
    }

    async fn evaluate(&self, text: &str) -> Result<Vec<LabelScore>> {
        self.rate_limiter.acquire().await;

        let request = PerspectiveRequest {
            comment: Comment {
                text: text.to_string(),
            },
            requested_attributes: ATTRIBUTE_LABELS
                .iter()
                .map(|(attr, _)| (attr.to_string(), AttributeConfig {}))
                .collect(),
            languages: vec!["en".to_string()],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .context("Failed to call Perspective API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Perspective API returned {}: {}", status, body);
        }

        let result: PerspectiveResponse = response
            .json()
            .await
            .context("Failed to parse Perspective API response")?;

        let labels = map_attributes(&result);

        debug!(
            labels = ?labels,
            text_preview = %truncate_chars(text, 50),
            "Perspective classified text"
        );

        Ok(labels)
    }
}

/// Translate the attribute scores that came back into toxic-bert labels.
fn map_attributes(response: &PerspectiveResponse) -> Vec<LabelScore> {
    ATTRIBUTE_LABELS
        .iter()
        .filter_map(|(attr, label)| {
            response
                .attribute_scores
                .get(*attr)
                .map(|score| LabelScore::new(*label, score.summary_score.value))
        })
        .collect()
}

// --- Perspective API request/response types ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PerspectiveRequest {
    comment: Comment,
    requested_attributes: HashMap<String, AttributeConfig>,
    languages: Vec<String>,
}

#[derive(Serialize)]
struct Comment {
    text: String,
}

#[derive(Serialize)]
struct AttributeConfig {}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PerspectiveResponse {
    attribute_scores: HashMap<String, AttributeScore>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttributeScore {
    summary_score: SummaryScore,
}

#[derive(Deserialize)]
struct SummaryScore {
    value: f64,
}
