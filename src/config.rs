use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::classifier::perspective::PerspectiveClassifier;
use crate::classifier::traits::ClassifierService;
use crate::fetch::HttpFetcher;
use crate::pipeline::Moderator;
use crate::signals::{Collaborators, ProviderRegistry, Scheduler};

/// Which toxicity classifier backs the text classifier provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierBackend {
    /// Local ONNX models (default), no API key and no rate limits
    Onnx,
    /// Google Perspective API, requires PERSPECTIVE_API_KEY, 1 QPS limit
    Perspective,
    /// No classifier; text moderation runs on patterns, heuristics and the lexicon
    None,
}

impl ClassifierBackend {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "onnx" => Ok(ClassifierBackend::Onnx),
            "perspective" => Ok(ClassifierBackend::Perspective),
            "none" => Ok(ClassifierBackend::None),
            other => anyhow::bail!(
                "SENTINEL_CLASSIFIER must be onnx, perspective or none (got '{other}')"
            ),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClassifierBackend::Onnx => "onnx",
            ClassifierBackend::Perspective => "perspective",
            ClassifierBackend::None => "none",
        }
    }
}

/// Central configuration loaded from environment variables.
///
/// The .env file is loaded at startup via dotenvy, before this runs.
#[derive(Debug, Clone)]
pub struct Config {
    /// Deadline for a single provider (SENTINEL_PROVIDER_TIMEOUT_MS)
    pub provider_timeout: Duration,
    /// Deadline for a whole item's fan-out (SENTINEL_ITEM_TIMEOUT_MS)
    pub item_timeout: Duration,
    /// Timeout for fetching a submitted URL (SENTINEL_FETCH_TIMEOUT_SECS)
    pub fetch_timeout: Duration,
    /// Largest body accepted from a submitted URL (SENTINEL_MAX_FETCH_BYTES)
    pub max_fetch_bytes: usize,
    pub classifier: ClassifierBackend,
    /// Directory containing the ONNX model subdirectories
    pub model_dir: PathBuf,
    pub perspective_api_key: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider_timeout: Duration::from_millis(10_000),
            item_timeout: Duration::from_millis(30_000),
            fetch_timeout: Duration::from_secs(30),
            max_fetch_bytes: 10 * 1024 * 1024,
            classifier: ClassifierBackend::Onnx,
            model_dir: crate::classifier::download::default_model_dir(),
            perspective_api_key: String::new(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let classifier = match lookup("SENTINEL_CLASSIFIER") {
            Some(value) => ClassifierBackend::parse(&value)?,
            None => defaults.classifier,
        };

        Ok(Self {
            provider_timeout: parse_var(&lookup, "SENTINEL_PROVIDER_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.provider_timeout),
            item_timeout: parse_var(&lookup, "SENTINEL_ITEM_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.item_timeout),
            fetch_timeout: parse_var(&lookup, "SENTINEL_FETCH_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.fetch_timeout),
            max_fetch_bytes: parse_var(&lookup, "SENTINEL_MAX_FETCH_BYTES")?
                .map(|v| v as usize)
                .unwrap_or(defaults.max_fetch_bytes),
            classifier,
            model_dir: lookup("SENTINEL_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_dir),
            perspective_api_key: lookup("PERSPECTIVE_API_KEY").unwrap_or_default(),
        })
    }

    pub fn scheduler(&self) -> Scheduler {
        Scheduler::new(self.provider_timeout, self.item_timeout)
    }

    /// Construct the classifiers for the configured backend. Anything that
    /// fails to load is logged and left out.
    pub fn collaborators(&self) -> Collaborators {
        let mut collaborators = Collaborators::default();

        match self.classifier {
            ClassifierBackend::None => {
                info!("Classifier disabled by configuration");
            }
            ClassifierBackend::Perspective => {
                if self.perspective_api_key.is_empty() {
                    warn!("PERSPECTIVE_API_KEY not set; continuing without a toxicity classifier");
                } else {
                    let classifier: Arc<dyn ClassifierService> =
                        Arc::new(PerspectiveClassifier::new(self.perspective_api_key.clone()));
                    collaborators.toxicity = Some(classifier);
                }
            }
            ClassifierBackend::Onnx => self.load_onnx(&mut collaborators),
        }

        collaborators
    }

    #[cfg(feature = "onnx")]
    fn load_onnx(&self, collaborators: &mut Collaborators) {
        use crate::classifier::download::{
            model_dir, model_files_present, SENTIMENT_MODEL, TOXICITY_MODEL,
        };
        use crate::classifier::onnx::{OnnxClassifier, SST2_SENTIMENT, TOXIC_BERT};

        if !model_files_present(&self.model_dir, &TOXICITY_MODEL) {
            warn!(
                dir = %self.model_dir.display(),
                "ONNX models not found; run `sentinel download-model`"
            );
            return;
        }

        match OnnxClassifier::load(&model_dir(&self.model_dir, &TOXICITY_MODEL), TOXIC_BERT) {
            Ok(classifier) => collaborators.toxicity = Some(Arc::new(classifier)),
            Err(e) => warn!(error = %e, "Toxicity model unavailable, continuing without it"),
        }
        match OnnxClassifier::load(&model_dir(&self.model_dir, &SENTIMENT_MODEL), SST2_SENTIMENT)
        {
            Ok(classifier) => collaborators.sentiment = Some(Arc::new(classifier)),
            Err(e) => warn!(error = %e, "Sentiment model unavailable, falling back to the lexicon"),
        }
    }

    #[cfg(not(feature = "onnx"))]
    fn load_onnx(&self, _collaborators: &mut Collaborators) {
        warn!("Built without the `onnx` feature; continuing without a toxicity classifier");
    }

    /// Wire up the full moderation pipeline.
    pub fn moderator(&self) -> Result<Moderator> {
        self.moderator_with(self.collaborators())
    }

    /// Wire up the pipeline around already constructed collaborators.
    pub fn moderator_with(&self, collaborators: Collaborators) -> Result<Moderator> {
        let registry = ProviderRegistry::with_defaults(collaborators)?;
        let fetcher = HttpFetcher::new(self.fetch_timeout, self.max_fetch_bytes)
            .context("Failed to build HTTP client for URL fetches")?;
        Ok(Moderator::new(registry, self.scheduler()).with_fetcher(Arc::new(fetcher)))
    }
}

fn parse_var(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<u64>> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .with_context(|| format!("{key} must be a non-negative integer (got '{raw}')")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from(pairs: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = from(&[]).unwrap();
        assert_eq!(config.provider_timeout, Duration::from_secs(10));
        assert_eq!(config.item_timeout, Duration::from_secs(30));
        assert_eq!(config.fetch_timeout, Duration::from_secs(30));
        assert_eq!(config.max_fetch_bytes, 10_485_760);
        assert_eq!(config.classifier, ClassifierBackend::Onnx);
    }

    #[test]
    fn overrides_are_read() {
        let config = from(&[
            ("SENTINEL_PROVIDER_TIMEOUT_MS", "250"),
            ("SENTINEL_CLASSIFIER", "None"),
            ("SENTINEL_MODEL_DIR", "/tmp/models"),
        ])
        .unwrap();
        assert_eq!(config.provider_timeout, Duration::from_millis(250));
        assert_eq!(config.classifier, ClassifierBackend::None);
        assert_eq!(config.model_dir, PathBuf::from("/tmp/models"));
    }

    #[test]
    fn malformed_numbers_name_the_variable() {
        let err = from(&[("SENTINEL_ITEM_TIMEOUT_MS", "soon")]).unwrap_err();
        assert!(err.to_string().contains("SENTINEL_ITEM_TIMEOUT_MS"));
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(from(&[("SENTINEL_CLASSIFIER", "gpt")]).is_err());
    }

    #[test]
    fn perspective_without_key_degrades() {
        let config = from(&[("SENTINEL_CLASSIFIER", "perspective")]).unwrap();
        let collaborators = config.collaborators();
        assert!(collaborators.toxicity.is_none());
        assert!(collaborators.sentiment.is_none());
    }
}
