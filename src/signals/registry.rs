// Provider registry — the explicit table of which providers run for which
// content kind.
//
// Collaborators (classifiers, detectors) are constructed once at start-up and
// injected here. One that failed to load is simply `None`, and the providers
// that depend on it either drop out of the table or degrade to what they can
// still compute.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::classifier::traits::ClassifierService;
use crate::content::ContentKind;

use super::image::color::ColorProvider;
use super::image::objects::{CascadeDetector, ObjectProvider};
use super::image::rules::StructuralRuleProvider;
use super::image::texture::TextureProvider;
use super::text::classifier::ClassifierAdapter;
use super::text::patterns::PatternProvider;
use super::text::sentiment::{LexiconSentiment, ModelSentiment, SentimentChain};
use super::text::structural::StructuralHeuristics;
use super::traits::SignalProvider;

/// Externally constructed services the default providers depend on.
#[derive(Clone, Default)]
pub struct Collaborators {
    /// Toxicity classifier (label → score).
    pub toxicity: Option<Arc<dyn ClassifierService>>,
    /// Sentiment classifier emitting POSITIVE / NEGATIVE labels.
    pub sentiment: Option<Arc<dyn ClassifierService>>,
    /// Face / body detector.
    pub detector: Option<Arc<dyn CascadeDetector>>,
}

/// Per-kind table of registered providers.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    table: HashMap<ContentKind, Vec<Arc<dyn SignalProvider>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the standard text and image provider tables.
    pub fn with_defaults(collaborators: Collaborators) -> Result<Self> {
        let mut registry = Self::new();

        registry.register(ContentKind::Text, PatternProvider::new()?);

        let mut sentiment = SentimentChain::new();
        if let Some(model) = collaborators.sentiment.clone() {
            sentiment.push(ModelSentiment::new(model));
        }
        sentiment.push(LexiconSentiment::new());

        if collaborators.toxicity.is_none() {
            warn!("No toxicity classifier available; text moderation runs on patterns and heuristics");
        }
        registry.register(
            ContentKind::Text,
            ClassifierAdapter::new(collaborators.toxicity.clone(), sentiment),
        );
        registry.register(ContentKind::Text, StructuralHeuristics);

        if collaborators.detector.is_none() {
            warn!("No cascade detector available; object provider reports edge density only");
        }
        registry.register(ContentKind::Image, ColorProvider);
        registry.register(
            ContentKind::Image,
            ObjectProvider::new(collaborators.detector.clone()),
        );
        registry.register(ContentKind::Image, TextureProvider);
        registry.register(ContentKind::Image, StructuralRuleProvider);

        info!(
            text = ?registry.names(ContentKind::Text),
            image = ?registry.names(ContentKind::Image),
            "Signal providers registered"
        );

        Ok(registry)
    }

    pub fn register<P>(&mut self, kind: ContentKind, provider: P) -> &mut Self
    where
        P: SignalProvider + 'static,
    {
        self.register_arc(kind, Arc::new(provider))
    }

    pub fn register_arc(&mut self, kind: ContentKind, provider: Arc<dyn SignalProvider>) -> &mut Self {
        self.table.entry(kind).or_default().push(provider);
        self
    }

    /// Providers registered for `kind`; empty when none are.
    pub fn providers_for(&self, kind: ContentKind) -> &[Arc<dyn SignalProvider>] {
        self.table.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn names(&self, kind: ContentKind) -> Vec<&str> {
        self.providers_for(kind).iter().map(|p| p.name()).collect()
    }
}
