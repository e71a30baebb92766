// Shared fixtures for the integration tests: in-memory images, stub
// collaborators, and misbehaving providers.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use image::{ImageFormat, Rgb, RgbImage};

use sentinel::classifier::traits::{ClassifierService, LabelScore, StaticClassifier};
use sentinel::content::ContentItem;
use sentinel::pipeline::Moderator;
use sentinel::signals::{Collaborators, ProviderRegistry, Scheduler, SignalProvider, SignalResult};

pub fn encode_png(img: &RgbImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

pub fn solid_png(w: u32, h: u32, rgb: [u8; 3]) -> Vec<u8> {
    encode_png(&RgbImage::from_pixel(w, h, Rgb(rgb)))
}

/// A bluish image with low-amplitude noise: big enough on disk to pass the
/// file-size rule, too flat to produce edges, texture or color flags.
pub fn quiet_photo_png(w: u32, h: u32) -> Vec<u8> {
    let mut state: u32 = 0x2545_f491;
    let img = RgbImage::from_fn(w, h, |_, _| {
        let mut next = || {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            ((state >> 16) % 6) as u8
        };
        Rgb([60 + next(), 80 + next(), 140 + next()])
    });
    encode_png(&img)
}

/// Toxicity labels all below the category threshold.
pub fn calm_toxicity() -> Arc<dyn ClassifierService> {
    Arc::new(StaticClassifier::new(vec![
        LabelScore::new("toxic", 0.2),
        LabelScore::new("insult", 0.1),
        LabelScore::new("threat", 0.01),
    ]))
}

/// A sentiment model that never reports strong negativity.
pub fn calm_sentiment() -> Arc<dyn ClassifierService> {
    Arc::new(StaticClassifier::new(vec![
        LabelScore::new("POSITIVE", 0.9),
        LabelScore::new("NEGATIVE", 0.1),
    ]))
}

/// A toxicity classifier whose backend is down.
pub struct OfflineClassifier;

#[async_trait]
impl ClassifierService for OfflineClassifier {
    fn name(&self) -> &str {
        "offline"
    }
    async fn evaluate(&self, _text: &str) -> Result<Vec<LabelScore>> {
        anyhow::bail!("503 from perspective")
    }
}

pub fn offline_toxicity() -> Arc<dyn ClassifierService> {
    Arc::new(OfflineClassifier)
}

pub fn calm_collaborators() -> Collaborators {
    Collaborators {
        toxicity: Some(calm_toxicity()),
        sentiment: Some(calm_sentiment()),
        detector: None,
    }
}

pub fn default_moderator() -> Moderator {
    let registry = ProviderRegistry::with_defaults(calm_collaborators()).unwrap();
    Moderator::new(registry, Scheduler::default())
}

pub fn image_item(bytes: &[u8]) -> ContentItem {
    ContentItem::image(bytes).unwrap()
}

pub struct Fixed {
    pub name: &'static str,
    pub result: SignalResult,
}

#[async_trait]
impl SignalProvider for Fixed {
    fn name(&self) -> &str {
        self.name
    }
    async fn evaluate(&self, _item: &ContentItem) -> Result<SignalResult> {
        Ok(self.result.clone())
    }
}

pub struct Failing;

#[async_trait]
impl SignalProvider for Failing {
    fn name(&self) -> &str {
        "failing"
    }
    async fn evaluate(&self, _item: &ContentItem) -> Result<SignalResult> {
        anyhow::bail!("model unavailable")
    }
}

pub struct Panicking;

#[async_trait]
impl SignalProvider for Panicking {
    fn name(&self) -> &str {
        "panicking"
    }
    async fn evaluate(&self, _item: &ContentItem) -> Result<SignalResult> {
        panic!("detector crashed")
    }
}

pub struct Slow(pub Duration);

#[async_trait]
impl SignalProvider for Slow {
    fn name(&self) -> &str {
        "slow"
    }
    async fn evaluate(&self, _item: &ContentItem) -> Result<SignalResult> {
        tokio::time::sleep(self.0).await;
        Ok(SignalResult::new().flagged("late_signal", 1.0))
    }
}
