// Texture analysis — grayscale variance and overall brightness.

use anyhow::{Context, Result};
use async_trait::async_trait;
use image::RgbImage;

use crate::content::ContentItem;
use crate::signals::traits::{SignalProvider, SignalResult};

use super::pixels::{mean_and_variance, offload, to_gray};

const VARIANCE_THRESHOLD: f64 = 5000.0;
const VARIANCE_SCALE: f64 = 10000.0;
const DARK_THRESHOLD: f64 = 50.0;
const BRIGHT_THRESHOLD: f64 = 200.0;

pub struct TextureProvider;

impl TextureProvider {
    pub fn analyze(rgb: &RgbImage) -> SignalResult {
        let (brightness, variance) = mean_and_variance(&to_gray(rgb));
        let mut result = SignalResult::new();

        if variance > VARIANCE_THRESHOLD {
            result.score_and_flag("high_texture_variance", (variance / VARIANCE_SCALE).min(1.0));
        }
        if brightness < DARK_THRESHOLD {
            result.score_and_flag("low_brightness", 1.0 - brightness / 255.0);
        } else if brightness > BRIGHT_THRESHOLD {
            result.score_and_flag("high_brightness", brightness / 255.0);
        }

        result
    }
}

#[async_trait]
impl SignalProvider for TextureProvider {
    fn name(&self) -> &str {
        "texture"
    }

    async fn evaluate(&self, item: &ContentItem) -> Result<SignalResult> {
        let image = item
            .as_image()
            .context("texture analysis only handles images")?;
        offload(image, Self::analyze).await
    }
}
