// Color analysis — skin-tone coverage and red channel dominance.

use anyhow::{Context, Result};
use async_trait::async_trait;
use image::RgbImage;

use crate::content::ContentItem;
use crate::signals::traits::{SignalProvider, SignalResult};

use super::pixels::{offload, rgb_to_hsv};

/// Skin-tone range in 8-bit HSV, inclusive.
const SKIN_MAX_HUE: u8 = 20;
const SKIN_MIN_SATURATION: u8 = 20;
const SKIN_MIN_VALUE: u8 = 70;

const SKIN_RATIO_THRESHOLD: f64 = 0.4;
const RED_DOMINANCE_THRESHOLD: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStats {
    /// Fraction of pixels inside the skin-tone range.
    pub skin_ratio: f64,
    /// Mean red over the sum of the channel means.
    pub red_dominance: f64,
}

pub fn color_stats(rgb: &RgbImage) -> ColorStats {
    let total = rgb.pixels().len();
    if total == 0 {
        return ColorStats {
            skin_ratio: 0.0,
            red_dominance: 0.0,
        };
    }

    let mut skin = 0usize;
    let mut sums = [0u64; 3];
    for pixel in rgb.pixels() {
        let [r, g, b] = pixel.0;
        sums[0] += r as u64;
        sums[1] += g as u64;
        sums[2] += b as u64;

        let (h, s, v) = rgb_to_hsv(r, g, b);
        if h <= SKIN_MAX_HUE && s >= SKIN_MIN_SATURATION && v >= SKIN_MIN_VALUE {
            skin += 1;
        }
    }

    // The pixel count cancels out of the ratio of means.
    let channel_total = (sums[0] + sums[1] + sums[2]) as f64;
    let red_dominance = if channel_total == 0.0 {
        0.0
    } else {
        sums[0] as f64 / channel_total
    };

    ColorStats {
        skin_ratio: skin as f64 / total as f64,
        red_dominance,
    }
}

pub struct ColorProvider;

impl ColorProvider {
    pub fn analyze(rgb: &RgbImage) -> SignalResult {
        let stats = color_stats(rgb);
        let mut result = SignalResult::new();
        if stats.skin_ratio > SKIN_RATIO_THRESHOLD {
            result.score_and_flag("high_skin_tone", stats.skin_ratio);
        }
        if stats.red_dominance > RED_DOMINANCE_THRESHOLD {
            result.score_and_flag("red_dominance", stats.red_dominance);
        }
        result
    }
}

#[async_trait]
impl SignalProvider for ColorProvider {
    fn name(&self) -> &str {
        "color"
    }

    async fn evaluate(&self, item: &ContentItem) -> Result<SignalResult> {
        let image = item.as_image().context("color analysis only handles images")?;
        offload(image, Self::analyze).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn skin_colored_image_is_flagged() {
        let img = RgbImage::from_pixel(20, 20, Rgb([224, 172, 140]));
        let result = ColorProvider::analyze(&img);
        assert_eq!(result.categories["high_skin_tone"], 1.0);
        assert!(result.flagged_reasons.contains("high_skin_tone"));
        assert!(!result.categories.contains_key("red_dominance"));
    }

    #[test]
    fn pure_red_trips_both_signals() {
        let img = RgbImage::from_pixel(10, 10, Rgb([255, 0, 0]));
        let result = ColorProvider::analyze(&img);
        assert_eq!(result.categories["red_dominance"], 1.0);
        assert_eq!(result.categories["high_skin_tone"], 1.0);
    }

    #[test]
    fn gray_and_blue_are_clean() {
        for color in [[128, 128, 128], [0, 0, 255]] {
            let img = RgbImage::from_pixel(10, 10, Rgb(color));
            assert!(ColorProvider::analyze(&img).categories.is_empty());
        }
    }

    #[test]
    fn skin_ratio_counts_pixels() {
        // Left 30% skin, right 70% blue: under the threshold.
        let img = RgbImage::from_fn(10, 10, |x, _| {
            if x < 3 {
                Rgb([224, 172, 140])
            } else {
                Rgb([0, 0, 255])
            }
        });
        let stats = color_stats(&img);
        assert!((stats.skin_ratio - 0.3).abs() < 1e-9);
        assert!(ColorProvider::analyze(&img).categories.is_empty());
    }

    #[test]
    fn black_image_has_no_red_dominance() {
        let img = RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]));
        assert_eq!(color_stats(&img).red_dominance, 0.0);
    }
}
