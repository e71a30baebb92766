// Pixel helpers shared by the image providers: grayscale conversion,
// HSV conversion, intensity statistics and the blocking-pool hop.

use std::sync::Arc;

use anyhow::{Context, Result};
use image::{GrayImage, Luma, RgbImage};

use crate::content::ImagePayload;

/// ITU-R 601 luma in 16-bit fixed point, rounded to nearest.
pub fn luma601(r: u8, g: u8, b: u8) -> u8 {
    let weighted = r as u32 * 19595 + g as u32 * 38470 + b as u32 * 7471;
    ((weighted + 0x8000) >> 16) as u8
}

pub fn to_gray(rgb: &RgbImage) -> GrayImage {
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        Luma([luma601(r, g, b)])
    })
}

/// 8-bit HSV with hue halved into [0, 180) and saturation/value in [0, 255].
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let (rf, gf, bf) = (r as f64, g as f64, b as f64);
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let diff = max - min;

    let s = if max == 0.0 { 0.0 } else { 255.0 * diff / max };

    let mut h = if diff == 0.0 {
        0.0
    } else if max == rf {
        60.0 * (gf - bf) / diff
    } else if max == gf {
        120.0 + 60.0 * (bf - rf) / diff
    } else {
        240.0 + 60.0 * (rf - gf) / diff
    };
    if h < 0.0 {
        h += 360.0;
    }

    let h = ((h / 2.0).round() as u32 % 180) as u8;
    (h, s.round() as u8, max as u8)
}

/// Mean and population variance of a grayscale buffer.
pub fn mean_and_variance(gray: &GrayImage) -> (f64, f64) {
    let n = gray.as_raw().len();
    if n == 0 {
        return (0.0, 0.0);
    }
    let n = n as f64;
    let mean = gray.as_raw().iter().map(|&v| v as f64).sum::<f64>() / n;
    let variance = gray
        .as_raw()
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    (mean, variance)
}

/// Run `work` against the decoded image on the blocking pool.
pub async fn offload<T, F>(image: &ImagePayload, work: F) -> Result<T>
where
    F: FnOnce(&RgbImage) -> T + Send + 'static,
    T: Send + 'static,
{
    let rgb = Arc::clone(&image.rgb);
    tokio::task::spawn_blocking(move || work(&rgb))
        .await
        .context("image analysis task failed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn luma_of_primaries() {
        assert_eq!(luma601(255, 255, 255), 255);
        assert_eq!(luma601(0, 0, 0), 0);
        assert_eq!(luma601(255, 0, 0), 76);
        assert_eq!(luma601(0, 255, 0), 150);
        assert_eq!(luma601(0, 0, 255), 29);
    }

    #[test]
    fn hsv_matches_half_degree_hue() {
        assert_eq!(rgb_to_hsv(255, 0, 0), (0, 255, 255));
        assert_eq!(rgb_to_hsv(0, 255, 0), (60, 255, 255));
        assert_eq!(rgb_to_hsv(0, 0, 255), (120, 255, 255));
        assert_eq!(rgb_to_hsv(128, 128, 128), (0, 0, 128));
        assert_eq!(rgb_to_hsv(0, 0, 0), (0, 0, 0));
    }

    #[test]
    fn variance_of_two_levels() {
        let gray = GrayImage::from_fn(2, 1, |x, _| Luma([if x == 0 { 0 } else { 200 }]));
        let (mean, variance) = mean_and_variance(&gray);
        assert_eq!(mean, 100.0);
        assert_eq!(variance, 10000.0);
    }
}
