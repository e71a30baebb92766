// Object analysis — face and body counts from an injected cascade detector,
// plus Canny edge density.
//
// The detector is optional. Without one, this provider still reports edge
// density, which needs nothing beyond the pixels.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use image::{GrayImage, RgbImage};

use crate::content::ContentItem;
use crate::signals::traits::{SignalProvider, SignalResult};

use super::edges::edge_density;
use super::pixels::{offload, to_gray};

const MANY_FACES: usize = 5;
const MANY_BODIES: usize = 3;
const EDGE_DENSITY_THRESHOLD: f64 = 0.1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObjectCounts {
    pub faces: usize,
    pub bodies: usize,
}

/// A face / body detector working on a grayscale frame. Detection is CPU
/// work and is always called from the blocking pool.
pub trait CascadeDetector: Send + Sync {
    fn count(&self, gray: &GrayImage) -> Result<ObjectCounts>;
}

pub struct ObjectProvider {
    detector: Option<Arc<dyn CascadeDetector>>,
}

impl ObjectProvider {
    pub fn new(detector: Option<Arc<dyn CascadeDetector>>) -> Self {
        Self { detector }
    }

    pub fn analyze(detector: Option<&dyn CascadeDetector>, rgb: &RgbImage) -> Result<SignalResult> {
        let gray = to_gray(rgb);
        let mut result = SignalResult::new();

        if let Some(detector) = detector {
            let counts = detector.count(&gray).context("cascade detection failed")?;
            // Counts only feed the reasons; they are not category scores.
            if counts.faces > MANY_FACES {
                result.flag("many_faces");
            }
            if counts.bodies > MANY_BODIES {
                result.flag("many_bodies");
            }
        }

        let density = edge_density(&gray);
        if density > EDGE_DENSITY_THRESHOLD {
            result.score_and_flag("high_edge_density", density);
        }

        Ok(result)
    }
}

#[async_trait]
impl SignalProvider for ObjectProvider {
    fn name(&self) -> &str {
        "objects"
    }

    async fn evaluate(&self, item: &ContentItem) -> Result<SignalResult> {
        let image = item.as_image().context("object analysis only handles images")?;
        let detector = self.detector.clone();
        offload(image, move |rgb| Self::analyze(detector.as_deref(), rgb)).await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    struct FixedCounts(ObjectCounts);

    impl CascadeDetector for FixedCounts {
        fn count(&self, _gray: &GrayImage) -> Result<ObjectCounts> {
            Ok(self.0)
        }
    }

    struct BrokenDetector;

    impl CascadeDetector for BrokenDetector {
        fn count(&self, _gray: &GrayImage) -> Result<ObjectCounts> {
            anyhow::bail!("cascade file missing")
        }
    }

    fn flat() -> RgbImage {
        RgbImage::from_pixel(32, 32, Rgb([90, 90, 90]))
    }

    #[test]
    fn crowd_is_flagged_without_categories() {
        let detector = FixedCounts(ObjectCounts { faces: 6, bodies: 4 });
        let result = ObjectProvider::analyze(Some(&detector), &flat()).unwrap();
        assert!(result.flagged_reasons.contains("many_faces"));
        assert!(result.flagged_reasons.contains("many_bodies"));
        assert!(result.categories.is_empty());
    }

    #[test]
    fn counts_at_the_limit_are_fine() {
        let detector = FixedCounts(ObjectCounts { faces: 5, bodies: 3 });
        let result = ObjectProvider::analyze(Some(&detector), &flat()).unwrap();
        assert!(!result.is_flagged());
    }

    #[test]
    fn no_detector_still_measures_edges() {
        let busy = RgbImage::from_fn(64, 64, |x, y| {
            if (x / 4 + y / 4) % 2 == 0 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        });
        let result = ObjectProvider::analyze(None, &busy).unwrap();
        assert!(result.categories["high_edge_density"] > 0.1);
        assert!(result.flagged_reasons.contains("high_edge_density"));
    }

    #[test]
    fn detector_failure_fails_the_provider() {
        let err = ObjectProvider::analyze(Some(&BrokenDetector), &flat()).unwrap_err();
        assert!(format!("{err:#}").contains("cascade file missing"));
    }

    #[tokio::test]
    async fn evaluate_runs_on_blocking_pool() {
        let provider = ObjectProvider::new(Some(Arc::new(FixedCounts(ObjectCounts {
            faces: 9,
            bodies: 0,
        }))));
        let mut bytes = std::io::Cursor::new(Vec::new());
        flat().write_to(&mut bytes, image::ImageFormat::Png).unwrap();
        let item = ContentItem::image(bytes.get_ref()).unwrap();
        let result = provider.evaluate(&item).await.unwrap();
        assert!(result.flagged_reasons.contains("many_faces"));
    }
}
