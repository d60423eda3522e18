use std::sync::Arc;

use image::DynamicImage;
use tracing::debug;

use super::ObjectDetector;
use crate::models::Detection;

/// Finds license plates with a single-class detector
#[derive(Clone)]
pub struct PlateLocator {
    detector: Arc<dyn ObjectDetector>,
    confidence: f32,
}

impl PlateLocator {
    pub fn new(detector: Arc<dyn ObjectDetector>, confidence: f32) -> Self {
        Self {
            detector,
            confidence,
        }
    }

    /// The most confident plate in `image`, if any. The first of equally
    /// confident plates wins.
    pub fn locate_best_plate(&self, image: &DynamicImage) -> anyhow::Result<Option<Detection>> {
        let plates = self.detector.detect(image, self.confidence, None)?;
        let best = select_best(&plates);

        if let Some(plate) = &best {
            debug!(
                candidates = plates.len(),
                confidence = plate.confidence,
                bbox = %plate.bbox,
                "best plate selected"
            );
        }
        Ok(best)
    }

    /// Every plate above threshold, in detector order
    pub fn locate_all_plates(&self, image: &DynamicImage) -> anyhow::Result<Vec<Detection>> {
        let plates = self.detector.detect(image, self.confidence, None)?;
        debug!(
            detector = self.detector.name(),
            count = plates.len(),
            "plate search finished"
        );
        Ok(plates)
    }
}

/// Maximum-confidence detection, stable on ties
pub fn select_best(detections: &[Detection]) -> Option<Detection> {
    detections.iter().fold(None, |best: Option<Detection>, d| match best {
        Some(b) if d.confidence <= b.confidence => Some(b),
        _ => Some(*d),
    })
}
