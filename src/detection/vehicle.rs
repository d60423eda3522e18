use std::sync::Arc;

use image::DynamicImage;
use tracing::debug;

use super::ObjectDetector;
use crate::models::Detection;

/// Finds vehicles of the allowed classes. All vehicle classes are handled alike downstream.
#[derive(Clone)]
pub struct VehicleLocator {
    detector: Arc<dyn ObjectDetector>,
    confidence: f32,
    classes: Vec<u32>,
}

impl VehicleLocator {
    pub fn new(detector: Arc<dyn ObjectDetector>, confidence: f32, classes: Vec<u32>) -> Self {
        Self {
            detector,
            confidence,
            classes,
        }
    }

    /// Vehicles in full-image coordinates, in detector order
    pub fn locate_vehicles(&self, image: &DynamicImage) -> anyhow::Result<Vec<Detection>> {
        let vehicles = self
            .detector
            .detect(image, self.confidence, Some(self.classes.as_slice()))?
            .into_iter()
            // Detectors that ignore the class filter still must not leak other classes
            .filter(|d| self.classes.contains(&d.class_id))
            .collect::<Vec<_>>();

        debug!(
            detector = self.detector.name(),
            count = vehicles.len(),
            "vehicle search finished"
        );
        Ok(vehicles)
    }
}
