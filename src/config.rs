//! Pipeline configuration
//!
//! Loaded once when a pipeline is built and read-only afterwards. Every field
//! has a default, so a TOML file only needs the values it overrides:
//!
//! ```toml
//! vehicle_confidence = 0.6
//! plate_confidence = 0.25
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{PipelineError, Result};

/// COCO class ids for car, motorcycle, bus and truck
pub const DEFAULT_VEHICLE_CLASSES: [u32; 4] = [2, 3, 5, 7];
pub const DEFAULT_VEHICLE_CONFIDENCE: f32 = 0.5;
pub const DEFAULT_PLATE_CONFIDENCE: f32 = 0.3;
pub const DEFAULT_OCR_CONFIDENCE: f32 = 0.1;
pub const PLATE_ALPHABET: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Detector classes treated as vehicles
    pub vehicle_classes: Vec<u32>,
    pub vehicle_confidence: f32,
    pub plate_confidence: f32,
    /// OCR fragments must score strictly above this to be kept
    pub ocr_confidence: f32,
    pub char_allowlist: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            vehicle_classes: DEFAULT_VEHICLE_CLASSES.to_vec(),
            vehicle_confidence: DEFAULT_VEHICLE_CONFIDENCE,
            plate_confidence: DEFAULT_PLATE_CONFIDENCE,
            ocr_confidence: DEFAULT_OCR_CONFIDENCE,
            char_allowlist: PLATE_ALPHABET.to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| PipelineError::Config(format!("failed to parse TOML: {}", e)))
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn with_vehicle_confidence(mut self, confidence: f32) -> Self {
        self.vehicle_confidence = confidence;
        self
    }

    pub fn with_plate_confidence(mut self, confidence: f32) -> Self {
        self.plate_confidence = confidence;
        self
    }

    pub fn with_ocr_confidence(mut self, confidence: f32) -> Self {
        self.ocr_confidence = confidence;
        self
    }

    pub fn with_vehicle_classes(mut self, classes: impl Into<Vec<u32>>) -> Self {
        self.vehicle_classes = classes.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("vehicle_confidence", self.vehicle_confidence),
            ("plate_confidence", self.plate_confidence),
            ("ocr_confidence", self.ocr_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(PipelineError::Config(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        if self.vehicle_classes.is_empty() {
            return Err(PipelineError::Config(
                "vehicle_classes must not be empty".to_string(),
            ));
        }

        if self.char_allowlist.is_empty() {
            return Err(PipelineError::Config(
                "char_allowlist must not be empty".to_string(),
            ));
        }

        if let Some(c) = self
            .char_allowlist
            .chars()
            .find(|c| !(c.is_ascii_digit() || c.is_ascii_uppercase()))
        {
            return Err(PipelineError::Config(format!(
                "char_allowlist may only contain 0-9 and A-Z, found {:?}",
                c
            )));
        }

        Ok(())
    }
}
