use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use image::DynamicImage;
use ocrs::{ImageSource, OcrEngine, OcrEngineParams, TextItem};
use rten::Model;
use tracing::{debug, info};

use super::TextReader;
use super::preprocessing;
use crate::error::{PipelineError, Result};
use crate::models::{BoundingBox, OcrFragment};

/// Text and aggregate confidence read from one plate crop
#[derive(Debug, Clone, PartialEq)]
pub struct PlateReading {
    pub text: String,
    pub confidence: f32,
}

/// Fold reader fragments into a single plate reading.
///
/// Fragments scoring strictly above `threshold` are concatenated in reader
/// order and their maximum confidence kept; the rest are dropped entirely.
/// Reader order is not guaranteed to be left-to-right on the plate.
pub fn aggregate_fragments(fragments: &[OcrFragment], threshold: f32) -> PlateReading {
    let mut text = String::new();
    let mut confidence = 0.0f32;

    for fragment in fragments.iter().filter(|f| f.confidence > threshold) {
        text.push_str(&fragment.text);
        confidence = confidence.max(fragment.confidence);
    }

    PlateReading {
        text: text.to_uppercase(),
        confidence,
    }
}

/// Applies the plate alphabet and OCR threshold around a `TextReader`
#[derive(Clone)]
pub struct CharacterReader {
    reader: Arc<dyn TextReader>,
    allowlist: String,
    threshold: f32,
}

impl CharacterReader {
    pub fn new(reader: Arc<dyn TextReader>, allowlist: impl Into<String>, threshold: f32) -> Self {
        Self {
            reader,
            allowlist: allowlist.into(),
            threshold,
        }
    }

    /// Read the plate text. An empty crop reads as nothing, without calling the reader.
    pub fn read_plate_text(&self, plate: &DynamicImage) -> anyhow::Result<PlateReading> {
        if plate.width() == 0 || plate.height() == 0 {
            return Ok(PlateReading {
                text: String::new(),
                confidence: 0.0,
            });
        }

        let fragments = self.reader.read(plate, &self.allowlist)?;
        let reading = aggregate_fragments(&fragments, self.threshold);
        debug!(
            reader = self.reader.name(),
            fragments = fragments.len(),
            text = %reading.text,
            confidence = reading.confidence,
            "plate text read"
        );
        Ok(reading)
    }
}

/// ocrs does not score lines, so each recognized line gets this confidence
pub const DEFAULT_LINE_CONFIDENCE: f32 = 0.9;

/// `TextReader` backed by the ocrs engine
pub struct OcrsTextReader {
    engine: OcrEngine,
    line_confidence: f32,
    equalize: bool,
}

/// Standard ocrs model cache location (`~/.cache/ocrs`)
pub fn default_model_dir() -> anyhow::Result<PathBuf> {
    let home_dir = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE"))?;
    Ok(Path::new(&home_dir).join(".cache/ocrs"))
}

impl OcrsTextReader {
    /// Load `text-detection.rten` and `text-recognition.rten` from `model_dir`
    pub fn load(model_dir: &Path, allowlist: &str) -> Result<Self> {
        Self::init_engine(model_dir, allowlist)
            .map(|engine| Self {
                engine,
                line_confidence: DEFAULT_LINE_CONFIDENCE,
                equalize: false,
            })
            .map_err(|e| PipelineError::unavailable("ocrs text reader", e))
    }

    fn init_engine(model_dir: &Path, allowlist: &str) -> anyhow::Result<OcrEngine> {
        let detection_model_path = model_dir.join("text-detection.rten");
        let recognition_model_path = model_dir.join("text-recognition.rten");

        if !detection_model_path.exists() || !recognition_model_path.exists() {
            anyhow::bail!(
                "OCR models not found. Expected locations:\n  - {}\n  - {}",
                detection_model_path.display(),
                recognition_model_path.display()
            );
        }

        info!("Loading OCR models from {}", model_dir.display());
        let detection_model = Model::load_file(&detection_model_path)
            .with_context(|| format!("loading {}", detection_model_path.display()))?;
        let recognition_model = Model::load_file(&recognition_model_path)
            .with_context(|| format!("loading {}", recognition_model_path.display()))?;

        let engine = OcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            allowed_chars: Some(allowlist.to_string()),
            ..Default::default()
        })?;

        Ok(engine)
    }

    pub fn with_line_confidence(mut self, confidence: f32) -> Self {
        self.line_confidence = confidence;
        self
    }

    pub fn with_equalize(mut self, equalize: bool) -> Self {
        self.equalize = equalize;
        self
    }
}

impl TextReader for OcrsTextReader {
    fn read(&self, image: &DynamicImage, allowlist: &str) -> anyhow::Result<Vec<OcrFragment>> {
        let prepared = preprocessing::prepare_plate_crop(image, self.equalize);
        let img = prepared.to_rgb8();
        // Map boxes from the upscaled crop back onto the caller's crop
        let x_factor = image.width() as f32 / img.width() as f32;
        let y_factor = image.height() as f32 / img.height() as f32;

        let img_source = ImageSource::from_bytes(img.as_raw(), img.dimensions())
            .map_err(|e| anyhow::anyhow!("invalid plate crop: {:?}", e))?;
        let ocr_input = self.engine.prepare_input(img_source)?;

        let words = self.engine.detect_words(&ocr_input)?;
        let lines = self.engine.find_text_lines(&ocr_input, &words);
        let recognized = self.engine.recognize_text(&ocr_input, &lines)?;

        let fragments = recognized
            .into_iter()
            .flatten()
            .filter_map(|line| {
                let text: String = line
                    .chars()
                    .iter()
                    .map(|c| c.char.to_ascii_uppercase())
                    .filter(|c| allowlist.contains(*c))
                    .collect();
                if text.is_empty() {
                    return None;
                }
                let rect = line.bounding_rect();
                let bbox = BoundingBox::new(
                    rect.left() as f32,
                    rect.top() as f32,
                    rect.right() as f32,
                    rect.bottom() as f32,
                )
                .scale(x_factor, y_factor);
                Some(OcrFragment::new(bbox, text, self.line_confidence))
            })
            .collect();

        Ok(fragments)
    }

    fn name(&self) -> &str {
        "ocrs"
    }
}
