use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::DynamicImage;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::detection::{
    CharacterReader, ObjectDetector, PlateLocator, TextReader, VehicleLocator, extract_roi,
};
use crate::error::{PipelineError, Result, Stage};
use crate::models::{Detection, PlateCandidate};

/// Debug configuration: where crops are dumped during a run
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
}

impl DebugConfig {
    pub const VEHICLES_DIR: &'static str = "01_vehicles";
    pub const PLATES_DIR: &'static str = "02_plates";
    pub const FALLBACK_DIR: &'static str = "03_fallback_plates";

    /// Save a crop under `step_dir`, named after its lineage (e.g. "01-02.png")
    fn save(&self, step_dir: &str, lineage: &[usize], image: &DynamicImage) -> Result<()> {
        let dir = self.output_dir.join(step_dir);
        std::fs::create_dir_all(&dir).map_err(|e| PipelineError::debug_output(&dir, e))?;

        let path = dir.join(lineage_filename(lineage, "png"));
        image
            .save(&path)
            .map_err(|e| PipelineError::debug_output(&path, e))?;
        debug!("Debug: saved {}", path.display());
        Ok(())
    }
}

/// Generate filename from lineage (e.g. [1, 2] -> "01-02.png")
pub fn lineage_filename(lineage: &[usize], extension: &str) -> String {
    if lineage.is_empty() {
        format!("01.{}", extension)
    } else {
        let ids: Vec<String> = lineage.iter().map(|id| format!("{:02}", id)).collect();
        format!("{}.{}", ids.join("-"), extension)
    }
}

/// License plate recognition pipeline.
///
/// Searches vehicles first and plates inside each vehicle crop. When that
/// produces nothing, every plate found on the full image is read instead.
///
/// The pipeline holds no per-run state, so one instance can be shared
/// (e.g. behind an `Arc`) by concurrent callers.
pub struct LprPipeline {
    config: PipelineConfig,
    vehicles: VehicleLocator,
    plates: PlateLocator,
    reader: CharacterReader,
    debug: Option<DebugConfig>,
}

impl LprPipeline {
    pub fn new(
        config: PipelineConfig,
        vehicle_detector: Arc<dyn ObjectDetector>,
        plate_detector: Arc<dyn ObjectDetector>,
        text_reader: Arc<dyn TextReader>,
    ) -> Result<Self> {
        config.validate()?;

        let vehicles = VehicleLocator::new(
            vehicle_detector,
            config.vehicle_confidence,
            config.vehicle_classes.clone(),
        );
        let plates = PlateLocator::new(plate_detector, config.plate_confidence);
        let reader = CharacterReader::new(
            text_reader,
            config.char_allowlist.clone(),
            config.ocr_confidence,
        );

        Ok(Self {
            config,
            vehicles,
            plates,
            reader,
            debug: None,
        })
    }

    /// Enable debug mode with output directory.
    /// The directory must be empty or non-existent.
    pub fn with_debug(mut self, output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        prepare_debug_dir(&output_dir)?;
        self.debug = Some(DebugConfig { output_dir });
        Ok(self)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Recognize plates in `image`. An empty list means no plate was recognized.
    pub fn run(&self, image: &DynamicImage) -> Result<Vec<PlateCandidate>> {
        info!(
            width = image.width(),
            height = image.height(),
            "running plate recognition"
        );

        let vehicles = self
            .vehicles
            .locate_vehicles(image)
            .map_err(|e| PipelineError::capability(Stage::VehicleSearch, e))?;

        let mut candidates = self.two_stage_search(image, &vehicles)?;

        if candidates.is_empty() {
            debug!(
                vehicles = vehicles.len(),
                "two-stage search found no plate, searching full image"
            );
            candidates = self.fallback_search(image)?;
        }

        info!(candidates = candidates.len(), "plate recognition finished");
        Ok(candidates)
    }

    /// One candidate per vehicle whose crop holds a plate, even if its text is empty
    fn two_stage_search(
        &self,
        image: &DynamicImage,
        vehicles: &[Detection],
    ) -> Result<Vec<PlateCandidate>> {
        let mut candidates = Vec::new();

        for (v_idx, vehicle) in vehicles.iter().enumerate() {
            let lineage = [v_idx + 1];
            let Some(vehicle_img) = self.crop(image, vehicle, "vehicle")? else {
                continue;
            };
            self.save_debug(DebugConfig::VEHICLES_DIR, &lineage, &vehicle_img)?;

            // Plate boxes are local to the vehicle crop
            let plate = match self.plates.locate_best_plate(&vehicle_img) {
                Ok(Some(plate)) => plate,
                Ok(None) => {
                    debug!(vehicle = v_idx + 1, "no plate inside vehicle");
                    continue;
                }
                Err(e) => {
                    warn!(vehicle = v_idx + 1, "{}: {:#}", Stage::PlateSearch, e);
                    continue;
                }
            };
            debug!(
                vehicle = v_idx + 1,
                bbox = %plate.bbox.translate(vehicle.bbox.x_min, vehicle.bbox.y_min),
                "plate found (full-image coordinates)"
            );

            let Some(plate_img) = self.crop(&vehicle_img, &plate, "plate")? else {
                continue;
            };
            self.save_debug(DebugConfig::PLATES_DIR, &[v_idx + 1, 1], &plate_img)?;

            match self.reader.read_plate_text(&plate_img) {
                Ok(reading) => {
                    candidates.push(PlateCandidate::new(reading.text, reading.confidence));
                }
                Err(e) => warn!(vehicle = v_idx + 1, "{}: {:#}", Stage::Ocr, e),
            }
        }

        Ok(candidates)
    }

    /// Read every plate on the full image, keeping only non-empty text
    fn fallback_search(&self, image: &DynamicImage) -> Result<Vec<PlateCandidate>> {
        let plates = self
            .plates
            .locate_all_plates(image)
            .map_err(|e| PipelineError::capability(Stage::FallbackPlateSearch, e))?;

        let mut candidates = Vec::new();
        for (p_idx, plate) in plates.iter().enumerate() {
            let Some(plate_img) = self.crop(image, plate, "plate")? else {
                continue;
            };
            self.save_debug(DebugConfig::FALLBACK_DIR, &[p_idx + 1], &plate_img)?;

            match self.reader.read_plate_text(&plate_img) {
                Ok(reading) if !reading.text.is_empty() => {
                    candidates.push(PlateCandidate::new(reading.text, reading.confidence));
                }
                Ok(_) => debug!(plate = p_idx + 1, "fallback plate has no readable text"),
                Err(e) => warn!(plate = p_idx + 1, "{}: {:#}", Stage::Ocr, e),
            }
        }

        Ok(candidates)
    }

    /// Crop a detection, treating an empty region as "no detection"
    fn crop(
        &self,
        image: &DynamicImage,
        detection: &Detection,
        what: &str,
    ) -> Result<Option<DynamicImage>> {
        match extract_roi(image, &detection.bbox) {
            Ok(roi) => Ok(Some(roi)),
            Err(e @ PipelineError::InvalidRegion { .. }) => {
                debug!("skipping {}: {}", what, e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn save_debug(&self, step_dir: &str, lineage: &[usize], image: &DynamicImage) -> Result<()> {
        match &self.debug {
            Some(debug_config) => debug_config.save(step_dir, lineage, image),
            None => Ok(()),
        }
    }
}

fn prepare_debug_dir(output_dir: &Path) -> Result<()> {
    if output_dir.exists() {
        let mut entries = std::fs::read_dir(output_dir)
            .map_err(|e| PipelineError::debug_output(output_dir, e))?;
        if entries.next().is_some() {
            return Err(PipelineError::debug_output(
                output_dir,
                "debug directory is not empty",
            ));
        }
    } else {
        std::fs::create_dir_all(output_dir)
            .map_err(|e| PipelineError::debug_output(output_dir, e))?;
    }
    Ok(())
}
