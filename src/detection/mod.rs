pub mod ocr;
pub mod plate;
pub mod preprocessing;
pub mod roi;
pub mod vehicle;
pub mod yolo;

use image::DynamicImage;

use crate::models::{Detection, OcrFragment};

pub use ocr::{CharacterReader, OcrsTextReader, PlateReading};
pub use plate::PlateLocator;
pub use roi::extract_roi;
pub use vehicle::VehicleLocator;
pub use yolo::YoloDetector;

/// Object detection capability (vehicles or plates)
///
/// Implementations are loaded up front and must tolerate concurrent
/// read-only calls, since one pipeline may serve several threads.
pub trait ObjectDetector: Send + Sync {
    /// Detect objects scoring at least `confidence_threshold`, restricted to
    /// `class_filter` when given. Boxes are in `image`'s pixel space.
    fn detect(
        &self,
        image: &DynamicImage,
        confidence_threshold: f32,
        class_filter: Option<&[u32]>,
    ) -> anyhow::Result<Vec<Detection>>;

    /// Human-readable name (used in logs)
    fn name(&self) -> &str;
}

/// Text recognition capability for small crops
pub trait TextReader: Send + Sync {
    /// Read text restricted to the characters in `allowlist`. Fragments come
    /// back in the reader's own order.
    fn read(&self, image: &DynamicImage, allowlist: &str) -> anyhow::Result<Vec<OcrFragment>>;

    fn name(&self) -> &str;
}
