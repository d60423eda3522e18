use serde::Serialize;
use std::fmt;

/// Axis-aligned box in the pixel space of the image it was detected on
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

/// Integer pixel rectangle, the result of coercing a `BoundingBox`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x_min: i64,
    pub y_min: i64,
    pub x_max: i64,
    pub y_max: i64,
}

impl BoundingBox {
    pub fn new(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> Self {
        Self { x_min, y_min, x_max, y_max }
    }

    /// Build from a center point and size, as YOLO heads report boxes
    pub fn from_center(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Self {
            x_min: cx - 0.5 * width,
            y_min: cy - 0.5 * height,
            x_max: cx + 0.5 * width,
            y_max: cy + 0.5 * height,
        }
    }

    pub fn width(&self) -> f32 {
        (self.x_max - self.x_min).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y_max - self.y_min).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn is_empty(&self) -> bool {
        self.area() == 0.0
    }

    /// Intersection over union with another box
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let ix = (self.x_max.min(other.x_max) - self.x_min.max(other.x_min)).max(0.0);
        let iy = (self.y_max.min(other.y_max) - self.y_min.max(other.y_min)).max(0.0);
        let intersection = ix * iy;
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            return 0.0;
        }
        intersection / union
    }

    /// Coerce to integer pixels, truncating toward zero
    pub fn to_pixel_rect(&self) -> PixelRect {
        PixelRect {
            x_min: self.x_min.trunc() as i64,
            y_min: self.y_min.trunc() as i64,
            x_max: self.x_max.trunc() as i64,
            y_max: self.y_max.trunc() as i64,
        }
    }

    /// Shift the box, e.g. to move a crop-local box into its parent's coordinates
    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        Self {
            x_min: self.x_min + dx,
            y_min: self.y_min + dy,
            x_max: self.x_max + dx,
            y_max: self.y_max + dy,
        }
    }

    /// Scale each axis independently
    pub fn scale(&self, x_factor: f32, y_factor: f32) -> Self {
        Self {
            x_min: self.x_min * x_factor,
            y_min: self.y_min * y_factor,
            x_max: self.x_max * x_factor,
            y_max: self.y_max * y_factor,
        }
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.1}, {:.1}, {:.1}, {:.1}]",
            self.x_min, self.y_min, self.x_max, self.y_max
        )
    }
}

/// A detector hit. `class_id` is meaningless for the single-class plate detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub class_id: u32,
}

impl Detection {
    pub fn new(bbox: BoundingBox, confidence: f32, class_id: u32) -> Self {
        Self { bbox, confidence, class_id }
    }
}

/// One piece of text reported by a text reader, box local to the plate crop
#[derive(Debug, Clone, PartialEq)]
pub struct OcrFragment {
    pub bbox: BoundingBox,
    pub text: String,
    pub confidence: f32,
}

impl OcrFragment {
    pub fn new(bbox: BoundingBox, text: impl Into<String>, confidence: f32) -> Self {
        Self {
            bbox,
            text: text.into(),
            confidence,
        }
    }
}

/// A recognized-plate hypothesis produced by a pipeline run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlateCandidate {
    pub text: String,
    pub confidence: f32,
}

impl PlateCandidate {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Candidate with the highest confidence; the earliest one wins a tie
pub fn best_candidate(candidates: &[PlateCandidate]) -> Option<&PlateCandidate> {
    let mut best: Option<&PlateCandidate> = None;
    for candidate in candidates {
        match best {
            Some(current) if candidate.confidence <= current.confidence => {}
            _ => best = Some(candidate),
        }
    }
    best
}

/// Presentation form of a run: the best candidate, confidence rounded to 4 digits
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlateReport {
    pub plate_text: Option<String>,
    pub confidence: f64,
}

impl PlateReport {
    pub fn from_candidates(candidates: &[PlateCandidate]) -> Self {
        match best_candidate(candidates) {
            Some(best) => Self {
                plate_text: (!best.text.is_empty()).then(|| best.text.clone()),
                confidence: round_confidence(best.confidence),
            },
            None => Self {
                plate_text: None,
                confidence: 0.0,
            },
        }
    }

    pub fn is_recognized(&self) -> bool {
        self.plate_text.is_some()
    }
}

pub fn round_confidence(confidence: f32) -> f64 {
    (confidence as f64 * 10_000.0).round() / 10_000.0
}
