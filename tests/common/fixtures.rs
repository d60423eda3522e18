use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use image::{DynamicImage, ImageBuffer, Rgb};
use platescan::{
    BoundingBox, Detection, LprPipeline, ObjectDetector, OcrFragment, PipelineConfig, TextReader,
};

/// Creates a uniform gray RGB test image
pub fn create_test_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(ImageBuffer::from_fn(width, height, |_, _| {
        Rgb([128u8, 128u8, 128u8])
    }))
}

pub fn bbox(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> BoundingBox {
    BoundingBox::new(x_min, y_min, x_max, y_max)
}

pub fn det(x_min: f32, y_min: f32, x_max: f32, y_max: f32, confidence: f32) -> Detection {
    Detection::new(bbox(x_min, y_min, x_max, y_max), confidence, 0)
}

pub fn car(x_min: f32, y_min: f32, x_max: f32, y_max: f32, confidence: f32) -> Detection {
    Detection::new(bbox(x_min, y_min, x_max, y_max), confidence, 2)
}

pub fn fragment(text: &str, confidence: f32) -> OcrFragment {
    OcrFragment::new(bbox(0.0, 0.0, 10.0, 10.0), text, confidence)
}

/// One recorded detector invocation
#[derive(Debug, Clone, PartialEq)]
pub struct DetectCall {
    pub width: u32,
    pub height: u32,
    pub threshold: f32,
    pub class_filter: Option<Vec<u32>>,
}

/// Detector that replays a queue of scripted responses, one per call.
/// Once the script runs out it detects nothing.
pub struct ScriptedDetector {
    name: String,
    responses: Mutex<VecDeque<anyhow::Result<Vec<Detection>>>>,
    calls: Mutex<Vec<DetectCall>>,
}

impl ScriptedDetector {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            responses: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn then(self, detections: Vec<Detection>) -> Self {
        self.responses.lock().unwrap().push_back(Ok(detections));
        self
    }

    pub fn then_fail(self, message: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(anyhow::anyhow!(message.to_string())));
        self
    }

    pub fn calls(&self) -> Vec<DetectCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl ObjectDetector for ScriptedDetector {
    fn detect(
        &self,
        image: &DynamicImage,
        confidence_threshold: f32,
        class_filter: Option<&[u32]>,
    ) -> anyhow::Result<Vec<Detection>> {
        self.calls.lock().unwrap().push(DetectCall {
            width: image.width(),
            height: image.height(),
            threshold: confidence_threshold,
            class_filter: class_filter.map(|c| c.to_vec()),
        });
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Text reader that replays scripted fragment lists and records crop sizes
pub struct ScriptedReader {
    responses: Mutex<VecDeque<anyhow::Result<Vec<OcrFragment>>>>,
    calls: Mutex<Vec<(u32, u32, String)>>,
}

impl ScriptedReader {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn then(self, fragments: Vec<OcrFragment>) -> Self {
        self.responses.lock().unwrap().push_back(Ok(fragments));
        self
    }

    pub fn then_fail(self, message: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(anyhow::anyhow!(message.to_string())));
        self
    }

    /// (width, height, allowlist) of every crop read
    pub fn calls(&self) -> Vec<(u32, u32, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl TextReader for ScriptedReader {
    fn read(&self, image: &DynamicImage, allowlist: &str) -> anyhow::Result<Vec<OcrFragment>> {
        self.calls
            .lock()
            .unwrap()
            .push((image.width(), image.height(), allowlist.to_string()));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Handles to the fakes wired into a pipeline, kept for call inspection
pub struct Harness {
    pub pipeline: LprPipeline,
    pub vehicles: Arc<ScriptedDetector>,
    pub plates: Arc<ScriptedDetector>,
    pub reader: Arc<ScriptedReader>,
}

pub fn build_pipeline(
    vehicles: ScriptedDetector,
    plates: ScriptedDetector,
    reader: ScriptedReader,
) -> Harness {
    build_pipeline_with(PipelineConfig::default(), vehicles, plates, reader)
}

pub fn build_pipeline_with(
    config: PipelineConfig,
    vehicles: ScriptedDetector,
    plates: ScriptedDetector,
    reader: ScriptedReader,
) -> Harness {
    let vehicles = Arc::new(vehicles);
    let plates = Arc::new(plates);
    let reader = Arc::new(reader);
    let pipeline = LprPipeline::new(config, vehicles.clone(), plates.clone(), reader.clone())
        .expect("Failed to build pipeline");
    Harness {
        pipeline,
        vehicles,
        plates,
        reader,
    }
}
