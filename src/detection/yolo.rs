//! YOLO object detector running on rten
//!
//! Expects an ultralytics-style export whose single output has shape
//! `[1, 4 + classes, anchors]`: per anchor a center box (`cx, cy, w, h`) in
//! input pixels followed by one score per class.

use std::cmp::Ordering;
use std::path::Path;

use anyhow::Context;
use image::DynamicImage;
use image::imageops::FilterType;
use rten::Model;
use rten_tensor::prelude::*;
use rten_tensor::{NdTensor, NdTensorView};
use tracing::{debug, info};

use super::ObjectDetector;
use crate::error::{PipelineError, Result};
use crate::models::{BoundingBox, Detection};

pub const DEFAULT_INPUT_SIZE: u32 = 640;
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.45;

/// Parameters for turning raw YOLO output into detections
#[derive(Debug, Clone)]
pub struct DecodeParams<'a> {
    pub confidence_threshold: f32,
    pub class_filter: Option<&'a [u32]>,
    pub iou_threshold: f32,
    /// Scale from model input pixels back to source image pixels
    pub x_factor: f32,
    pub y_factor: f32,
}

pub struct YoloDetector {
    model: Model,
    name: String,
    input_size: u32,
    iou_threshold: f32,
}

impl YoloDetector {
    pub fn load(model_path: &Path, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if !model_path.exists() {
            return Err(PipelineError::unavailable(
                name,
                anyhow::anyhow!("model not found: {}", model_path.display()),
            ));
        }

        info!("Loading {} from {}", name, model_path.display());
        let model = Model::load_file(model_path)
            .with_context(|| format!("loading {}", model_path.display()))
            .map_err(|e| PipelineError::unavailable(name.clone(), e))?;

        Ok(Self {
            model,
            name,
            input_size: DEFAULT_INPUT_SIZE,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
        })
    }

    pub fn with_input_size(mut self, input_size: u32) -> Self {
        self.input_size = input_size;
        self
    }

    pub fn with_iou_threshold(mut self, iou_threshold: f32) -> Self {
        self.iou_threshold = iou_threshold;
        self
    }
}

/// Resize to a square model input and lay it out as a `[1, 3, size, size]` RGB tensor in [0, 1]
pub fn image_to_tensor(image: &DynamicImage, input_size: u32) -> NdTensor<f32, 4> {
    let resized = image
        .resize_exact(input_size, input_size, FilterType::Triangle)
        .to_rgb8();
    let size = input_size as usize;
    let plane = size * size;

    let mut data = vec![0.0f32; 3 * plane];
    for (x, y, pixel) in resized.enumerate_pixels() {
        let offset = y as usize * size + x as usize;
        for c in 0..3 {
            data[c * plane + offset] = pixel[c] as f32 / 255.0;
        }
    }

    NdTensor::from_data([1, 3, size, size], data)
}

/// Decode a `[1, 4 + classes, anchors]` prediction tensor.
///
/// Each anchor keeps its best class. Anchors under the threshold or outside
/// the class filter are dropped, then overlapping boxes of the same class are
/// suppressed. The result is ordered by descending confidence.
pub fn decode_predictions(output: NdTensorView<f32, 3>, params: &DecodeParams) -> Vec<Detection> {
    let [_, rows, anchors] = output.shape();
    if rows < 5 {
        return Vec::new();
    }
    let num_classes = rows - 4;

    let mut candidates = Vec::new();
    for i in 0..anchors {
        let mut best_class = 0usize;
        let mut best_score = f32::MIN;
        for c in 0..num_classes {
            let score = output[[0, 4 + c, i]];
            if score > best_score {
                best_score = score;
                best_class = c;
            }
        }

        if best_score < params.confidence_threshold {
            continue;
        }
        let class_id = best_class as u32;
        if let Some(filter) = params.class_filter {
            if !filter.contains(&class_id) {
                continue;
            }
        }

        let bbox = BoundingBox::from_center(
            output[[0, 0, i]],
            output[[0, 1, i]],
            output[[0, 2, i]],
            output[[0, 3, i]],
        )
        .scale(params.x_factor, params.y_factor);

        candidates.push(Detection::new(bbox, best_score, class_id));
    }

    non_max_suppression(candidates, params.iou_threshold)
}

/// Greedy per-class NMS. Ties keep their input order.
pub fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
    for detection in detections {
        let overlaps = kept.iter().any(|k| {
            k.class_id == detection.class_id && k.bbox.iou(&detection.bbox) > iou_threshold
        });
        if !overlaps {
            kept.push(detection);
        }
    }
    kept
}

impl ObjectDetector for YoloDetector {
    fn detect(
        &self,
        image: &DynamicImage,
        confidence_threshold: f32,
        class_filter: Option<&[u32]>,
    ) -> anyhow::Result<Vec<Detection>> {
        if image.width() == 0 || image.height() == 0 {
            anyhow::bail!("cannot run {} on an empty image", self.name);
        }

        let input = image_to_tensor(image, self.input_size);
        let output = self
            .model
            .run_one(input.view().into(), None)
            .with_context(|| format!("{} inference failed", self.name))?;
        let output: NdTensor<f32, 3> = output
            .try_into()
            .with_context(|| format!("{} returned an unexpected output", self.name))?;

        let params = DecodeParams {
            confidence_threshold,
            class_filter,
            iou_threshold: self.iou_threshold,
            x_factor: image.width() as f32 / self.input_size as f32,
            y_factor: image.height() as f32 / self.input_size as f32,
        };
        let detections = decode_predictions(output.view(), &params);

        debug!(
            detector = %self.name,
            width = image.width(),
            height = image.height(),
            count = detections.len(),
            "inference finished"
        );
        Ok(detections)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
