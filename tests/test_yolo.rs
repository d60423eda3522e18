mod common;

use common::*;
use image::{DynamicImage, ImageBuffer, Rgb};
use platescan::detection::yolo::{DecodeParams, decode_predictions, image_to_tensor, non_max_suppression};
use rten_tensor::NdTensor;
use rten_tensor::prelude::*;

/// Three anchors, two classes. Rows: cx, cy, w, h, score(class 0), score(class 1).
/// Anchor 1 overlaps anchor 0 heavily with a lower class-0 score.
fn sample_output() -> NdTensor<f32, 3> {
    #[rustfmt::skip]
    let data = vec![
        50.0, 52.0, 200.0,
        50.0, 50.0, 200.0,
        20.0, 20.0, 40.0,
        10.0, 10.0, 40.0,
        0.9,  0.8,  0.1,
        0.1,  0.05, 0.6,
    ];
    NdTensor::from_data([1, 6, 3], data)
}

fn params(confidence_threshold: f32, class_filter: Option<&[u32]>) -> DecodeParams<'_> {
    DecodeParams {
        confidence_threshold,
        class_filter,
        iou_threshold: 0.45,
        x_factor: 1.0,
        y_factor: 1.0,
    }
}

#[test]
fn test_decode_keeps_best_class_and_suppresses_overlaps() {
    let output = sample_output();

    let detections = decode_predictions(output.view(), &params(0.5, None));

    assert_eq!(
        detections,
        vec![
            Detection::new(bbox(40.0, 45.0, 60.0, 55.0), 0.9, 0),
            Detection::new(bbox(180.0, 180.0, 220.0, 220.0), 0.6, 1),
        ]
    );
}

#[test]
fn test_decode_applies_class_filter() {
    let output = sample_output();
    let only_class_1 = [1u32];

    let detections = decode_predictions(output.view(), &params(0.5, Some(&only_class_1)));

    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].class_id, 1);
}

#[test]
fn test_decode_applies_threshold() {
    let output = sample_output();

    assert!(decode_predictions(output.view(), &params(0.95, None)).is_empty());
}

#[test]
fn test_decode_scales_back_to_source_image() {
    let output = sample_output();
    let mut scaled = params(0.7, None);
    scaled.x_factor = 2.0;
    scaled.y_factor = 0.5;

    let detections = decode_predictions(output.view(), &scaled);

    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].bbox, bbox(80.0, 22.5, 120.0, 27.5));
}

#[test]
fn test_decode_rejects_headless_output() {
    let output = NdTensor::from_data([1, 4, 2], vec![0.0f32; 8]);

    assert!(decode_predictions(output.view(), &params(0.0, None)).is_empty());
}

#[test]
fn test_nms_is_per_class_and_stable() {
    let a = Detection::new(bbox(0.0, 0.0, 10.0, 10.0), 0.5, 0);
    let b = Detection::new(bbox(50.0, 50.0, 60.0, 60.0), 0.5, 0);
    // Same place as `a` but a different class survives
    let c = Detection::new(bbox(0.0, 0.0, 10.0, 10.0), 0.4, 1);
    // Same place and class as `a`, lower score, suppressed
    let d = Detection::new(bbox(1.0, 0.0, 11.0, 10.0), 0.45, 0);

    let kept = non_max_suppression(vec![a, b, c, d], 0.45);

    assert_eq!(kept, vec![a, b, c]);
}

#[test]
fn test_image_to_tensor_layout() {
    let red = DynamicImage::ImageRgb8(ImageBuffer::from_fn(8, 4, |_, _| Rgb([255u8, 0, 0])));

    let tensor = image_to_tensor(&red, 16);

    assert_eq!(tensor.shape(), [1, 3, 16, 16]);
    assert!(tensor[[0, 0, 7, 7]] > 0.99);
    assert!(tensor[[0, 1, 7, 7]] < 0.01);
    assert!(tensor[[0, 2, 15, 0]] < 0.01);
}
