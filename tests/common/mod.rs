#![allow(dead_code)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from platescan for tests
pub use platescan::{
    BoundingBox, Detection, LprPipeline, OcrFragment, PipelineConfig, PipelineError,
    PlateCandidate, PlateReport,
};
