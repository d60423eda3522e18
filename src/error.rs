use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::models::BoundingBox;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Stage of a pipeline run, used to label capability failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    VehicleSearch,
    PlateSearch,
    Ocr,
    FallbackPlateSearch,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::VehicleSearch => "vehicle search",
            Stage::PlateSearch => "plate search",
            Stage::Ocr => "character recognition",
            Stage::FallbackPlateSearch => "fallback plate search",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Box is zero-area once clamped to the image. Recovered by skipping the detection.
    #[error("region {bbox} is empty inside a {image_width}x{image_height} image")]
    InvalidRegion {
        bbox: BoundingBox,
        image_width: u32,
        image_height: u32,
    },

    #[error("{capability} is unavailable")]
    CapabilityUnavailable {
        capability: String,
        #[source]
        source: BoxError,
    },

    #[error("{stage} failed")]
    Capability {
        stage: Stage,
        #[source]
        source: BoxError,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to write debug output to {}", path.display())]
    DebugOutput {
        path: PathBuf,
        #[source]
        source: BoxError,
    },
}

impl PipelineError {
    pub fn unavailable(capability: impl Into<String>, source: anyhow::Error) -> Self {
        Self::CapabilityUnavailable {
            capability: capability.into(),
            source: source.into(),
        }
    }

    pub fn capability(stage: Stage, source: anyhow::Error) -> Self {
        Self::Capability {
            stage,
            source: source.into(),
        }
    }

    pub fn debug_output(path: impl Into<PathBuf>, source: impl Into<BoxError>) -> Self {
        Self::DebugOutput {
            path: path.into(),
            source: source.into(),
        }
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
