pub mod config;
pub mod detection;
pub mod error;
pub mod models;
pub mod pipeline;

pub use config::PipelineConfig;
pub use detection::{ObjectDetector, TextReader};
pub use error::{PipelineError, Stage};
pub use models::{
    BoundingBox, Detection, OcrFragment, PlateCandidate, PlateReport, best_candidate,
};
pub use pipeline::{DebugConfig, LprPipeline};

/// Install a `tracing` subscriber on stderr, DEBUG when verbose and INFO otherwise
pub fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
