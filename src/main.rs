use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use image::ImageReader;
use serde::Serialize;
use tracing::info;

use platescan::detection::ocr::default_model_dir;
use platescan::detection::{OcrsTextReader, YoloDetector};
use platescan::{LprPipeline, PipelineConfig, PlateCandidate, PlateReport};

#[derive(Parser)]
#[command(name = "platescan")]
#[command(about = "Detect vehicles and read their license plates from an image")]
struct Cli {
    /// Path to input image file
    #[arg(value_name = "IMAGE")]
    image_path: PathBuf,

    /// Vehicle detection model (YOLO, COCO classes)
    #[arg(long, value_name = "PATH")]
    vehicle_model: PathBuf,

    /// License plate detection model (single-class YOLO)
    #[arg(long, value_name = "PATH")]
    plate_model: PathBuf,

    /// Directory holding the ocrs text-detection/text-recognition models
    /// [default: ~/.cache/ocrs]
    #[arg(long, value_name = "DIR")]
    ocr_models: Option<PathBuf>,

    /// TOML file with pipeline settings
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the vehicle confidence threshold
    #[arg(long, value_name = "F")]
    vehicle_conf: Option<f32>,

    /// Override the plate confidence threshold
    #[arg(long, value_name = "F")]
    plate_conf: Option<f32>,

    /// Override the OCR fragment confidence threshold
    #[arg(long, value_name = "F")]
    ocr_conf: Option<f32>,

    /// Equalize plate crops before OCR
    #[arg(long)]
    equalize: bool,

    /// Print every candidate, not only the best one
    #[arg(long)]
    all: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Save debug crops to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    filename: String,
    results: &'a [PlateCandidate],
    best: &'a PlateReport,
}

fn load_config(args: &Cli) -> anyhow::Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_toml_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(conf) = args.vehicle_conf {
        config = config.with_vehicle_confidence(conf);
    }
    if let Some(conf) = args.plate_conf {
        config = config.with_plate_confidence(conf);
    }
    if let Some(conf) = args.ocr_conf {
        config = config.with_ocr_confidence(conf);
    }
    config.validate()?;
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    platescan::init_logging(args.verbose);

    let config = load_config(&args)?;

    info!("Loading image: {}", args.image_path.display());
    let img = ImageReader::open(&args.image_path)?
        .decode()
        .map_err(|e| anyhow::anyhow!("Failed to decode image: {}", e))?;
    info!("Image loaded: {}x{}", img.width(), img.height());

    let ocr_dir = match &args.ocr_models {
        Some(dir) => dir.clone(),
        None => default_model_dir()?,
    };
    let vehicle_detector = YoloDetector::load(&args.vehicle_model, "vehicle detector")?;
    let plate_detector = YoloDetector::load(&args.plate_model, "plate detector")?;
    let text_reader =
        OcrsTextReader::load(&ocr_dir, &config.char_allowlist)?.with_equalize(args.equalize);

    let mut pipeline = LprPipeline::new(
        config,
        Arc::new(vehicle_detector),
        Arc::new(plate_detector),
        Arc::new(text_reader),
    )?;
    if let Some(debug_dir) = &args.debug_out {
        pipeline = pipeline.with_debug(debug_dir)?;
    }

    let results = pipeline
        .run(&img)
        .with_context(|| format!("recognition failed for {}", args.image_path.display()))?;
    let report = PlateReport::from_candidates(&results);

    if args.json {
        let output = JsonOutput {
            filename: args.image_path.display().to_string(),
            results: &results,
            best: &report,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("\n=== License Plate Recognition Results ===");
    match &report.plate_text {
        Some(text) => println!("Plate: {} (confidence: {:.4})", text, report.confidence),
        None => println!("No plate recognized."),
    }

    if args.all && !results.is_empty() {
        println!("\nAll candidates:");
        for (i, candidate) in results.iter().enumerate() {
            let text = if candidate.is_empty() { "<empty>" } else { candidate.text.as_str() };
            println!("  {}. {} (confidence: {:.4})", i + 1, text, candidate.confidence);
        }
    }

    Ok(())
}
