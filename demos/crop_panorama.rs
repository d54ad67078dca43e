//! Panorama Cropping Example
//!
//! Proposes crops for one or more panoramas, scores every crop and writes the crops
//! together with a JSON report.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example crop_panorama -- [OPTIONS] <IMAGES>...
//! ```
//!
//! # Arguments
//!
//! * `-c, --config` - TOML or JSON pipeline configuration
//! * `-n, --top-n` - Number of crops per request (default: configured default)
//! * `--method` - Saliency method: `frequency_tuned` or `srm`
//! * `--context` - Plain-text scene description forwarded to the advisor
//! * `--quota` - Treat the images as candidates filling one shared quota
//! * `-o, --output-dir` - Directory for crops and `crops.json`
//! * `<IMAGES>...` - Input panoramas
//!
//! # Example
//!
//! ```bash
//! cargo run --example crop_panorama -- \
//!     -c panocrop.toml -n 3 --method srm \
//!     -o output/ lake.jpg
//! ```

use clap::Parser;
use panocrop::advisory::read_context_text;
use panocrop::core::ConfigLoader;
use panocrop::core::config::PipelineConfig;
use panocrop::domain::CropRecord;
use panocrop::pipeline::{CropRequest, PanoramaPipeline, PanoramaResult, records_to_json};
use panocrop::processors::SaliencyMethod;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info};

/// Command-line arguments for the panorama cropping example
#[derive(Parser)]
#[command(name = "crop_panorama")]
#[command(about = "Panorama Cropping Example - proposes and scores crops")]
struct Args {
    /// Pipeline configuration file (.toml or .json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Paths to input panoramas
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Number of crops to produce
    #[arg(short = 'n', long)]
    top_n: Option<usize>,

    /// Saliency method (frequency_tuned or srm)
    #[arg(long)]
    method: Option<SaliencyMethod>,

    /// Scene description file forwarded to the remote advisor
    #[arg(long)]
    context: Option<PathBuf>,

    /// Fill one shared quota of crops from all images instead of top_n per image
    #[arg(long)]
    quota: bool,

    /// Directory to save crops and the JSON report
    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("panorama")
        .to_string()
}

fn save_result(
    source: &Path,
    result: &PanoramaResult,
    output_dir: &Path,
) -> Result<Vec<CropRecord>, Box<dyn std::error::Error>> {
    let stem = stem(source);
    let records = result.records(|i, _| format!("{}_crop_{}.jpg", stem, i + 1));
    for (record, processed) in records.iter().zip(&result.crops) {
        processed
            .crop
            .image
            .save(output_dir.join(&record.crop_filename))?;
    }
    Ok(records)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    panocrop::utils::init_tracing();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => PipelineConfig::default(),
    };
    let pipeline = PanoramaPipeline::builder(config).build()?;

    let mut request = CropRequest::new().context_text(read_context_text(args.context.as_deref()));
    request.top_n = args.top_n;
    request.saliency_method = args.method;

    fs::create_dir_all(&args.output_dir)?;
    let start = Instant::now();
    let mut records = Vec::new();

    if args.quota {
        let results = pipeline.process_many_paths(args.images.iter(), &request)?;
        for (path, result) in &results {
            records.extend(save_result(path, result, &args.output_dir)?);
        }
    } else {
        for path in &args.images {
            match pipeline.process_path(path, &request) {
                Ok(result) => records.extend(save_result(path, &result, &args.output_dir)?),
                Err(e) => error!("Failed to process {}: {}", path.display(), e),
            }
        }
    }

    let report = args.output_dir.join("crops.json");
    fs::write(&report, records_to_json(&records)?)?;
    info!(
        "Wrote {} crops and {} in {:.2?}",
        records.len(),
        report.display(),
        start.elapsed()
    );
    Ok(())
}
