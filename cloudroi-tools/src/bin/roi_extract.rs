#![warn(clippy::all)]

use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

use anyhow::{anyhow, Context, Result};
use clap::{value_t, App, Arg};
use cloudroi_algorithms::{
    extraction::{extract_roi_with, ExtractionOptions},
    transform::{FrameTransformer, TransformProvider},
};
use cloudroi_core::{cloud::ExtractedCloud, config::RoiConfig, region::RegionDescriptor};
use cloudroi_tools::{ascii, static_transforms::load_transform_buffer};
use log::{info, warn};

struct Args {
    pub input_file: PathBuf,
    pub region_file: PathBuf,
    pub output_file: Option<PathBuf>,
    pub transforms_file: Option<PathBuf>,
    pub config: RoiConfig,
}

fn get_args() -> Result<Args> {
    let matches = App::new("roi-extract")
        .version("0.1")
        .about("Extracts the points behind an image-space region from an organized point cloud")
        .arg(
            Arg::with_name("INPUT")
                .short("i")
                .takes_value(true)
                .value_name("INPUT")
                .help("Organized point cloud in ASCII format")
                .required(true),
        )
        .arg(
            Arg::with_name("REGION")
                .short("r")
                .takes_value(true)
                .value_name("REGION")
                .help("JSON file describing the region (mask, polygon or rect)")
                .required(true),
        )
        .arg(
            Arg::with_name("OUTPUT")
                .short("o")
                .takes_value(true)
                .value_name("OUTPUT")
                .help("Output file for the extracted points. Prints a summary if omitted"),
        )
        .arg(
            Arg::with_name("PADDING")
                .short("p")
                .long("padding")
                .takes_value(true)
                .value_name("PADDING")
                .help("Padding adjustment applied to rect regions"),
        )
        .arg(
            Arg::with_name("REMOVE_OUTLIERS")
                .long("remove-outliers")
                .help("Apply statistical outlier removal to the extracted points"),
        )
        .arg(
            Arg::with_name("CONFIG")
                .short("c")
                .long("config")
                .takes_value(true)
                .value_name("CONFIG")
                .help("JSON config file"),
        )
        .arg(
            Arg::with_name("TARGET_FRAME")
                .long("target-frame")
                .takes_value(true)
                .value_name("FRAME")
                .help("Transform the extracted points into this frame"),
        )
        .arg(
            Arg::with_name("TRANSFORMS")
                .long("transforms")
                .takes_value(true)
                .value_name("TRANSFORMS")
                .help("JSON list of static transforms between frames"),
        )
        .get_matches();

    let required = |name: &str| -> Result<PathBuf> {
        matches
            .value_of(name)
            .map(PathBuf::from)
            .ok_or_else(|| anyhow!("Missing argument {}", name))
    };
    let input_file = required("INPUT")?;
    let region_file = required("REGION")?;

    let mut config = match matches.value_of("CONFIG") {
        Some(path) => RoiConfig::from_path(path)?,
        None => RoiConfig::default(),
    };
    if matches.is_present("PADDING") {
        config.padding_adjustment = value_t!(matches, "PADDING", u32)?;
    }
    if matches.is_present("REMOVE_OUTLIERS") {
        config.remove_outliers = true;
    }
    if let Some(frame) = matches.value_of("TARGET_FRAME") {
        config.target_frame = Some(frame.to_owned());
    }

    Ok(Args {
        input_file,
        region_file,
        output_file: matches.value_of("OUTPUT").map(PathBuf::from),
        transforms_file: matches.value_of("TRANSFORMS").map(PathBuf::from),
        config,
    })
}

fn read_region(path: &Path) -> Result<RegionDescriptor> {
    let file = File::open(path)
        .with_context(|| format!("Could not open region file {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Could not parse region file {}", path.display()))
}

fn print_summary(extracted: &ExtractedCloud) {
    println!("Frame:    {}", extracted.header.frame_id);
    println!("Sequence: {}", extracted.header.sequence);
    println!("Stamp:    {:.6}s", extracted.header.stamp.as_secs_f64());
    println!("Points:   {}", extracted.len());
    if let Some(bounds) = extracted.bounds() {
        let (min, max) = (bounds.min(), bounds.max());
        println!("\tX: {}  {}", min.x, max.x);
        println!("\tY: {}  {}", min.y, max.y);
        println!("\tZ: {}  {}", min.z, max.z);
    }
    if let Some(centroid) = extracted.centroid() {
        println!(
            "Centroid: {} {} {}",
            centroid.x, centroid.y, centroid.z
        );
    }
}

fn main() -> Result<()> {
    pretty_env_logger::init();

    let args = get_args()?;

    let cloud = ascii::read_cloud_from_path(&args.input_file)?;
    info!(
        "Read {}x{} cloud in frame '{}' with {} valid points",
        cloud.width(),
        cloud.height(),
        cloud.header.frame_id,
        cloud.valid_point_count()
    );
    let region = read_region(&args.region_file)?;

    let timer = Instant::now();
    let mut extracted = extract_roi_with(
        &cloud,
        &region,
        &ExtractionOptions::from_config(&args.config),
    )?;
    info!(
        "Extracted {} points from {} region in {:.3}ms",
        extracted.len(),
        region.name(),
        timer.elapsed().as_secs_f64() * 1000.0
    );

    if let Some(target_frame) = &args.config.target_frame {
        let provider = match &args.transforms_file {
            Some(path) => Some(Arc::new(load_transform_buffer(path)?) as Arc<dyn TransformProvider>),
            None => {
                warn!("No transforms file given, points cannot be moved into '{}'", target_frame);
                None
            }
        };
        let transformer = FrameTransformer::from_config(&args.config, provider);
        extracted = transformer.transform_extracted(&extracted, target_frame)?;
    }

    match &args.output_file {
        Some(path) => {
            ascii::write_extracted_to_path(path, &extracted)?;
            info!("Wrote {} points to {}", extracted.len(), path.display());
        }
        None => print_summary(&extracted),
    }

    Ok(())
}
