use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use catface_core::alignment::domain::face_aligner::FaceAligner;
use catface_core::detection::domain::face_locator::FaceLocator;
use catface_core::detection::domain::region_detector::{DetectorParams, RegionDetector};
use catface_core::detection::infrastructure::cascade_detector::CascadeDetector;
use catface_core::eye_color::domain::eye_color_classifier::EyeColorClassifier;
use catface_core::eye_color::domain::palette::{EyeColor, EyePalette};
use catface_core::eye_color::infrastructure::palette_file::load_palette;
use catface_core::identification::domain::color_filter::consensus_color;
use catface_core::identification::infrastructure::gallery_images::scan_labeled_images;
use catface_core::identification::infrastructure::lbph_recognizer::LbphRecognizer;
use catface_core::identification::infrastructure::registry_file::load_registry;
use catface_core::io::domain::image_reader::ImageReader;
use catface_core::io::infrastructure::image_file_reader::ImageFileReader;
use catface_core::io::infrastructure::image_file_writer::ImageFileWriter;
use catface_core::pipeline::align_face_use_case::AlignFaceUseCase;
use catface_core::pipeline::evaluate_use_case::{probes_in, EvaluateUseCase};
use catface_core::pipeline::identify_use_case::{eye_candidates, IdentifyUseCase};
use catface_core::pipeline::infrastructure::threaded_batch_executor::ThreadedBatchExecutor;
use catface_core::pipeline::pipeline_config::PipelineConfig;
use catface_core::pipeline::pipeline_logger::LogPipelineLogger;
use catface_core::shared::constants::GALLERY_REGISTRY_NAME;
use catface_core::shared::model_resolver;

/// Cat face identification with eye-colour assisted re-ranking.
#[derive(Parser)]
#[command(name = "catface")]
struct Cli {
    /// JSON pipeline config (defaults to the per-user config file, if any).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory searched first for cascade models.
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rank gallery subjects for a probe image.
    Identify {
        image: PathBuf,
        /// Gallery directory with one `s<id>` folder per subject.
        #[arg(long)]
        gallery: PathBuf,
        /// Gallery eye colour registry (defaults to the one inside the gallery).
        #[arg(long)]
        registry: Option<PathBuf>,
        /// Number of candidates to print.
        #[arg(long, default_value = "5")]
        top: usize,
    },
    /// Write the eye-aligned face of an image.
    Align { image: PathBuf, output: PathBuf },
    /// Print candidate eye colours for an image.
    Eyes { image: PathBuf },
    /// Rank-1 identification rate over a labelled probe set.
    Evaluate {
        #[arg(long)]
        gallery: PathBuf,
        #[arg(long)]
        registry: Option<PathBuf>,
        /// Probe directory with one `s<id>` folder per subject.
        #[arg(long)]
        probes: PathBuf,
        /// Worker threads (defaults to the number of cores).
        #[arg(long)]
        workers: Option<usize>,
    },
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = PipelineConfig::load_or_default(cli.config.as_deref())?;
    let model_dir = cli.model_dir.as_deref();

    match cli.command {
        Command::Identify {
            image,
            gallery,
            registry,
            top,
        } => run_identify(&config, model_dir, &image, &gallery, registry.as_deref(), top),
        Command::Align { image, output } => run_align(&config, model_dir, &image, &output),
        Command::Eyes { image } => run_eyes(&config, model_dir, &image),
        Command::Evaluate {
            gallery,
            registry,
            probes,
            workers,
        } => run_evaluate(
            &config,
            model_dir,
            &gallery,
            registry.as_deref(),
            &probes,
            workers,
        ),
    }
}

fn run_identify(
    config: &PipelineConfig,
    model_dir: Option<&Path>,
    image: &Path,
    gallery: &Path,
    registry: Option<&Path>,
    top: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let use_case = build_identify(config, model_dir, gallery, registry)?;
    let identification = use_case.execute_path(image)?;

    if identification.ranking.is_empty() {
        println!("No candidates for {}", image.display());
        return Ok(());
    }
    for (i, eye) in identification.eye_colors.iter().enumerate() {
        println!("Eye {}: {}", i + 1, join_colors(eye));
    }
    println!(
        "Allow-list: {} of {} subjects",
        identification.allow_list.len(),
        use_case.registry().gallery_size()
    );
    for (rank, c) in identification.ranking.truncated(top).candidates().iter().enumerate() {
        println!("{:>3}. s{:<4} {:10.3}", rank + 1, c.subject_id, c.distance);
    }
    Ok(())
}

fn run_align(
    config: &PipelineConfig,
    model_dir: Option<&Path>,
    image: &Path,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let use_case = AlignFaceUseCase::new(
        build_locator(config, model_dir)?,
        FaceAligner::new(config.alignment),
        Box::new(ImageFileReader::new()),
        Box::new(ImageFileWriter::new()),
    );
    if use_case.execute(image, output)? {
        log::info!("Aligned face written to {}", output.display());
    } else {
        return Err(format!("Could not locate two eyes in {}", image.display()).into());
    }
    Ok(())
}

fn run_eyes(
    config: &PipelineConfig,
    model_dir: Option<&Path>,
    image: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let locator = build_locator(config, model_dir)?;
    let classifier = build_classifier(config)?;
    let frame = ImageFileReader::new().read(image)?;

    let located = locator.locate(&frame)?;
    let colors = eye_candidates(&located, &classifier);
    if colors.is_empty() {
        println!("No eyes detected");
        return Ok(());
    }
    for (i, eye) in colors.iter().enumerate() {
        println!("Eye {}: {}", i + 1, join_colors(eye));
    }
    if let [left, right] = colors.as_slice() {
        println!("Consensus: {}", join_colors(&consensus_color(left, right)));
    }
    Ok(())
}

fn run_evaluate(
    config: &PipelineConfig,
    model_dir: Option<&Path>,
    gallery: &Path,
    registry: Option<&Path>,
    probes: &Path,
    workers: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let use_case = Arc::new(build_identify(config, model_dir, gallery, registry)?);
    let executor = match workers {
        Some(n) => ThreadedBatchExecutor::new(n),
        None => ThreadedBatchExecutor::with_available_parallelism(),
    };
    let probes = probes_in(probes)?;
    let mut logger = LogPipelineLogger::default();

    let report = EvaluateUseCase::new(use_case, Box::new(executor)).execute(&probes, &mut logger)?;
    println!(
        "Probes: {}  ranked: {}  failed: {}",
        report.probes, report.ranked, report.failed
    );
    println!("Rank-1 with eye colour:    {:5.1}%", report.fused_rate() * 100.0);
    println!("Rank-1 without eye colour: {:5.1}%", report.unfiltered_rate() * 100.0);
    Ok(())
}

fn build_identify(
    config: &PipelineConfig,
    model_dir: Option<&Path>,
    gallery: &Path,
    registry: Option<&Path>,
) -> Result<IdentifyUseCase, Box<dyn std::error::Error>> {
    let registry = match registry {
        Some(path) => load_registry(path)?,
        None => load_registry(&gallery.join(GALLERY_REGISTRY_NAME))?,
    };
    let registry = Arc::new(registry);
    let reader = ImageFileReader::new();

    let mut samples = Vec::new();
    for (subject_id, path) in scan_labeled_images(gallery)? {
        samples.push((subject_id, reader.read(&path)?));
    }
    let recognizer =
        LbphRecognizer::enroll(config.lbph, config.recognizer_input_size, samples)?;

    Ok(IdentifyUseCase::new(
        build_locator(config, model_dir)?,
        FaceAligner::new(config.alignment),
        Box::new(recognizer),
        build_classifier(config)?,
        registry,
        Box::new(reader),
    ))
}

fn build_locator(
    config: &PipelineConfig,
    model_dir: Option<&Path>,
) -> Result<FaceLocator, Box<dyn std::error::Error>> {
    let faces = build_detector(&config.face_cascade, config.face_detector, model_dir)?;
    let eyes = build_detector(&config.eye_cascade, config.eye_detector, model_dir)?;
    Ok(FaceLocator::new(faces, eyes))
}

fn build_detector(
    name: &str,
    params: DetectorParams,
    model_dir: Option<&Path>,
) -> Result<Box<dyn RegionDetector>, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {name}");
    let path = model_resolver::resolve(name, model_dir)?;
    Ok(Box::new(CascadeDetector::from_file(&path, params)?))
}

fn build_classifier(
    config: &PipelineConfig,
) -> Result<EyeColorClassifier, Box<dyn std::error::Error>> {
    let palette = match &config.palette {
        Some(path) => load_palette(path)?,
        None => EyePalette::default(),
    };
    Ok(EyeColorClassifier::new(Arc::new(palette), config.tie_tolerance))
}

fn join_colors<'a>(colors: impl IntoIterator<Item = &'a EyeColor>) -> String {
    colors
        .into_iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
