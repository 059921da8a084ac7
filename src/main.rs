// Command-line runner for the `motion_boxes` library: feeds foreground masks
// from disk through the parallel pipeline and prints or saves the boxes.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use motion_boxes::core_modules::utils::box_writer::{parse_boxes, save_boxes, write_boxes};
use motion_boxes::core_modules::utils::image_helper::save_mask;
use motion_boxes::{
    BoxClusterer, ClustererConfig, DetectionPipeline, MaskConfig, ParallelPipeline, PipelineConfig,
};
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "motion-boxes",
    version,
    about = "Turns foreground masks into merged moving-object bounding boxes",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect boxes in one or more mask images (one frame per file).
    Detect {
        /// Mask images; any nonzero pixel counts as foreground
        #[arg(required = true)]
        masks: Vec<PathBuf>,

        #[command(flatten)]
        clusterer: ClustererArgs,

        /// Radius of the denoising opening (0 disables it)
        #[arg(long, default_value_t = 1)]
        open_radius: u8,

        /// Radius of the fragment-joining dilation (0 disables it)
        #[arg(long, default_value_t = 10)]
        dilate_radius: u8,

        /// Detect on masks resized by this factor, in (0, 1]
        #[arg(long, default_value_t = 1.0)]
        scale: f64,

        /// Worker tasks (defaults to one per CPU)
        #[arg(long)]
        workers: Option<usize>,

        /// Write `<frame_id>.txt` per frame into this directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Also write the cleaned masks as `<frame_id>.png` into this directory
        #[arg(long)]
        save_masks: Option<PathBuf>,
    },

    /// Merge and filter candidate boxes read from a text file (`x1 y1 x2 y2` per line).
    Merge {
        /// Candidate box file
        input: PathBuf,

        #[command(flatten)]
        clusterer: ClustererArgs,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct ClustererArgs {
    /// Boxes closer than this many pixels are merged
    #[arg(long, default_value_t = 30)]
    merge_distance: i32,

    /// Boxes narrower or shorter than this many pixels are dropped
    #[arg(long, default_value_t = 100)]
    min_size: i32,
}

impl From<&ClustererArgs> for ClustererConfig {
    fn from(args: &ClustererArgs) -> Self {
        Self {
            merge_distance: args.merge_distance,
            min_size: args.min_size,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Detect {
            masks,
            clusterer,
            open_radius,
            dilate_radius,
            scale,
            workers,
            output_dir,
            save_masks,
        } => {
            let config = PipelineConfig {
                clusterer: ClustererConfig::from(&clusterer),
                mask: MaskConfig {
                    open_radius,
                    dilate_radius,
                },
                scale,
            };
            run_detect(config, masks, workers, output_dir, save_masks).await
        }
        Commands::Merge {
            input,
            clusterer,
            output,
        } => run_merge(ClustererConfig::from(&clusterer), input, output),
    }
}

async fn run_detect(
    config: PipelineConfig,
    mask_paths: Vec<PathBuf>,
    workers: Option<usize>,
    output_dir: Option<PathBuf>,
    save_masks: Option<PathBuf>,
) -> Result<()> {
    let masks = mask_paths
        .iter()
        .map(|path| {
            image::open(path)
                .map(|img| img.to_luma8())
                .with_context(|| format!("failed to load mask {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;
    info!(frames = masks.len(), "loaded masks");

    for dir in output_dir.iter().chain(save_masks.iter()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory {}", dir.display()))?;
    }

    if let Some(dir) = &save_masks {
        let pipeline = DetectionPipeline::new(config)?;
        for (frame_id, mask) in masks.iter().enumerate() {
            let cleaned = pipeline.preprocessor().clean(&pipeline.working_mask(mask));
            let path = dir.join(format!("{frame_id}.png"));
            save_mask(&path, &cleaned)
                .with_context(|| format!("failed to save mask {}", path.display()))?;
        }
    }

    let pipeline = ParallelPipeline::new(config, workers)?;
    info!(workers = pipeline.worker_count(), "processing frames");
    let results = pipeline.process_batch(masks).await?;
    pipeline.shutdown().await;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for (frame, path) in results.iter().zip(&mask_paths) {
        info!(
            frame_id = frame.frame_id,
            boxes = frame.boxes.len(),
            elapsed_ms = frame.elapsed.as_secs_f64() * 1000.0,
            "frame done"
        );
        writeln!(out, "# frame {} ({})", frame.frame_id, path.display())?;
        write_boxes(&frame.boxes, &mut out)?;

        if let Some(dir) = &output_dir {
            let file = dir.join(format!("{}.txt", frame.frame_id));
            save_boxes(&frame.boxes, &file)
                .with_context(|| format!("failed to save boxes to {}", file.display()))?;
            debug!(path = %file.display(), "saved boxes");
        }
    }

    Ok(())
}

fn run_merge(config: ClustererConfig, input: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let text = std::fs::read_to_string(&input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let candidates = parse_boxes(&text)?;
    let clusterer = BoxClusterer::from_config(config)?;

    let boxes = clusterer.detect(candidates.iter().copied());
    info!(candidates = candidates.len(), boxes = boxes.len(), "merged boxes");

    match output {
        Some(path) => save_boxes(&boxes, &path)
            .with_context(|| format!("failed to save boxes to {}", path.display()))?,
        None => write_boxes(&boxes, std::io::stdout().lock())?,
    }
    Ok(())
}
