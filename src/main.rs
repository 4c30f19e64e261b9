//! # Hugo Image Optimizer - Main Entry Point
//!
//! Punto di ingresso della CLI `image-optimizer`.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti con `clap` (sottocomandi)
//! - Inizializzazione del logging con `tracing` (su stderr, così stdout resta
//!   pulito per l'output JSON)
//! - Caricamento della policy da file e override da command line
//! - Avvio della pipeline e scrittura dei risultati
//!
//! ## Sottocomandi:
//! - `probe`: Formati di output disponibili
//! - `optimize`: Batch di immagini, opzionalmente scritte in un progetto Hugo
//! - `suggest`: Solo analisi e raccomandazioni
//! - `thumbnail`: Miniatura di una immagine
//! - `convert`: Conversione di formato
//!
//! ## Esempio di utilizzo:
//! ```bash
//! image-optimizer optimize ./uploads --project ~/blog --slug my-post --quality 0.8
//! image-optimizer suggest ./uploads/cover.png --json
//! ```

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hugo_image_optimizer::{
    file_manager::{FileManager, UploadLimits},
    json_output::{JsonConfig, JsonMessage},
    progress::{ProgressManager, RunStats},
    sink::{sanitize_segment, DEFAULT_CATEGORY},
    FileSink, FormatSupport, ImageBackend, ImageOptimizer, OptimizationOutcome, OutputFormat,
    PolicyOptions,
};

#[derive(Parser)]
#[command(name = "image-optimizer")]
#[command(about = "Analyze, re-encode and resize images for a Hugo site")]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Report which output formats this build can encode
    Probe {
        #[arg(long)]
        json: bool,
    },

    /// Optimize images and optionally store them in a Hugo project
    Optimize {
        /// Image files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Hugo project root; results are stored under static/images
        #[arg(short, long)]
        project: Option<PathBuf>,

        #[arg(long, default_value = DEFAULT_CATEGORY)]
        category: String,

        /// Article slug used as sub-folder
        #[arg(long)]
        slug: Option<String>,

        /// Max images optimized concurrently
        #[arg(long)]
        chunk: Option<usize>,

        /// Analyze and encode but don't write anything
        #[arg(long)]
        dry_run: bool,

        /// Emit JSON messages on stdout
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        policy: PolicyArgs,
    },

    /// Analyze images and print optimization suggestions
    Suggest {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[arg(long)]
        json: bool,
    },

    /// Create a thumbnail of one image
    Thumbnail {
        path: PathBuf,

        /// Bounding box side in pixels (policy thumbnail size by default)
        #[arg(short, long)]
        size: Option<u32>,

        /// Output directory (next to the input by default)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        policy: PolicyArgs,
    },

    /// Convert one image to another format
    Convert {
        path: PathBuf,

        /// Target format (webp, avif, jpeg, png)
        #[arg(short, long)]
        to: OutputFormat,

        /// Request progressive scans (jpeg only)
        #[arg(long)]
        progressive: bool,

        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        policy: PolicyArgs,
    },
}

/// Policy overrides shared by the encoding subcommands
#[derive(Args)]
struct PolicyArgs {
    /// Policy file (defaults to ~/.image-optimizer/policy.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Default quality in (0, 1]
    #[arg(short, long)]
    quality: Option<f32>,

    #[arg(long)]
    max_width: Option<u32>,

    #[arg(long)]
    max_height: Option<u32>,

    /// Preferred output format
    #[arg(long)]
    format: Option<OutputFormat>,

    /// Crop to the target aspect ratio instead of scaling the whole frame
    #[arg(long)]
    smart_crop: bool,
}

impl PolicyArgs {
    async fn load(&self) -> Result<PolicyOptions> {
        let mut policy = match self.config.clone().or_else(PolicyOptions::default_path) {
            Some(path) => PolicyOptions::from_file(&path).await?,
            None => PolicyOptions::default(),
        };

        if let Some(quality) = self.quality {
            policy.default_quality = quality;
        }
        if let Some(max_width) = self.max_width {
            policy.max_width = max_width;
        }
        if let Some(max_height) = self.max_height {
            policy.max_height = max_height;
        }
        if let Some(format) = self.format {
            policy.preferred_format = format;
        }
        if self.smart_crop {
            policy.enable_smart_crop = true;
        }

        policy.validate()?;
        Ok(policy)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Probe { json } => probe(json),
        Command::Optimize {
            paths,
            project,
            category,
            slug,
            chunk,
            dry_run,
            json,
            policy,
        } => {
            let mut policy = policy.load().await?;
            if let Some(chunk) = chunk {
                policy.max_concurrent_batch_items = chunk;
                policy.validate()?;
            }
            let sink = project.map(|root| {
                FileSink::new(root)
                    .with_category(&category)
                    .with_article_slug(slug.as_deref())
            });
            let result = optimize(&paths, policy, sink, dry_run, json).await;
            if let (Err(e), true) = (&result, json) {
                JsonMessage::error(e.to_string(), None).emit();
            }
            result
        }
        Command::Suggest { paths, json } => suggest(&paths, json).await,
        Command::Thumbnail {
            path,
            size,
            output,
            policy,
        } => {
            let optimizer = ImageOptimizer::new(policy.load().await?)?;
            let image = FileManager::load_image(&path).await?;
            let outcome = optimizer.create_thumbnail(&image, size).await?;
            let suffix = format!("thumb-{}", outcome.optimized.width.max(outcome.optimized.height));
            write_next_to(&path, output.as_deref(), &suffix, &outcome).await
        }
        Command::Convert {
            path,
            to,
            progressive,
            output,
            policy,
        } => {
            let policy = policy.load().await?;
            let quality = policy.default_quality;
            let optimizer = ImageOptimizer::new(policy)?;
            let image = FileManager::load_image(&path).await?;
            let outcome = if progressive && to == OutputFormat::Jpeg {
                optimizer.create_progressive_jpeg(&image, quality).await?
            } else {
                if progressive {
                    warn!("--progressive only applies to jpeg, ignoring");
                }
                optimizer.convert_format(&image, to, quality).await?
            };
            write_next_to(&path, output.as_deref(), "converted", &outcome).await
        }
    }
}

fn probe(json: bool) -> Result<()> {
    let support = FormatSupport::probe(&ImageBackend);
    if json {
        JsonMessage::probe(support).emit();
    } else {
        for format in OutputFormat::ALL {
            let mark = if support.supports(format) { "✅" } else { "❌" };
            println!("{} {}", mark, format);
        }
    }
    Ok(())
}

async fn optimize(
    paths: &[PathBuf],
    policy: PolicyOptions,
    sink: Option<FileSink>,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let started = Instant::now();
    let mut stats = RunStats::new();

    let spinner = (!json).then(|| ProgressManager::spinner("Loading images..."));
    let files = FileManager::find_image_files(paths)?;
    let images = FileManager::load_images(&files).await?;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let (accepted, rejected) = FileManager::filter_uploadable(images, &UploadLimits::default());
    for (image, reason) in &rejected {
        warn!("Skipping {}: {}", image.name().unwrap_or("<memory>"), reason);
        stats.add_rejected();
    }

    if json {
        JsonMessage::start(accepted.len(), rejected.len(), JsonConfig::new(&policy, dry_run)).emit();
    }
    if sink.is_none() && !dry_run {
        info!("No --project given, results will not be written");
    }

    let optimizer = ImageOptimizer::new(policy.clone())?;
    let progress = if json {
        ProgressManager::hidden()
    } else {
        ProgressManager::new(accepted.len() as u64)
    };

    let result = optimizer
        .optimize_batch_with_progress(&accepted, &policy, |item| progress.record(item))
        .await;

    for item in &result.items {
        stats.add_item(item);

        let mut stored = None;
        if let (Ok(outcome), Some(sink), false) = (&item.outcome, &sink, dry_run) {
            let name = item.name.as_deref().unwrap_or("image");
            let record = sink
                .store(name, &outcome.optimized.bytes, outcome.optimized.format)
                .await?;
            info!("Stored {} as {}", name, record.markdown_ref);
            stats.add_stored();
            stored = Some(record);
        }

        if json {
            JsonMessage::file_complete(item, stored).emit();
        }
    }

    progress.finish(&stats.format_summary());
    if json {
        JsonMessage::complete(&result, started.elapsed().as_secs_f64()).emit();
    } else {
        info!("{}", result.format_summary());
    }

    Ok(())
}

async fn suggest(paths: &[PathBuf], json: bool) -> Result<()> {
    let optimizer = ImageOptimizer::new(PolicyOptions::default())?;
    let files = FileManager::find_image_files(paths)?;

    for path in &files {
        let image = FileManager::load_image(path).await?;
        let report = optimizer.suggest(&image).await;

        if json {
            JsonMessage::suggestions(image.name().map(str::to_string), report).emit();
            continue;
        }

        println!(
            "{} ({}x{}, {})",
            path.display(),
            report.analysis.width,
            report.analysis.height,
            FileManager::format_size(image.len())
        );
        if report.suggestions.is_empty() {
            println!("  nothing to suggest");
        }
        for suggestion in &report.suggestions {
            println!("  [{:?}] {}", suggestion.impact, suggestion.message);
        }
        println!(
            "  estimated: {} ({:.1}% smaller)",
            FileManager::format_size(report.estimated_savings.estimated_size as u64),
            report.estimated_savings.savings_percentage
        );
    }

    Ok(())
}

/// Write `<stem>-<suffix>.<ext>` into `output` (or the input's directory)
async fn write_next_to(
    input: &Path,
    output: Option<&Path>,
    suffix: &str,
    outcome: &OptimizationOutcome,
) -> Result<()> {
    let directory = match output {
        Some(dir) => dir.to_path_buf(),
        None => input.parent().map(Path::to_path_buf).unwrap_or_default(),
    };
    tokio::fs::create_dir_all(&directory).await?;

    let stem = input
        .file_stem()
        .map(|s| sanitize_segment(&s.to_string_lossy()))
        .unwrap_or_else(|| sanitize_segment(""));
    let target = directory.join(format!(
        "{}-{}.{}",
        stem,
        suffix,
        outcome.optimized.format.extension()
    ));
    tokio::fs::write(&target, &outcome.optimized.bytes).await?;

    info!(
        "Wrote {} ({}x{}, {} -> {})",
        target.display(),
        outcome.optimized.width,
        outcome.optimized.height,
        FileManager::format_size(outcome.original_size),
        FileManager::format_size(outcome.optimized.byte_size())
    );
    Ok(())
}
