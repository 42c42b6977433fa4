use clap::{Parser, Subcommand};
use cli::{BatchFile, EncodedResult, Job, build_pipeline, load_config, save_job_output};
use color_eyre::eyre::{Result, bail, eyre};
use cutout::{ExtractionConfig, ExtractionMode, Region, normalize_region, parse_proposal};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cut a design out of an image
    Extract {
        /// Path to the input image (JPEG, PNG, BMP or TIFF)
        #[arg(short, long)]
        input: PathBuf,
        /// Path to write the PNG cut-out to
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Region as x1,y1,x2,y2 (defaults to the whole image)
        #[arg(short, long)]
        region: Option<Region>,
        /// Bounding box answer from an external model, JSON or plain numbers
        #[arg(long)]
        proposal: Option<String>,
        /// The user's instruction; picks mode, aggressiveness and margins
        #[arg(long)]
        prompt: Option<String>,
        /// Force an extraction mode instead of deriving it from the prompt
        #[arg(short, long)]
        mode: Option<ExtractionMode>,
        /// Loosen background thresholds
        #[arg(long)]
        aggressive: bool,
        /// Use the legacy hard-edge classifier
        #[arg(long)]
        conservative: bool,
        /// Boost contrast and sharpen the result
        #[arg(long)]
        enhance: bool,
        /// Tuning constants from a .toml or .json file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Print {width, height, data} JSON with a base64 PNG instead of writing a file
        #[arg(long)]
        base64: bool,
    },
    /// Clip and pad a proposed region, printing it as JSON
    Normalize {
        #[arg(long)]
        proposal: String,
        #[arg(long, default_value = "")]
        prompt: String,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
    },
    /// Run the jobs of a batch file concurrently
    Batch {
        /// Path to the .toml or .json batch file
        #[arg(short, long)]
        config: PathBuf,
        /// Jobs still running after this many seconds are dropped
        #[arg(long, default_value = "60")]
        timeout_secs: u64,
    },
    /// Print the JSON schema of the tuning configuration
    Schema {
        /// Print the batch file schema instead
        #[arg(long)]
        batch: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Extract {
            input,
            output,
            region,
            proposal,
            prompt,
            mode,
            aggressive,
            conservative,
            enhance,
            config,
            base64,
        } => {
            let job = Job {
                name: input.to_string_lossy().to_string(),
                input: input.to_string_lossy().to_string(),
                proposal,
                prompt,
                mode,
                aggressive,
                region,
            };
            let config = match config {
                Some(path) => load_config(path)?,
                None => ExtractionConfig::default(),
            };
            extract(&job, config, conservative, enhance, output.as_deref(), base64)?;
        }
        Commands::Normalize { proposal, prompt, width, height } => {
            let region = normalize_region(parse_proposal(&proposal)?, &prompt, (width, height))?;
            println!("{}", serde_json::to_string(&region)?);
        }
        Commands::Batch { config, timeout_secs } => {
            run_batch(&config, Duration::from_secs(timeout_secs)).await?;
        }
        Commands::Schema { batch } => {
            let schema = if batch {
                schemars::schema_for!(BatchFile)
            } else {
                ExtractionConfig::schema()
            };
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
    }

    Ok(())
}

fn extract(
    job: &Job,
    config: ExtractionConfig,
    conservative: bool,
    enhance: bool,
    output: Option<&Path>,
    base64: bool,
) -> Result<()> {
    let pipeline = build_pipeline(config, conservative, enhance);
    info!("{}", pipeline.info());
    let result = job.run(&pipeline)?;

    if base64 {
        println!("{}", serde_json::to_string(&EncodedResult::from_result(&result)?)?);
        return Ok(());
    }
    let output = output.ok_or_else(|| eyre!("--output is required unless --base64 is set"))?;
    result.save_png(output)?;
    info!("✅ Saved {}x{} cut-out to {:?}", result.width(), result.height(), output);
    Ok(())
}

async fn run_batch(path: &Path, timeout: Duration) -> Result<()> {
    let mut batch = BatchFile::from_file(path)?;
    info!("Batch: {} jobs -> {}", batch.jobs.len(), batch.output_dir);

    // Create output directory if it doesn't exist
    std::fs::create_dir_all(&batch.output_dir)?;
    let pipeline = Arc::new(batch.pipeline());

    let handles: Vec<_> = std::mem::take(&mut batch.jobs)
        .into_iter()
        .map(|job| {
            let pipeline = Arc::clone(&pipeline);
            let name = job.name.clone();
            let handle = tokio::spawn(async move {
                tokio::time::timeout(
                    timeout,
                    tokio::task::spawn_blocking(move || job.run(&pipeline)),
                )
                .await
            });
            (name, handle)
        })
        .collect();

    let total = handles.len();
    let mut failed = 0;
    for (name, handle) in handles {
        let output = batch.output_path(&name);
        match handle.await? {
            Ok(Ok(outcome)) => match save_job_output(outcome, &output) {
                Ok(_) => info!("Job '{}' -> {:?}", name, output),
                Err(e) => {
                    error!("Job '{}' failed: {}", name, e);
                    failed += 1;
                }
            },
            Ok(Err(e)) => {
                error!("Job '{}' panicked: {}", name, e);
                failed += 1;
            }
            Err(_) => {
                warn!("Job '{}' timed out after {:?}, result dropped", name, timeout);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {total} jobs did not complete");
    }
    info!("✅ Batch completed!");
    Ok(())
}
