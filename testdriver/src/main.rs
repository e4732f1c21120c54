// THEORY:
// `testdriver` is the command-line front end to `morph_validation`. It owns
// nothing but argument handling and reporting:
//
// - `split`  writes the partition files for a manifest and prints their paths.
// - `decode` decodes one PPM file, prints its geometry and can dump it as PNG.
// - `run`    splits a manifest and runs one decode-check worker per partition.
//
// Exit status is non-zero whenever any test case or worker failed.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use morph_validation::{DecodeCheck, HarnessConfig, ParallelHarness, Partitioner};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "testdriver", about = "Partition and decode inputs for conformance runs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Split a manifest into balanced partition files.
    Split {
        /// Manifest with one test case per line.
        manifest: PathBuf,
        /// Existing directory for the partition files.
        #[arg(short, long)]
        output_dir: PathBuf,
        /// Requested number of partitions (defaults to the CPU count).
        #[arg(short = 'j', long)]
        parallelism: Option<usize>,
        /// Partition files are named `<stem>.<index>`.
        #[arg(long, default_value = "input.txt")]
        stem: String,
    },
    /// Decode a raw PPM (P6) image and report its geometry.
    Decode {
        image: PathBuf,
        /// Also write the decoded raster as PNG.
        #[arg(long)]
        png: Option<PathBuf>,
    },
    /// Split a manifest and decode-check every test case in parallel.
    Run {
        manifest: PathBuf,
        #[arg(short, long)]
        output_dir: PathBuf,
        #[arg(short = 'j', long)]
        parallelism: Option<usize>,
        #[arg(long, default_value = "input.txt")]
        stem: String,
        /// Directory that relative image paths are resolved against.
        #[arg(long)]
        image_root: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    match run(Cli::parse()).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every case passed.
async fn run(cli: Cli) -> anyhow::Result<bool> {
    match cli.command {
        Command::Split {
            manifest,
            output_dir,
            parallelism,
            stem,
        } => {
            let config = build_config(manifest, output_dir, parallelism, stem, None)?;
            let plan = Partitioner::new(&config.output_dir)
                .with_stem(&config.stem)
                .split(&config.manifest, config.parallelism)
                .with_context(|| format!("splitting {}", config.manifest.display()))?;
            for file in &plan.files {
                println!("{}", file.display());
            }
            info!(partitions = plan.parallelism(), "split complete");
            Ok(true)
        }
        Command::Decode { image, png } => {
            let decoded = morph_validation::decode(&image)
                .with_context(|| format!("decoding {}", image.display()))?;
            println!(
                "{}: {}x{} depth {} ({} bytes)",
                image.display(),
                decoded.width(),
                decoded.height(),
                decoded.depth(),
                decoded.size()
            );
            if let Some(png) = png {
                decoded
                    .save_png(&png)
                    .with_context(|| format!("writing {}", png.display()))?;
            }
            Ok(true)
        }
        Command::Run {
            manifest,
            output_dir,
            parallelism,
            stem,
            image_root,
        } => {
            let config = build_config(manifest, output_dir, parallelism, stem, image_root)?;
            let harness = ParallelHarness::new(config)?;
            let results = harness.run(|_| DecodeCheck).await?;

            let mut all_passed = true;
            for (index, result) in results.into_iter().enumerate() {
                match result {
                    Ok(report) => {
                        for failure in report.failures() {
                            println!("{}\t{}", failure.id, failure.status);
                        }
                        info!(
                            partition = report.partition,
                            cases = report.cases(),
                            failures = report.failure_count(),
                            "partition finished"
                        );
                        all_passed &= report.failure_count() == 0;
                    }
                    Err(err) => {
                        warn!(partition = index, error = %err, "partition not processed");
                        all_passed = false;
                    }
                }
            }
            Ok(all_passed)
        }
    }
}

fn build_config(
    manifest: PathBuf,
    output_dir: PathBuf,
    parallelism: Option<usize>,
    stem: String,
    image_root: Option<PathBuf>,
) -> anyhow::Result<HarnessConfig> {
    if !output_dir.is_dir() {
        bail!("output directory {} does not exist", output_dir.display());
    }

    let mut config = HarnessConfig::new(manifest, output_dir).with_stem(stem);
    if let Some(parallelism) = parallelism {
        config = config.with_parallelism(parallelism);
    }
    if let Some(root) = image_root {
        config = config.with_image_root(root);
    }
    config.validate()?;
    Ok(config)
}
