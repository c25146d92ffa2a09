use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use negtag::{config, pipeline, transcode};

#[derive(Parser, Debug)]
#[command(
    name = "negtag",
    version,
    about = "Batch EXIF tagger for scanned film negatives — match frames to a shot log and burn exposure metadata via exiftool"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Preview the invocations without launching anything
    #[arg(long, global = true)]
    dry_run: bool,

    /// Output the batch report as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tag scanned frames with the exposure data from a shot log
    Tag {
        /// Directory of scanned frame files
        #[arg(value_name = "NEGATIVES_DIR")]
        negatives_dir: PathBuf,

        /// The shot log file for the roll
        #[arg(value_name = "LOG_FILE")]
        log_file: PathBuf,
    },
    /// Convert .tif scans to archival .tiff and half-resolution .jpg previews
    Convert {
        /// Directory of .tif scans
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },
    /// Initialize a default config.json and exit
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Handle init before loading config
    if let Commands::Init = cli.command {
        let config = config::Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => config::Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    let mut config = config::Config::load(cli.config.as_deref())?;

    // Override dry_run from CLI flag
    if cli.dry_run {
        config.output.dry_run = true;
    }
    if config.output.dry_run {
        log::info!("DRY RUN — no files will be modified");
    }

    match cli.command {
        Commands::Tag {
            negatives_dir,
            log_file,
        } => {
            let report = pipeline::run_batch(&negatives_dir, &log_file, &config).await?;

            for file in &report.unindexed {
                log::warn!("No frame index: {}", file.display());
            }
            for file in &report.unmatched {
                log::warn!("No exposure record: {}", file.display());
            }

            if cli.json {
                print_json_report(&report)?;
            }

            // Per-file failures are reported above, not reflected in the
            // exit code — a batch that reaches the end is a completed batch.
            log::info!(
                "Done: {} submitted, {} failed, {} unmatched, {} unindexed",
                report.submitted,
                report.failed(),
                report.unmatched.len(),
                report.unindexed.len()
            );
        }
        Commands::Convert { dir } => {
            let outcomes = transcode::transcode_batch(&dir, &config).await?;
            let failed = outcomes.iter().filter(|o| !o.succeeded()).count();

            if cli.json {
                let json: Vec<serde_json::Value> = outcomes
                    .iter()
                    .map(|o| {
                        serde_json::json!({
                            "source": o.target.display().to_string(),
                            "pid": o.pid,
                            "status": o.status,
                            "timed_out": o.timed_out,
                            "stderr": o.stderr,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&json)?);
            }

            log::info!(
                "Done: {} conversions, {failed} failed",
                outcomes.len()
            );
        }
        Commands::Init => unreachable!(),
    }

    Ok(())
}

/// Print the tagging batch report as JSON.
fn print_json_report(report: &pipeline::BatchReport) -> Result<()> {
    let outcomes: Vec<serde_json::Value> = report
        .outcomes
        .iter()
        .map(|o| {
            serde_json::json!({
                "file": o.target.display().to_string(),
                "pid": o.pid,
                "status": o.status,
                "timed_out": o.timed_out,
                "stderr": o.stderr,
                "spawn_error": o.spawn_error,
            })
        })
        .collect();

    let json = serde_json::json!({
        "submitted": report.submitted,
        "failed": report.failed(),
        "unmatched": report
            .unmatched
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>(),
        "unindexed": report
            .unindexed
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>(),
        "tag_maps": report.tag_maps,
        "outcomes": outcomes,
    });

    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
