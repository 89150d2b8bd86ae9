//! Text Extract CLI - OCR for scanned Japanese pages
//!
//! Command-line interface for the image-to-text pipeline.

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod commands;

use commands::clean::CleanCommand;
use commands::extract::ExtractCommand;

#[derive(Parser)]
#[command(
    name = "text-extract",
    version,
    about = "Extract text from scanned images with Tesseract",
    long_about = "Extract text from scanned images.\n\
                  Each page is upscaled, binarized and split into text regions; every\n\
                  region is recognized with a language chosen from its orientation\n\
                  (horizontal or vertical writing).",
    after_help = "EXAMPLES:\n  \
                  # Print the text of a page\n  \
                  text-extract extract --no-save scan.png\n\n  \
                  # Save each run to its own file and print a JSON envelope\n  \
                  text-extract extract --per-run-output ./results --json scan.png\n\n  \
                  # Write the binarized page and the region overlay\n  \
                  text-extract extract --debug --debug-dir ./debug scan.png\n\n  \
                  # Remove stored uploads\n  \
                  text-extract clean ./uploads"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract text from an image
    Extract(ExtractCommand),

    /// Delete every file in an upload directory
    Clean(CleanCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    // Logs go to stderr so stdout carries only the extracted text
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    match cli.command {
        Commands::Extract(cmd) => cmd.execute().await,
        Commands::Clean(cmd) => cmd.execute().await,
    }
}
