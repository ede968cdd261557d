//! # Outline CLI (`outline`)
//!
//! The `outline` binary recovers document outlines from PDFs and ranks
//! document sections against a persona and a job to be done.
//!
//! ## Usage
//!
//! ```bash
//! outline --config ./config/outline.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `outline outline <input>` | Write a title + H1–H4 outline per document |
//! | `outline rank --manifest <file>` | Rank sections of a document collection |
//! | `outline layout <pdf>` | Print the layout dump of a PDF as JSON |
//!
//! ## Examples
//!
//! ```bash
//! # Outline a whole directory
//! outline outline ./input --output ./output
//!
//! # Outline one file to stdout
//! outline outline ./input/report.pdf
//!
//! # Rank a collection described by a manifest
//! outline rank --manifest ./collection/input.json --output ./collection/output.json
//!
//! # Capture layout for a test fixture
//! outline layout ./input/report.pdf > report.json
//! ```
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`
//! (default `warn`).

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use doc_outline::config::Config;
use doc_outline::layout::DocumentLoader;
use doc_outline::pipeline::{run_outline, run_rank};

const DEFAULT_CONFIG: &str = "./config/outline.toml";

/// Outline recovery and persona-driven section ranking for PDFs.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. A missing file at the default path means built-in defaults. See
/// `config/outline.example.toml` for every option.
#[derive(Parser)]
#[command(name = "outline", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Recover the title and heading outline of documents.
    ///
    /// INPUT is a PDF, a layout dump (`.json`), or a directory of them.
    /// Each outline is written to `<output>/<stem>.json`; a single input
    /// file without `--output` is printed to stdout.
    Outline {
        /// Document or directory of documents.
        input: PathBuf,

        /// Output directory for the outline JSON files.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Rank document sections against a persona and job to be done.
    ///
    /// Reads a manifest JSON listing the documents, the persona and the
    /// task. Requires an embedding provider to be configured.
    Rank {
        /// Manifest JSON file.
        #[arg(long)]
        manifest: PathBuf,

        /// Directory holding the manifest's documents. Defaults to the
        /// manifest's directory.
        #[arg(long)]
        input_dir: Option<PathBuf>,

        /// Output file for the ranking JSON. Defaults to stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Print the layout primitives of a PDF as JSON.
    ///
    /// The output can be fed back to `outline` and `rank` in place of the
    /// PDF.
    Layout {
        /// PDF file.
        pdf: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let allow_missing = cli.config.as_os_str() == DEFAULT_CONFIG;
    let cfg = Config::load_or_default(&cli.config, allow_missing)?;

    match cli.command {
        Commands::Outline { input, output } => {
            let written = run_outline(&cfg, &input, output.as_deref())?;
            if let Some(dir) = output {
                println!("Wrote {} outline(s) to {}", written, dir.display());
            }
        }
        Commands::Rank {
            manifest,
            input_dir,
            output,
        } => {
            run_rank(&cfg, &manifest, input_dir.as_deref(), output.as_deref()).await?;
        }
        Commands::Layout { pdf } => {
            let mut loader = DocumentLoader::new(&cfg.layout);
            let pages = loader
                .load(&pdf)
                .with_context(|| format!("Failed to read layout of {}", pdf.display()))?;
            println!("{}", serde_json::to_string_pretty(&pages)?);
        }
    }

    Ok(())
}
