//! ReelForge CLI: plan and render narrated videos from a JSON manifest.
//!
//! Usage:
//!   reelforge render <MANIFEST>   Render a manifest to video
//!   reelforge plan <MANIFEST>     Show the render plan without rendering
//!   reelforge check               Check the media engine and caption fonts
//!   reelforge check --fetch-fonts Download missing caption fonts

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reelforge_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "reelforge",
    about = "Assemble narrated videos from stills, clips and a transcript",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a manifest to video
    Render {
        /// Path to the request manifest (JSON)
        manifest: PathBuf,

        /// Override the manifest's output file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write the captions as an .srt next to the output
        #[arg(long)]
        srt: bool,

        /// Seed for the caption look choice
        #[arg(long)]
        seed: Option<u64>,

        /// Caption style: pulse, box or fill
        #[arg(long)]
        style: Option<String>,

        /// Highlight color name
        #[arg(long)]
        color: Option<String>,

        /// Caption font family
        #[arg(long)]
        font: Option<String>,

        /// Words per caption cue
        #[arg(long)]
        words_per_cue: Option<usize>,
    },

    /// Print the ordered segments, reconciliation and filter graph without rendering
    Plan {
        /// Path to the request manifest (JSON)
        manifest: PathBuf,

        /// Print the whole plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check the media engine and caption fonts
    Check {
        /// Download catalog fonts missing from the fonts directory
        #[arg(long)]
        fetch_fonts: bool,

        /// Write the effective configuration to the config file
        #[arg(long)]
        write_config: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load();

    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    reelforge_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Render {
            manifest,
            output,
            srt,
            seed,
            style,
            color,
            font,
            words_per_cue,
        } => {
            let overrides = commands::render::Overrides {
                output,
                srt,
                seed,
                style,
                color,
                font,
                words_per_cue,
            };
            commands::render::run(&config, manifest, overrides).await?;
        }
        Commands::Plan { manifest, json } => {
            commands::plan::run(&config, manifest, json)?;
        }
        Commands::Check {
            fetch_fonts,
            write_config,
        } => {
            commands::check::run(&config, fetch_fonts, write_config).await?;
        }
    }

    Ok(())
}
