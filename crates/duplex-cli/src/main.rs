// SPDX-License-Identifier: AGPL-3.0-or-later
//! Duplex Docs command-line front end

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use duplex_export::ExportFormat;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Duplex Docs - markdown round-trip and HTML/DOCX export", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a markdown file as a self-contained HTML page or a DOCX package
    Export {
        /// Markdown input file
        input: PathBuf,

        /// Output format (html or docx)
        #[arg(short, long, default_value = "html")]
        format: ExportFormat,

        /// Directory to write the artifact into
        #[arg(short, long, default_value = ".")]
        out: PathBuf,

        /// Export settings in TOML
        #[arg(short, long, env = "DUPLEX_EXPORT_CONFIG")]
        config: Option<PathBuf>,

        /// Document title, overriding the config and the first heading
        #[arg(long)]
        title: Option<String>,
    },
    /// Print the canonical serialization the rich view would produce
    Roundtrip {
        /// Markdown input file
        input: PathBuf,

        /// Fail if the file is not already canonical
        #[arg(long)]
        check: bool,
    },
    /// Print word and character counts as JSON
    Stats {
        /// Markdown input file
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            input,
            format,
            out,
            config,
            title,
        } => {
            let path = commands::export(&input, format, &out, config.as_deref(), title).await?;
            println!("{}", path.display());
        }
        Commands::Roundtrip { input, check } => {
            let canonical = commands::roundtrip(&input, check).await?;
            if !check {
                print!("{canonical}");
            }
        }
        Commands::Stats { input } => {
            let report = commands::stats(&input).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
