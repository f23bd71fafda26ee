//! ClipNet CLI - LAN clipboard sync over multicast.

mod commands;
mod desktop;
mod ui;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clipnet_core::Settings;
use tracing_subscriber::EnvFilter;

use commands::RunArgs;

#[derive(Parser)]
#[command(name = "clipnet")]
#[command(about = "Share the clipboard across the LAN over multicast", long_about = None)]
struct Cli {
    /// Settings file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the clipboard sync (default)
    Run(RunArgs),
    /// Show settings and network info
    Info,
    /// Write a settings file
    Init {
        /// Pick random multicast groups instead of the defaults
        #[arg(long)]
        randomize: bool,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("clipnet=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let path = cli.config.unwrap_or_else(Settings::default_path);

    match cli.command.unwrap_or_else(|| Commands::Run(RunArgs::default())) {
        Commands::Run(args) => commands::run_service(&path, args).await?,
        Commands::Info => commands::show_info(&path)?,
        Commands::Init { randomize, force } => commands::init_settings(&path, randomize, force)?,
    }

    Ok(())
}
