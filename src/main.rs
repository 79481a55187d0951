use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use soundboard_lib::Config;

/// Soundboard: play clips, bind hotkeys, reorder and filter buttons.
#[derive(Debug, Parser)]
#[command(name = "soundboard", version)]
struct Cli {
    /// JSON settings file; missing fields take their defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Directory sound and image paths resolve against.
    #[arg(long)]
    root: Option<PathBuf>,
    /// Keep all records in memory for this session.
    #[arg(long)]
    ephemeral: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info,symphonia_core=warn")).init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(root) = cli.root {
        config.board_root = root;
    }
    if cli.ephemeral {
        config.storage_path = None;
    }
    soundboard_lib::shell::run(config)
}
