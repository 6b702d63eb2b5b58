use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "voxkeep",
    version,
    about = "Offline voice satellite: wake word, VAD segmentation, STT, agent dispatch, TTS reply"
)]
pub struct Cli {
    /// Path to YAML config file. Required unless --list-devices is given.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// List available audio input/output devices and exit.
    #[arg(long)]
    pub list_devices: bool,
}
