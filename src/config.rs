use std::path::PathBuf;

use clap::Parser;

use crate::types::clamp_speed;

#[derive(Parser, Debug)]
#[command(name = "hydrolysis-sim")]
#[command(about = "Subcritical water hydrolysis process simulator")]
pub struct Cli {
    /// Initial simulation speed multiplier (0.5 to 3.0)
    #[arg(short, long, default_value_t = 1.0)]
    pub speed: f64,

    /// Write a JSON-lines trace of every recording run to this file
    #[arg(short, long)]
    pub record_to: Option<PathBuf>,

    /// Start with sound muted
    #[arg(long)]
    pub muted: bool,

    /// Do not open an audio output device
    #[arg(long)]
    pub no_audio: bool,

    /// Run one recorded cycle without a window and print the step log
    #[arg(long)]
    pub headless: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub initial_speed: f64,
    pub record_to: Option<PathBuf>,
    pub muted: bool,
    pub audio_enabled: bool,
    pub headless: bool,
    pub log_level: String,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Self {
            initial_speed: clamp_speed(cli.speed),
            record_to: cli.record_to,
            muted: cli.muted,
            audio_enabled: !cli.no_audio && !cli.headless,
            headless: cli.headless,
            log_level: cli.log_level,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_speed: 1.0,
            record_to: None,
            muted: false,
            audio_enabled: true,
            headless: false,
            log_level: "info".to_owned(),
        }
    }
}
