use crate::settings::Settings;
use clap::Parser;
use log::LevelFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Pick a reference color and threshold an image by color distance"
)]
pub struct Cli {
    /// Log each processing step
    #[arg(short, long)]
    pub verbose: bool,

    /// Also log selection geometry and stage timings
    #[arg(short, long)]
    pub debug: bool,
}

impl Cli {
    /// Flags win over the saved `verbose` preference.
    pub fn log_level(&self, settings: &Settings) -> LevelFilter {
        if self.debug {
            LevelFilter::Debug
        } else if self.verbose || settings.verbose {
            LevelFilter::Info
        } else {
            LevelFilter::Warn
        }
    }
}

/// Installs the global logger. `RUST_LOG` still overrides the level.
pub fn init_logging(level: LevelFilter) {
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp_millis()
        .parse_default_env()
        .init();
}
