use std::path::PathBuf;

use clap::{ArgAction, Parser};
use lodestar_core::config::{LoaderConfig, DEFAULT_GRANULARITY};
use log::LevelFilter;

/// Load an ELF64 image into this process and run its entry point.
///
/// The entry is called with a pointer to a 32-bit scratch value and its
/// return value becomes the exit status.
#[derive(Parser, Debug)]
#[command(name = "lodestar-run", version, about)]
pub struct Cli {
    /// Image to load.
    pub image: PathBuf,

    /// Value behind the pointer handed to the entry point.
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub scratch: i32,

    /// Allocation granularity in bytes (power of two).
    #[arg(long, default_value_t = DEFAULT_GRANULARITY)]
    pub granularity: u64,

    /// More log output (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn config(&self) -> LoaderConfig {
        LoaderConfig::default()
            .scratch(self.scratch)
            .granularity(self.granularity)
    }

    pub fn level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}
