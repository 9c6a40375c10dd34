use std::process::ExitCode;

use clap::Parser;
use lodestar_host::cli::Cli;
use lodestar_host::{run_file, sink};

fn main() -> ExitCode {
    let cli = Cli::parse();
    sink::init(cli.level());

    match run_file(&cli.image, &cli.config()) {
        // Truncated the way the platform truncates exit statuses; the
        // failure sentinel -1 becomes 255
        Ok(result) => ExitCode::from(result as u8),
        Err(err) => {
            log::error!("{}", err);
            ExitCode::from(255)
        }
    }
}
