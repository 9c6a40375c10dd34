// Log output for the hosted runner

use std::io::Write;

use lodestar_core::logger;
use log::LevelFilter;

fn stderr_line(line: &str) {
    let _ = writeln!(std::io::stderr().lock(), "{}", line);
}

/// Install the core logger with stderr as its live sink.
pub fn init(level: LevelFilter) {
    logger::init(level);
    logger::set_sink(stderr_line);
}
