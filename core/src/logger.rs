// Global logging backend for Lodestar
//
// Records go through the `log` facade into a bounded ring buffer. An optional
// sink receives each line as it is written; the bootloader points it at the
// firmware console and detaches it before boot services end.

use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Write;

use log::{LevelFilter, Log, Metadata, Record};
use spin::Mutex;

const MAX_LOG_ENTRIES: usize = 64;

/// Live output for log lines.
pub type LogSink = fn(&str);

struct Ring {
    entries: VecDeque<String>,
    total: usize,
}

impl Ring {
    const fn new() -> Self {
        Self {
            entries: VecDeque::new(),
            total: 0,
        }
    }

    fn push(&mut self, line: String) {
        if self.entries.len() == MAX_LOG_ENTRIES {
            self.entries.pop_front();
        }
        self.entries.push_back(line);
        self.total += 1;
    }
}

static LOG_BUFFER: Mutex<Ring> = Mutex::new(Ring::new());
static SINK: Mutex<Option<LogSink>> = Mutex::new(None);
static LOGGER: RingLogger = RingLogger;

struct RingLogger;

impl Log for RingLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let mut line = String::new();
        let _ = write!(line, "[{:<5}] {}", record.level(), record.args());

        // Copy the sink out so it runs without holding the lock
        let sink = *SINK.lock();
        if let Some(sink) = sink {
            sink(&line);
        }

        LOG_BUFFER.lock().push(line);
    }

    fn flush(&self) {}
}

/// Install the ring logger as the `log` backend. Later calls only adjust the
/// level.
pub fn init(level: LevelFilter) {
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level);
}

/// Forward every subsequent line to `sink`.
pub fn set_sink(sink: LogSink) {
    *SINK.lock() = Some(sink);
}

/// Stop live output. Lines keep landing in the ring buffer.
pub fn detach_sink() {
    *SINK.lock() = None;
}

/// Copy of the most recent lines, oldest first.
pub fn snapshot() -> Vec<String> {
    LOG_BUFFER.lock().entries.iter().cloned().collect()
}

/// Number of lines written since start-up, including evicted ones.
pub fn log_count() -> usize {
    LOG_BUFFER.lock().total
}
