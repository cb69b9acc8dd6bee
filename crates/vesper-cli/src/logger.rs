//! Stderr Logger
//!
//! Minimal `log` backend: one line per record, level and target prefixed.

use std::io::Write;

use log::{LevelFilter, Log, Metadata, Record};

struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut err = std::io::stderr().lock();
        let _ = writeln!(err, "[{:<5} {}] {}", record.level(), record.target(), record.args());
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Level from the `VESPER_LOG` variable, if it names one
pub fn env_level() -> Option<LevelFilter> {
    std::env::var("VESPER_LOG").ok()?.parse().ok()
}

/// Level for a count of `-v` flags
pub fn verbosity_level(count: usize) -> LevelFilter {
    match count {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Install the logger. Explicit `-v` flags win over `VESPER_LOG`.
pub fn init(verbose: usize) {
    let level = if verbose > 0 {
        verbosity_level(verbose)
    } else {
        env_level().unwrap_or(LevelFilter::Warn)
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}
