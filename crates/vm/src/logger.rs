//! `log` sink for the board. Records are kept in memory so tests can inspect
//! what the nucleus reported, and echoed to stdout when verbose.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use log::{LevelFilter, Log, Metadata, Record};
use once_cell::sync::{Lazy, OnceCell};

pub struct BoardLogger {
    records: Mutex<Vec<String>>,
    echo: AtomicBool,
}

static LOGGER: Lazy<BoardLogger> = Lazy::new(|| BoardLogger {
    records: Mutex::new(Vec::new()),
    echo: AtomicBool::new(false),
});

static INSTALLED: OnceCell<()> = OnceCell::new();

/// Installs the board logger as the global `log` sink. Later calls only
/// update the echo flag.
pub fn init(verbose: bool) {
    INSTALLED.get_or_init(|| {
        if log::set_logger(&*LOGGER).is_ok() {
            log::set_max_level(LevelFilter::Trace);
        }
    });
    if verbose {
        LOGGER.echo.store(true, Ordering::Relaxed);
    }
}

/// Snapshot of every record captured so far.
pub fn records() -> Vec<String> {
    LOGGER
        .records
        .lock()
        .map(|records| records.clone())
        .unwrap_or_default()
}

impl Log for BoardLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        let line = format!("[{:<5}] {}: {}", record.level(), record.target(), record.args());
        if self.echo.load(Ordering::Relaxed) {
            println!("{}", line);
        }
        if let Ok(mut records) = self.records.lock() {
            records.push(line);
        }
    }

    fn flush(&self) {}
}
