//! Log capture for tests. Records are kept per thread so tests running side by
//! side only see their own output.

use std::sync::OnceLock;
use std::thread::ThreadId;

use log::{Level, LevelFilter, Log, Metadata, Record};
use parking_lot::Mutex;

struct CaptureLogger {
    records: Mutex<Vec<(ThreadId, Level, String)>>,
}

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        self.records.lock().push((
            std::thread::current().id(),
            record.level(),
            record.args().to_string(),
        ));
    }

    fn flush(&self) {}
}

static LOGGER: OnceLock<CaptureLogger> = OnceLock::new();

pub fn install() {
    let logger = LOGGER.get_or_init(|| CaptureLogger {
        records: Mutex::new(Vec::new()),
    });
    if log::set_logger(logger).is_ok() {
        log::set_max_level(LevelFilter::Trace);
    }
}

/// Messages the calling thread logged at `level` or more severe, oldest first.
pub fn messages(level: Level) -> Vec<String> {
    let current = std::thread::current().id();
    LOGGER
        .get()
        .map(|logger| {
            logger
                .records
                .lock()
                .iter()
                .filter(|(thread, record_level, _)| *thread == current && *record_level <= level)
                .map(|(_, _, message)| message.clone())
                .collect()
        })
        .unwrap_or_default()
}
