//! Forwarding library log records to a caller-supplied callback.
//!
//! The library logs through the [`log`] facade.  Applications that already
//! run a logger (the `mss` binary uses `env_logger`) see those records
//! directly.  Embedders without one can call [`set_log_callback`] to receive
//! each formatted line instead.

use log::{LevelFilter, Log, Metadata, Record};
use std::sync::{Arc, OnceLock, RwLock};

/// Receives one formatted log line per record.
pub type LogCallback = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Debug, thiserror::Error)]
#[error("another logger is already installed")]
pub struct LoggerTaken;

struct CallbackLogger {
    callback: RwLock<Option<LogCallback>>,
}

impl Log for CallbackLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        self.callback.read().map(|cb| cb.is_some()).unwrap_or(false)
    }

    fn log(&self, record: &Record) {
        // Called without the lock held, so a callback may itself log or
        // replace the callback.
        let callback = match self.callback.read() {
            Ok(guard) => guard.clone(),
            Err(_) => return,
        };
        if let Some(cb) = callback {
            cb(&format_record(record));
        }
    }

    fn flush(&self) {}
}

static LOGGER: CallbackLogger = CallbackLogger {
    callback: RwLock::new(None),
};

/// Outcome of the one-time `log::set_logger` attempt.
static INSTALLED: OnceLock<bool> = OnceLock::new();

fn format_record(record: &Record) -> String {
    format!("[{}] {}: {}", record.level(), record.target(), record.args())
}

/// Install, replace or clear the callback.
///
/// The first call registers a process-wide logger with the `log` facade;
/// afterwards only the callback is swapped.  Passing `None` silences
/// forwarding.  Fails without changing anything if some other logger owns
/// the facade.
pub fn set_log_callback(callback: Option<LogCallback>) -> Result<(), LoggerTaken> {
    let installed = *INSTALLED.get_or_init(|| match log::set_logger(&LOGGER) {
        Ok(()) => {
            log::set_max_level(LevelFilter::Debug);
            true
        }
        Err(_) => false,
    });
    if !installed {
        return Err(LoggerTaken);
    }
    // A poisoned lock only means a callback panicked; the slot is still
    // usable.
    let mut slot = LOGGER
        .callback
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *slot = callback;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // The `log` facade is process-global, so everything that touches it
    // lives in one test.
    #[test]
    fn callback_receives_records_and_can_be_replaced() {
        let first = Arc::new(Mutex::new(Vec::<String>::new()));
        let second = Arc::new(Mutex::new(Vec::<String>::new()));

        let sink = first.clone();
        set_log_callback(Some(Arc::new(move |line: &str| {
            sink.lock().unwrap().push(line.to_string())
        })))
        .unwrap();
        log::info!(target: "mss::test", "hello {}", 1);

        let sink = second.clone();
        set_log_callback(Some(Arc::new(move |line: &str| {
            sink.lock().unwrap().push(line.to_string())
        })))
        .unwrap();
        log::warn!(target: "mss::test", "second");

        set_log_callback(None).unwrap();
        log::warn!(target: "mss::test", "dropped");

        // A callback that clears itself from inside the logger.
        let third = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = third.clone();
        set_log_callback(Some(Arc::new(move |line: &str| {
            sink.lock().unwrap().push(line.to_string());
            if line.contains("reentrant") {
                set_log_callback(None).unwrap();
            }
        })))
        .unwrap();
        log::warn!(target: "mss::test", "reentrant");
        log::warn!(target: "mss::test", "after clear");
        let third = third.lock().unwrap();
        assert!(third.iter().any(|l| l.contains("reentrant")));
        assert!(!third.iter().any(|l| l.contains("after clear")));

        let first = first.lock().unwrap();
        let second = second.lock().unwrap();
        assert!(first.iter().any(|l| l == "[INFO] mss::test: hello 1"));
        assert!(!first.iter().any(|l| l.contains("second")));
        assert!(second.iter().any(|l| l == "[WARN] mss::test: second"));
        assert!(!second.iter().any(|l| l.contains("dropped")));
    }
}
