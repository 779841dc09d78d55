use log::{debug, info, warn};
use std::collections::HashSet;
use std::sync::Mutex;

/// Per-component log wrapper; prefixes every line with the component tag.
pub struct LogManager {
    component: &'static str,
    warned: Mutex<HashSet<&'static str>>,
}

impl LogManager {
    pub fn new(component: &'static str) -> Self {
        Self {
            component,
            warned: Mutex::new(HashSet::new()),
        }
    }

    pub fn record(&self, message: &str) {
        info!("[{}] {}", self.component, message);
    }

    pub fn trace(&self, message: &str) {
        debug!("[{}] {}", self.component, message);
    }

    pub fn warn(&self, message: &str) {
        warn!("[{}] {}", self.component, message);
    }

    /// Emits the warning the first time `key` is seen; later calls drop to debug.
    pub fn warn_once(&self, key: &'static str, message: &str) {
        let first = match self.warned.lock() {
            Ok(mut seen) => seen.insert(key),
            Err(_) => false,
        };
        if first {
            self.warn(message);
        } else {
            self.trace(message);
        }
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new("hazardcore")
    }
}
