use crate::image::exposure::{MetadataValue, PropertySet};
use std::sync::Mutex;
use std::time::Instant;

/// Task-level metadata: run counters plus named values such as `NUMNANS`.
pub struct TaskMetadata {
    inner: Mutex<Metrics>,
}

#[derive(Default)]
struct Metrics {
    processed: usize,
    errors: usize,
    values: PropertySet,
}

impl TaskMetadata {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Metrics::default()),
        }
    }

    pub fn record_processed(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.processed += 1;
        }
    }

    pub fn record_error(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.errors += 1;
        }
    }

    pub fn set(&self, key: &str, value: impl Into<MetadataValue>) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.values.insert(key.to_string(), value.into());
        }
    }

    pub fn get(&self, key: &str) -> Option<MetadataValue> {
        self.inner
            .lock()
            .ok()
            .and_then(|metrics| metrics.values.get(key).cloned())
    }

    /// Runs `f` and records its wall-clock duration in seconds under `<key>Duration`.
    pub fn time<T>(&self, key: &str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let result = f();
        self.set(
            &format!("{key}Duration"),
            start.elapsed().as_secs_f64(),
        );
        result
    }

    pub fn snapshot(&self) -> (usize, usize) {
        if let Ok(metrics) = self.inner.lock() {
            (metrics.processed, metrics.errors)
        } else {
            (0, 0)
        }
    }
}

impl Default for TaskMetadata {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_and_values_are_recorded() {
        let metadata = TaskMetadata::new();
        metadata.record_processed();
        metadata.record_processed();
        metadata.record_error();
        metadata.set("NUMNANS", 4_usize);
        assert_eq!(metadata.snapshot(), (2, 1));
        assert_eq!(metadata.get("NUMNANS"), Some(MetadataValue::Int(4)));
        assert!(metadata.get("missing").is_none());
    }

    #[test]
    fn timing_stores_a_duration() {
        let metadata = TaskMetadata::new();
        let value = metadata.time("run", || 7);
        assert_eq!(value, 7);
        let duration = metadata.get("runDuration").and_then(|v| v.as_f64());
        assert!(duration.unwrap_or(-1.0) >= 0.0);
    }
}
