use log::{debug, info, warn};

/// Per-task logger that prefixes every record with the task name.
pub struct LogManager {
    task: String,
}

impl LogManager {
    pub fn new(task: impl Into<String>) -> Self {
        Self { task: task.into() }
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn record(&self, message: &str) {
        info!("{}: {}", self.task, message);
    }

    pub fn detail(&self, message: &str) {
        debug!("{}: {}", self.task, message);
    }

    pub fn warning(&self, message: &str) {
        warn!("{}: {}", self.task, message);
    }
}
