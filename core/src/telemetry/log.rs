use log::{debug, info, warn};

/// Logs pipeline events tagged with the source they belong to.
pub struct StageLogger {
    source_id: String,
}

impl StageLogger {
    pub fn new(source_id: &str) -> Self {
        Self {
            source_id: source_id.to_string(),
        }
    }

    pub fn record(&self, message: &str) {
        info!("[{}] {}", self.source_id, message);
    }

    pub fn warn(&self, message: &str) {
        warn!("[{}] {}", self.source_id, message);
    }

    pub fn detail(&self, message: &str) {
        debug!("[{}] {}", self.source_id, message);
    }
}
