use serde::Serialize;
use std::sync::Mutex;

/// Record counts entering and leaving one stage for one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageCount {
    pub source_id: String,
    pub stage: String,
    pub input: usize,
    pub output: usize,
}

/// Shared across concurrently ingesting sources.
pub struct MetricsRecorder {
    inner: Mutex<Metrics>,
}

struct Metrics {
    stages: Vec<StageCount>,
    errors: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Metrics {
                stages: Vec::new(),
                errors: 0,
            }),
        }
    }

    pub fn record_stage(&self, source_id: &str, stage: &str, input: usize, output: usize) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.stages.push(StageCount {
                source_id: source_id.to_string(),
                stage: stage.to_string(),
                input,
                output,
            });
        }
    }

    pub fn record_error(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.errors += 1;
        }
    }

    pub fn snapshot(&self) -> (Vec<StageCount>, usize) {
        if let Ok(metrics) = self.inner.lock() {
            (metrics.stages.clone(), metrics.errors)
        } else {
            (Vec::new(), 0)
        }
    }

    /// Stage counts for one source, in the order they were recorded.
    pub fn stages_for(&self, source_id: &str) -> Vec<StageCount> {
        let (stages, _) = self.snapshot();
        stages
            .into_iter()
            .filter(|count| count.source_id == source_id)
            .collect()
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn recorder_collects_from_threads() {
        let recorder = Arc::new(MetricsRecorder::new());
        let handles: Vec<_> = ["smap", "cygnss"]
            .into_iter()
            .map(|source| {
                let recorder = recorder.clone();
                thread::spawn(move || recorder.record_stage(source, "deduplicate", 10, 8))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        recorder.record_error();

        let (stages, errors) = recorder.snapshot();
        assert_eq!(stages.len(), 2);
        assert_eq!(errors, 1);
        assert_eq!(recorder.stages_for("smap")[0].output, 8);
    }
}
