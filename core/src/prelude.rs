use crate::model::PointSet;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings that shape how candidate sources are matched onto the anchor grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionConfig {
    /// Largest planar (degree) distance accepted for a nearest-neighbor match.
    pub max_match_distance: f64,
}

impl FusionConfig {
    pub fn new(max_match_distance: f64) -> Self {
        Self { max_match_distance }
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if !self.max_match_distance.is_finite() || self.max_match_distance < 0.0 {
            return Err(PipelineError::Config(format!(
                "max_match_distance must be finite and non-negative, got {}",
                self.max_match_distance
            )));
        }
        Ok(())
    }
}

/// Fatal pipeline failures. Any of these aborts the run before fusion output exists.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("format error in source `{source_id}` ({}): {reason}", .path.display())]
    Format {
        source_id: String,
        path: PathBuf,
        reason: String,
    },
    #[error("geometry error in source `{source_id}`: record {index} at ({latitude}, {longitude}) {reason}")]
    Geometry {
        source_id: String,
        index: usize,
        latitude: f64,
        longitude: f64,
        reason: String,
    },
    #[error("region `{name}` not found under attribute `{attribute}` in {}", .path.display())]
    MaskNotFound {
        name: String,
        attribute: String,
        path: PathBuf,
    },
    #[error("invalid region mask {}: {reason}", .path.display())]
    Mask { path: PathBuf, reason: String },
    #[error("invalid pattern `{pattern}` for source `{source_id}`: {reason}")]
    Glob {
        source_id: String,
        pattern: String,
        reason: String,
    },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("i/o failure on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot write {}: {reason}", .path.display())]
    Sink { path: PathBuf, reason: String },
}

impl PipelineError {
    pub fn format(
        source_id: impl Into<String>,
        path: impl Into<PathBuf>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Format {
            source_id: source_id.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// A transformation step applied to one source's point set.
///
/// Stages consume their input and hand back a new set; nothing is shared
/// between stages, so independent sources can run their chains on separate
/// threads.
pub trait PointStage {
    fn name(&self) -> &'static str;
    fn execute(&self, input: PointSet) -> PipelineResult<PointSet>;
}
