pub mod clip;
pub mod dedup;
pub mod fusion;
pub mod index;
pub mod normalize;
pub mod validity;

pub use clip::RegionClipper;
pub use dedup::Deduplicator;
pub use fusion::{FusionReport, SourceReport, SpatialFuser};
pub use index::CandidateIndex;
pub use normalize::GeometryNormalizer;
pub use validity::ValidityFilter;

use crate::formats::{self, SourceSpec};
use crate::model::PointSet;
use crate::prelude::{PipelineResult, PointStage};
use crate::region::RegionMask;
use crate::telemetry::{MetricsRecorder, StageLogger};

/// Runs `input` through `stages` in order, recording counts per stage.
pub fn run_stages(
    input: PointSet,
    stages: &[&dyn PointStage],
    metrics: &MetricsRecorder,
) -> PipelineResult<PointSet> {
    let logger = StageLogger::new(&input.source_id);
    let mut current = input;
    for stage in stages {
        let before = current.len();
        let source_id = current.source_id.clone();
        current = match stage.execute(current) {
            Ok(output) => output,
            Err(err) => {
                metrics.record_error();
                return Err(err);
            }
        };
        metrics.record_stage(&source_id, stage.name(), before, current.len());
        logger.detail(&format!("{}: {} -> {}", stage.name(), before, current.len()));
    }
    Ok(current)
}

/// Full per-source ingestion: adapter, validity filter, normalizer, clipper, deduplicator.
pub fn ingest_source(
    spec: &SourceSpec,
    mask: &RegionMask,
    metrics: &MetricsRecorder,
) -> PipelineResult<PointSet> {
    let raw = formats::ingest(spec).map_err(|err| {
        metrics.record_error();
        err
    })?;

    let validity = spec.format.validity_rule().map(ValidityFilter::new);
    let normalizer = GeometryNormalizer::new();
    let clipper = RegionClipper::new(mask);
    let deduplicator = Deduplicator::new();

    let mut stages: Vec<&dyn PointStage> = Vec::with_capacity(4);
    if let Some(filter) = validity.as_ref() {
        stages.push(filter);
    }
    stages.push(&normalizer);
    stages.push(&clipper);
    stages.push(&deduplicator);

    let clipped = run_stages(raw, &stages, metrics)?;
    let logger = StageLogger::new(&spec.source_id);
    logger.record(&format!(
        "{} records inside region `{}`",
        clipped.len(),
        mask.name()
    ));
    if clipped.is_empty() {
        logger.warn("no valid records survive filtering (empty source)");
    }
    Ok(clipped)
}
