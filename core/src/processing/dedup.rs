use crate::math::PlanarHelper;
use crate::model::PointSet;
use crate::prelude::{PipelineResult, PointStage};
use std::collections::HashSet;

/// Keeps the first record seen at each exact coordinate.
pub struct Deduplicator;

impl Deduplicator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new()
    }
}

impl PointStage for Deduplicator {
    fn name(&self) -> &'static str {
        "deduplicate"
    }

    fn execute(&self, input: PointSet) -> PipelineResult<PointSet> {
        let mut seen = HashSet::with_capacity(input.len());
        let records = input
            .records
            .iter()
            .filter(|record| seen.insert(PlanarHelper::coordinate_key(record.coordinate())))
            .cloned()
            .collect();
        Ok(input.derive(records))
    }
}
