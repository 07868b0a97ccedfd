use crate::math::StatsHelper;
use crate::model::{Crs, FusedRecord, FusedTable, Match, PointSet, SourceSchema};
use crate::prelude::{FusionConfig, PipelineError, PipelineResult};
use crate::processing::index::CandidateIndex;
use crate::telemetry::StageLogger;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;

/// Per-source outcome of a fusion run.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SourceReport {
    pub source_id: String,
    pub candidates: usize,
    pub matched: usize,
    /// Anchors whose nearest candidate lay beyond the match distance.
    pub beyond_distance: usize,
    pub mean_distance: Option<f64>,
    pub max_distance: Option<f64>,
}

impl SourceReport {
    pub fn is_empty_source(&self) -> bool {
        self.candidates == 0
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FusionReport {
    pub anchors: usize,
    pub sources: Vec<SourceReport>,
}

/// Joins candidate sources onto an anchor grid by nearest neighbor.
///
/// Each source is matched to the anchor independently; one row is emitted
/// per anchor point whether or not any source matched it.
pub struct SpatialFuser {
    config: FusionConfig,
}

impl SpatialFuser {
    pub fn new(config: FusionConfig) -> PipelineResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn fuse(
        &self,
        anchor: &PointSet,
        candidates: &[PointSet],
    ) -> PipelineResult<(FusedTable, FusionReport)> {
        let crs = require_crs(anchor)?;
        let mut seen = HashSet::new();
        for set in candidates {
            if require_crs(set)? != crs {
                return Err(PipelineError::Config(format!(
                    "source `{}` is not in the anchor's {}",
                    set.source_id, crs
                )));
            }
            if set.source_id == anchor.source_id || !seen.insert(set.source_id.as_str()) {
                return Err(PipelineError::Config(format!(
                    "source id `{}` used more than once in fusion",
                    set.source_id
                )));
            }
        }

        let indexes: Vec<CandidateIndex> = candidates.iter().map(CandidateIndex::build).collect();
        for (set, index) in candidates.iter().zip(&indexes) {
            if index.is_empty() {
                StageLogger::new(&set.source_id)
                    .warn("empty candidate source; every anchor gets an absent match");
            }
        }

        let max_distance = self.config.max_match_distance;
        let records: Vec<FusedRecord> = anchor
            .records
            .par_iter()
            .map(|point| {
                let coordinate = point.coordinate();
                let matches = candidates
                    .iter()
                    .zip(&indexes)
                    .map(|(set, index)| {
                        index
                            .nearest_within(coordinate, max_distance)
                            .map(|(candidate_index, distance)| Match {
                                values: set.records[candidate_index].values.clone(),
                                distance,
                                candidate_index,
                            })
                    })
                    .collect();
                FusedRecord {
                    anchor: coordinate,
                    anchor_values: point.values.clone(),
                    matches,
                }
            })
            .collect();

        let reports = candidates
            .iter()
            .enumerate()
            .map(|(position, set)| summarize(position, set, &records))
            .collect::<Vec<_>>();
        for report in &reports {
            let logger = StageLogger::new(&report.source_id);
            if report.beyond_distance > 0 && !report.is_empty_source() {
                logger.warn(&format!(
                    "{} of {} anchors had no candidate within {}",
                    report.beyond_distance,
                    records.len(),
                    max_distance
                ));
            }
            logger.record(&format!(
                "matched {} of {} anchors",
                report.matched,
                records.len()
            ));
        }

        let table = FusedTable {
            anchor_source: anchor.source_id.clone(),
            anchor_fields: anchor.schema.clone(),
            crs,
            sources: candidates
                .iter()
                .map(|set| SourceSchema {
                    source_id: set.source_id.clone(),
                    fields: set.schema.clone(),
                })
                .collect(),
            records,
        };
        let report = FusionReport {
            anchors: table.len(),
            sources: reports,
        };
        Ok((table, report))
    }
}

fn require_crs(set: &PointSet) -> PipelineResult<Crs> {
    set.crs.ok_or_else(|| {
        PipelineError::Config(format!(
            "source `{}` was not normalized before fusion",
            set.source_id
        ))
    })
}

fn summarize(position: usize, set: &PointSet, records: &[FusedRecord]) -> SourceReport {
    let distances: Vec<f64> = records
        .iter()
        .filter_map(|record| record.matches[position].as_ref())
        .map(|matched| matched.distance)
        .collect();
    SourceReport {
        source_id: set.source_id.clone(),
        candidates: set.len(),
        matched: distances.len(),
        beyond_distance: records.len() - distances.len(),
        mean_distance: StatsHelper::mean(&distances),
        max_distance: StatsHelper::max(&distances),
    }
}
