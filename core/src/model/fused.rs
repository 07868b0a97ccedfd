use crate::model::point::{Coordinate, Crs};
use serde::{Deserialize, Serialize};

/// Field layout contributed by one candidate source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceSchema {
    pub source_id: String,
    pub fields: Vec<String>,
}

/// Candidate record selected for an anchor point.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Match {
    pub values: Vec<f64>,
    pub distance: f64,
    /// Position of the matched record in its (clipped, deduplicated) source set.
    pub candidate_index: usize,
}

/// One output row per anchor point. `matches` is aligned with [`FusedTable::sources`];
/// `None` marks a source with no candidate inside the match distance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FusedRecord {
    pub anchor: Coordinate,
    pub anchor_values: Vec<f64>,
    pub matches: Vec<Option<Match>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FusedTable {
    pub anchor_source: String,
    pub anchor_fields: Vec<String>,
    pub crs: Crs,
    pub sources: Vec<SourceSchema>,
    pub records: Vec<FusedRecord>,
}

impl FusedTable {
    pub fn source_position(&self, source_id: &str) -> Option<usize> {
        self.sources
            .iter()
            .position(|schema| schema.source_id == source_id)
    }

    /// Match for `source_id` on row `row`, if the source is known and matched.
    pub fn matched(&self, row: usize, source_id: &str) -> Option<&Match> {
        let position = self.source_position(source_id)?;
        self.records.get(row)?.matches.get(position)?.as_ref()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
