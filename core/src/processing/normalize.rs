use crate::model::{Crs, PointSet};
use crate::prelude::{PipelineError, PipelineResult, PointStage};

/// Tags a set as WGS84 degrees after checking every coordinate is in range.
///
/// Out-of-range coordinates point at an adapter defect and are reported, never dropped.
pub struct GeometryNormalizer {
    crs: Crs,
}

impl GeometryNormalizer {
    pub fn new() -> Self {
        Self { crs: Crs::Wgs84 }
    }
}

impl Default for GeometryNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl PointStage for GeometryNormalizer {
    fn name(&self) -> &'static str {
        "normalize"
    }

    fn execute(&self, mut input: PointSet) -> PipelineResult<PointSet> {
        for (index, record) in input.records.iter().enumerate() {
            let reason = if !(-90.0..=90.0).contains(&record.latitude) {
                Some("has latitude outside [-90, 90]")
            } else if !(-180.0..180.0).contains(&record.longitude) {
                Some("has longitude outside [-180, 180)")
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(PipelineError::Geometry {
                    source_id: input.source_id.clone(),
                    index,
                    latitude: record.latitude,
                    longitude: record.longitude,
                    reason: reason.to_string(),
                });
            }
        }
        input.crs = Some(self.crs);
        Ok(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PointRecord;

    fn set_of(coords: &[(f64, f64)]) -> PointSet {
        let mut set = PointSet::new("cygnss", Vec::new());
        set.records = coords
            .iter()
            .map(|&(lat, lon)| PointRecord::new(lat, lon, Vec::new()))
            .collect();
        set
    }

    #[test]
    fn valid_set_is_tagged_wgs84() {
        let output = GeometryNormalizer::new()
            .execute(set_of(&[(-90.0, -180.0), (90.0, 179.999)]))
            .unwrap();
        assert_eq!(output.crs, Some(Crs::Wgs84));
        assert_eq!(output.len(), 2);
    }

    #[test]
    fn longitude_180_is_reported_with_index() {
        let err = GeometryNormalizer::new()
            .execute(set_of(&[(0.0, 0.0), (10.0, 180.0)]))
            .unwrap_err();
        match err {
            PipelineError::Geometry {
                source_id, index, ..
            } => {
                assert_eq!(source_id, "cygnss");
                assert_eq!(index, 1);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn nan_latitude_is_reported() {
        assert!(GeometryNormalizer::new()
            .execute(set_of(&[(f64::NAN, 0.0)]))
            .is_err());
    }
}
