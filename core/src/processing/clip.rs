use crate::model::PointSet;
use crate::prelude::{PipelineResult, PointStage};
use crate::region::RegionMask;

/// Stable filter keeping records inside or on the boundary of the region.
pub struct RegionClipper<'a> {
    mask: &'a RegionMask,
}

impl<'a> RegionClipper<'a> {
    pub fn new(mask: &'a RegionMask) -> Self {
        Self { mask }
    }
}

impl PointStage for RegionClipper<'_> {
    fn name(&self) -> &'static str {
        "clip"
    }

    fn execute(&self, input: PointSet) -> PipelineResult<PointSet> {
        let records = input
            .records
            .iter()
            .filter(|record| self.mask.contains(record.coordinate()))
            .cloned()
            .collect();
        Ok(input.derive(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PointRecord;
    use geo::{polygon, MultiPolygon};

    fn square_mask() -> RegionMask {
        let square = polygon![
            (x: -101.0, y: 9.0),
            (x: -99.0, y: 9.0),
            (x: -99.0, y: 11.0),
            (x: -101.0, y: 11.0),
            (x: -101.0, y: 9.0),
        ];
        RegionMask::new("square", "name", MultiPolygon::new(vec![square]))
    }

    fn sample() -> PointSet {
        let mut set = PointSet::new("ease2", Vec::new());
        set.records = vec![
            PointRecord::new(10.0, -100.0, Vec::new()),
            PointRecord::new(12.0, -100.0, Vec::new()),
            PointRecord::new(11.0, -99.0, Vec::new()),
            PointRecord::new(9.5, -102.0, Vec::new()),
            PointRecord::new(9.5, -100.5, Vec::new()),
        ];
        set
    }

    #[test]
    fn clip_keeps_interior_and_boundary_in_order() {
        let mask = square_mask();
        let clipped = RegionClipper::new(&mask).execute(sample()).unwrap();
        let coords: Vec<(f64, f64)> = clipped
            .records
            .iter()
            .map(|r| (r.latitude, r.longitude))
            .collect();
        assert_eq!(coords, vec![(10.0, -100.0), (11.0, -99.0), (9.5, -100.5)]);
    }

    #[test]
    fn clip_is_idempotent() {
        let mask = square_mask();
        let clipper = RegionClipper::new(&mask);
        let once = clipper.execute(sample()).unwrap();
        let twice = clipper.execute(once.clone()).unwrap();
        assert_eq!(once, twice);
    }
}
