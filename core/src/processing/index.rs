use crate::math::PlanarHelper;
use crate::model::{Coordinate, PointSet};
use rstar::primitives::GeomWithData;
use rstar::RTree;

type IndexedPoint = GeomWithData<[f64; 2], usize>;

/// R-tree over one candidate source, built once and queried per anchor point.
///
/// Points are stored as `[latitude, longitude]`; each entry carries its
/// position in the source set for tie-breaking.
pub struct CandidateIndex {
    tree: RTree<IndexedPoint>,
}

impl CandidateIndex {
    pub fn build(set: &PointSet) -> Self {
        let points = set
            .records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                GeomWithData::new(PlanarHelper::as_array(record.coordinate()), index)
            })
            .collect();
        Self {
            tree: RTree::bulk_load(points),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Nearest candidate within `max_distance` as `(index, distance)`.
    ///
    /// Among equidistant candidates the lowest source index wins.
    pub fn nearest_within(&self, query: Coordinate, max_distance: f64) -> Option<(usize, f64)> {
        let point = PlanarHelper::as_array(query);
        let distance_2 = |candidate: &IndexedPoint| {
            let [lat, lon] = *candidate.geom();
            PlanarHelper::distance_squared(query, Coordinate::new(lat, lon))
        };

        let mut neighbors = self.tree.nearest_neighbor_iter(&point);
        let first = neighbors.next()?;
        let best = distance_2(first);
        let distance = best.sqrt();
        if distance > max_distance {
            return None;
        }

        let mut winner = first.data;
        for candidate in neighbors {
            if distance_2(candidate) > best {
                break;
            }
            winner = winner.min(candidate.data);
        }
        Some((winner, distance))
    }
}
