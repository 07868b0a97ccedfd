use crate::model::Coordinate;

/// Flat (latitude, longitude) geometry used by clipping, deduplication and fusion.
///
/// Distances are plain Euclidean over degrees, not great-circle.
pub struct PlanarHelper;

impl PlanarHelper {
    pub fn distance_squared(a: Coordinate, b: Coordinate) -> f64 {
        let d_lat = a.latitude - b.latitude;
        let d_lon = a.longitude - b.longitude;
        d_lat * d_lat + d_lon * d_lon
    }

    pub fn distance(a: Coordinate, b: Coordinate) -> f64 {
        Self::distance_squared(a, b).sqrt()
    }

    /// Bitwise key for exact coordinate equality. `-0.0` and `0.0` share a key.
    pub fn coordinate_key(coordinate: Coordinate) -> (u64, u64) {
        (
            (coordinate.latitude + 0.0).to_bits(),
            (coordinate.longitude + 0.0).to_bits(),
        )
    }

    pub fn as_array(coordinate: Coordinate) -> [f64; 2] {
        [coordinate.latitude, coordinate.longitude]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_planar_degrees() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(3.0, 4.0);
        assert_eq!(PlanarHelper::distance(a, b), 5.0);
    }

    #[test]
    fn signed_zero_shares_key() {
        let a = Coordinate::new(0.0, -0.0);
        let b = Coordinate::new(-0.0, 0.0);
        assert_eq!(PlanarHelper::coordinate_key(a), PlanarHelper::coordinate_key(b));
    }
}
