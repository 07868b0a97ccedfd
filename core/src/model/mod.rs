pub mod fused;
pub mod point;

pub use fused::{FusedRecord, FusedTable, Match, SourceSchema};
pub use point::{Coordinate, Crs, PointRecord, PointSet};
