pub mod planar;
pub mod stats;

pub use planar::PlanarHelper;
pub use stats::StatsHelper;
