//! Core ingestion and spatial-fusion pipeline for heterogeneous remote-sensing sources.
//!
//! Each source is parsed by a format adapter into a uniform [`model::PointSet`],
//! pushed through the stage chain (validity filter, geometry normalizer, region
//! clipper, deduplicator) and finally joined onto an anchor grid by the
//! [`processing::SpatialFuser`].

pub mod formats;
pub mod math;
pub mod model;
pub mod prelude;
pub mod processing;
pub mod region;
pub mod sink;
pub mod telemetry;

pub use prelude::{FusionConfig, PipelineError, PipelineResult, PointStage};
