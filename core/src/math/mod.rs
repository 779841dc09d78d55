pub mod geometry;
pub mod stats;

pub use geometry::BoundingBox;
pub use stats::StatsHelper;
