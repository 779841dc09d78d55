pub mod depth;
pub mod freespace;
pub mod guidance;
pub mod normalizer;
pub mod path;
pub mod tracker;

pub use depth::DepthFuser;
pub use freespace::{FreeSpaceScorer, LaneScores};
pub use guidance::LaneGuidance;
pub use normalizer::DetectionNormalizer;
pub use path::PathPreprocessor;
pub use tracker::IdentityTracker;
