pub mod backends;
pub mod detection;
pub mod events;

pub use backends::{DepthMap, DepthModel, Detector, FrameSource, SceneCaptioner, SpeechBackend};
pub use detection::{HazardDetection, RawDetection, ZonedDetection};
pub use events::{ClientMessage, HazardAlert, SceneStatus, SceneUpdate, ServerMessage};
