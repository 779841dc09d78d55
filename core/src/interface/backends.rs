//! Seams to the external collaborators. The engine treats every model as a
//! black box behind one of these traits.

use crate::interface::RawDetection;
use crate::prelude::{EngineResult, Frame};
use ndarray::Array2;

/// Per-pixel relative depth, indexed `[row, column]`; larger values are closer.
pub type DepthMap = Array2<f32>;

/// Capture source (camera, video file, synthetic scene).
pub trait FrameSource: Send {
    /// Called once at start-up; failure here is the only fatal condition.
    fn open(&mut self) -> EngineResult<()>;

    fn read(&mut self) -> EngineResult<Frame>;

    fn release(&mut self) {}
}

pub trait Detector: Send {
    fn detect(&mut self, frame: &Frame) -> EngineResult<Vec<RawDetection>>;
}

pub trait DepthModel: Send {
    fn load(&mut self) -> EngineResult<()>;

    fn infer(&mut self, frame: &Frame) -> EngineResult<DepthMap>;
}

/// High-latency scene captioning. Implementations are shared between the
/// preload worker and the scene-description executor.
pub trait SceneCaptioner: Send + Sync {
    fn load(&self) -> EngineResult<()>;

    fn describe(&self, frame: &Frame) -> EngineResult<String>;
}

pub trait SpeechBackend: Send + Sync {
    fn speak(&self, text: &str) -> EngineResult<()>;

    fn beep(&self) -> EngineResult<()>;
}
