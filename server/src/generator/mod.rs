//! Synthetic stand-ins for the camera and the three models, so the server
//! runs end to end without hardware or weights.

pub mod caption;
pub mod depth;
pub mod scene;

use crate::workflow::config::ServerConfig;
use caption::SyntheticCaptioner;
use depth::SyntheticDepth;
use hazardcore::interface::{DepthModel, Detector, FrameSource, SceneCaptioner};
use scene::{SyntheticCamera, SyntheticDetector, SyntheticScene};
use std::sync::Arc;
use std::time::Duration;

/// Backends wired to one shared scene.
pub struct SyntheticStack {
    pub source: Box<dyn FrameSource>,
    pub detector: Box<dyn Detector>,
    pub depth: Box<dyn DepthModel>,
    pub captioner: Arc<dyn SceneCaptioner>,
}

impl SyntheticStack {
    pub fn build(config: &ServerConfig) -> Self {
        let scene = SyntheticScene::new(
            &config.scene,
            &config.camera,
            config.engine.depth.focal_constant,
        );
        Self {
            source: Box::new(SyntheticCamera::new(scene.clone())),
            detector: Box::new(SyntheticDetector::new(scene.clone())),
            depth: Box::new(SyntheticDepth::new(
                scene.clone(),
                config.engine.depth.dense_scale,
                config.scene.depth_unavailable,
            )),
            captioner: Arc::new(SyntheticCaptioner::new(
                scene,
                Duration::from_millis(config.caption.load_ms),
                Duration::from_millis(config.caption.latency_ms),
            )),
        }
    }
}
