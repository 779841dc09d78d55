use crate::generator::scene::SyntheticScene;
use hazardcore::interface::SceneCaptioner;
use hazardcore::prelude::{EngineError, EngineResult, Frame};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

fn label(class_id: u32) -> &'static str {
    match class_id {
        0 => "a person",
        2 => "a parked car",
        10 => "a fire hydrant",
        13 => "a bench",
        39 => "a bottle",
        56 => "a chair",
        60 => "a table",
        _ => "an object",
    }
}

fn side(lateral: f32) -> &'static str {
    if lateral < 0.33 {
        "on the left"
    } else if lateral > 0.66 {
        "on the right"
    } else {
        "straight ahead"
    }
}

/// Slow captioner: blocks for the configured latency, then describes the
/// scene objects within a few meters. Loads lazily if preload was skipped.
pub struct SyntheticCaptioner {
    scene: SyntheticScene,
    load_latency: Duration,
    latency: Duration,
    loaded: AtomicBool,
    fail: bool,
}

impl SyntheticCaptioner {
    pub fn new(scene: SyntheticScene, load_latency: Duration, latency: Duration) -> Self {
        Self {
            scene,
            load_latency,
            latency,
            loaded: AtomicBool::new(false),
            fail: false,
        }
    }

    /// A captioner whose every request fails.
    #[cfg(test)]
    pub fn failing(scene: SyntheticScene) -> Self {
        Self {
            fail: true,
            ..Self::new(scene, Duration::ZERO, Duration::ZERO)
        }
    }
}

impl SceneCaptioner for SyntheticCaptioner {
    fn load(&self) -> EngineResult<()> {
        if self.loaded.load(Ordering::SeqCst) {
            return Ok(());
        }
        thread::sleep(self.load_latency);
        self.loaded.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn describe(&self, frame: &Frame) -> EngineResult<String> {
        if self.fail {
            return Err(EngineError::Backend("captioning model crashed".into()));
        }
        self.load()?;
        thread::sleep(self.latency);

        let nearby: Vec<String> = self
            .scene
            .objects_at(frame.sequence)
            .iter()
            .filter(|object| object.distance <= 5.0)
            .map(|object| format!("{} {}", label(object.class_id), side(object.lateral)))
            .collect();

        Ok(match nearby.as_slice() {
            [] => "An open walkway with nothing close by.".to_string(),
            [only] => format!("A walkway with {}.", only),
            [rest @ .., last] => format!("A walkway with {} and {}.", rest.join(", "), last),
        })
    }
}
