use crate::workflow::config::{CameraConfig, SceneConfig};
use hazardcore::interface::{Detector, FrameSource, RawDetection};
use hazardcore::math::BoundingBox;
use hazardcore::prelude::{EngineError, EngineResult, Frame, FrameShape};
use rand::{rngs::StdRng, Rng, SeedableRng};

const NEAREST_M: f32 = 0.6;
const FARTHEST_M: f32 = 9.0;

/// Class ids the scene can spawn with their width/height ratio. Class 2
/// (car) is outside the default hazard taxonomy on purpose.
const CLASS_SHAPES: [(u32, f32); 7] = [
    (0, 0.4),
    (56, 0.8),
    (60, 1.6),
    (39, 0.35),
    (13, 2.0),
    (10, 0.6),
    (2, 1.8),
];

#[derive(Debug, Clone, PartialEq)]
struct SceneObject {
    class_id: u32,
    aspect: f32,
    /// Horizontal position as a fraction of the frame width.
    lateral: f32,
    start_distance: f32,
}

/// An object as seen in one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedObject {
    pub class_id: u32,
    pub lateral: f32,
    pub distance: f32,
    pub bbox: BoundingBox,
}

/// Seeded walk-through of static obstacles approaching the camera.
///
/// Everything is a pure function of the seed and the frame sequence, so the
/// camera, detector, depth model and captioner can each hold a copy and
/// agree on what is in view.
#[derive(Debug, Clone)]
pub struct SyntheticScene {
    shape: FrameShape,
    capture_fps: f32,
    walking_speed_mps: f32,
    jitter_px: f32,
    focal_constant: f32,
    seed: u64,
    objects: Vec<SceneObject>,
}

impl SyntheticScene {
    pub fn new(scene: &SceneConfig, camera: &CameraConfig, focal_constant: f32) -> Self {
        let mut rng = StdRng::seed_from_u64(scene.seed);
        let objects = (0..scene.objects)
            .map(|_| {
                let (class_id, aspect) = CLASS_SHAPES[rng.gen_range(0..CLASS_SHAPES.len())];
                SceneObject {
                    class_id,
                    aspect,
                    lateral: rng.gen_range(0.1..0.9),
                    start_distance: rng.gen_range(1.5..FARTHEST_M),
                }
            })
            .collect();

        Self {
            shape: FrameShape::new(camera.width, camera.height),
            capture_fps: camera.capture_fps.max(1.0),
            walking_speed_mps: scene.walking_speed_mps.max(0.0),
            jitter_px: scene.jitter_px.max(0.0),
            focal_constant,
            seed: scene.seed,
            objects,
        }
    }

    pub fn shape(&self) -> FrameShape {
        self.shape
    }

    fn distance_at(&self, object: &SceneObject, sequence: u64) -> f32 {
        let span = FARTHEST_M - NEAREST_M;
        let travelled = self.walking_speed_mps * sequence as f32 / self.capture_fps;
        let offset = (FARTHEST_M - object.start_distance + travelled) % span;
        FARTHEST_M - offset
    }

    fn place(&self, object: &SceneObject, sequence: u64) -> PlacedObject {
        let width = self.shape.width as f32;
        let height = self.shape.height as f32;
        let distance = self.distance_at(object, sequence);

        let box_height = (self.focal_constant / distance).min(height);
        let box_width = (box_height * object.aspect).min(width);
        let bottom = (height * (0.5 + 0.45 * (1.0 / distance).min(1.0))).min(height);
        let center_x = object.lateral * width;
        let bbox = BoundingBox::new(
            (center_x - box_width / 2.0).max(0.0),
            (bottom - box_height).max(0.0),
            (center_x + box_width / 2.0).min(width),
            bottom,
        );

        PlacedObject {
            class_id: object.class_id,
            lateral: object.lateral,
            distance,
            bbox,
        }
    }

    /// Objects in view for `sequence`, nearest first.
    pub fn objects_at(&self, sequence: u64) -> Vec<PlacedObject> {
        let mut placed: Vec<PlacedObject> = self
            .objects
            .iter()
            .map(|object| self.place(object, sequence))
            .collect();
        placed.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        placed
    }

    fn frame_rng(&self, sequence: u64) -> StdRng {
        StdRng::seed_from_u64(self.seed ^ sequence.wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }
}

/// Frame source over a [`SyntheticScene`]; frames carry no pixels.
pub struct SyntheticCamera {
    scene: SyntheticScene,
    next_sequence: u64,
    opened: bool,
}

impl SyntheticCamera {
    pub fn new(scene: SyntheticScene) -> Self {
        Self {
            scene,
            next_sequence: 0,
            opened: false,
        }
    }
}

impl FrameSource for SyntheticCamera {
    fn open(&mut self) -> EngineResult<()> {
        let shape = self.scene.shape();
        if shape.width == 0 || shape.height == 0 {
            return Err(EngineError::SourceUnavailable(
                "synthetic camera has an empty frame size".into(),
            ));
        }
        self.opened = true;
        log::info!(
            "[camera] synthetic camera opened ({}x{})",
            shape.width,
            shape.height
        );
        Ok(())
    }

    fn read(&mut self) -> EngineResult<Frame> {
        if !self.opened {
            return Err(EngineError::SourceUnavailable("camera not opened".into()));
        }
        let frame = Frame::blank(self.next_sequence, self.scene.shape());
        self.next_sequence += 1;
        Ok(frame)
    }

    fn release(&mut self) {
        if self.opened {
            self.opened = false;
            log::info!("[camera] synthetic camera released");
        }
    }
}

/// Reports the scene's boxes with per-frame jitter and confidence noise.
pub struct SyntheticDetector {
    scene: SyntheticScene,
}

impl SyntheticDetector {
    pub fn new(scene: SyntheticScene) -> Self {
        Self { scene }
    }
}

impl Detector for SyntheticDetector {
    fn detect(&mut self, frame: &Frame) -> EngineResult<Vec<RawDetection>> {
        let mut rng = self.scene.frame_rng(frame.sequence);
        let jitter = self.scene.jitter_px;
        let width = frame.shape.width as f32;
        let height = frame.shape.height as f32;

        let detections = self
            .scene
            .objects_at(frame.sequence)
            .into_iter()
            .map(|object| {
                let mut shake = || {
                    if jitter > 0.0 {
                        rng.gen_range(-jitter..jitter)
                    } else {
                        0.0
                    }
                };
                let b = object.bbox;
                let bbox = BoundingBox::new(
                    (b.x1 + shake()).clamp(0.0, width),
                    (b.y1 + shake()).clamp(0.0, height),
                    (b.x2 + shake()).clamp(0.0, width),
                    (b.y2 + shake()).clamp(0.0, height),
                );
                let confidence = rng.gen_range(0.55..0.97);
                RawDetection::new(object.class_id, confidence, bbox)
            })
            .collect();
        Ok(detections)
    }
}
