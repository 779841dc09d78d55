use crate::generator::scene::SyntheticScene;
use hazardcore::interface::{DepthMap, DepthModel};
use hazardcore::prelude::{EngineError, EngineResult, Frame};
use ndarray::{s, Array2};

/// Paints relative inverse depth (`scale / distance`) for every scene object.
pub struct SyntheticDepth {
    scene: SyntheticScene,
    scale: f32,
    unavailable: bool,
    loaded: bool,
}

impl SyntheticDepth {
    pub fn new(scene: SyntheticScene, scale: f32, unavailable: bool) -> Self {
        Self {
            scene,
            scale,
            unavailable,
            loaded: false,
        }
    }
}

impl DepthModel for SyntheticDepth {
    fn load(&mut self) -> EngineResult<()> {
        if self.unavailable {
            return Err(EngineError::Backend("synthetic depth weights missing".into()));
        }
        self.loaded = true;
        Ok(())
    }

    fn infer(&mut self, frame: &Frame) -> EngineResult<DepthMap> {
        if !self.loaded {
            return Err(EngineError::Backend("depth model not loaded".into()));
        }
        let rows = frame.shape.height as usize;
        let cols = frame.shape.width as usize;
        // background sits beyond the farthest object
        let mut map = Array2::from_elem((rows, cols), self.scale / 12.0);

        // far to near, so nearer objects overwrite what they occlude
        for object in self.scene.objects_at(frame.sequence).iter().rev() {
            let b = object.bbox;
            if rows == 0 || cols == 0 {
                break;
            }
            let x1 = b.x1.max(0.0) as usize;
            let y1 = b.y1.max(0.0) as usize;
            let x2 = (b.x2.max(0.0) as usize).min(cols - 1);
            let y2 = (b.y2.max(0.0) as usize).min(rows - 1);
            if x1 <= x2 && y1 <= y2 {
                map.slice_mut(s![y1..=y2, x1..=x2])
                    .fill(self.scale / object.distance);
            }
        }
        Ok(map)
    }
}
