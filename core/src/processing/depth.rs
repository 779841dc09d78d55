use crate::config::{DepthBackendKind, DepthConfig};
use crate::interface::{DepthMap, DepthModel};
use crate::math::{BoundingBox, StatsHelper};
use crate::prelude::Frame;
use crate::telemetry::LogManager;
use ndarray::s;

/// Pinhole heuristic: distance is inversely proportional to box height.
#[derive(Debug, Clone, Copy)]
pub struct HeuristicDepth {
    focal_constant: f32,
    min_distance_m: f32,
}

impl HeuristicDepth {
    pub fn new(config: &DepthConfig) -> Self {
        Self {
            focal_constant: config.focal_constant,
            min_distance_m: config.min_distance_m,
        }
    }

    pub fn distance(&self, bbox: &BoundingBox) -> f32 {
        let pixel_height = bbox.height().max(1.0);
        (self.focal_constant / pixel_height).max(self.min_distance_m)
    }
}

/// Dense-map strategy backed by an external depth model.
pub struct DenseDepth {
    model: Box<dyn DepthModel>,
    scale: f32,
    min_value: f32,
    min_distance_m: f32,
    max_distance_m: f32,
}

impl DenseDepth {
    fn new(model: Box<dyn DepthModel>, config: &DepthConfig) -> Self {
        Self {
            model,
            scale: config.dense_scale,
            min_value: config.dense_min_value,
            min_distance_m: config.min_distance_m,
            max_distance_m: config.max_distance_m,
        }
    }

    /// Median depth inside the box (clipped to the map), mapped to meters.
    fn distance(&self, map: &DepthMap, bbox: &BoundingBox) -> Option<f32> {
        let (rows, cols) = map.dim();
        if rows == 0 || cols == 0 {
            return None;
        }
        let x1 = bbox.x1.max(0.0) as usize;
        let y1 = bbox.y1.max(0.0) as usize;
        let x2 = (bbox.x2.max(0.0) as usize).min(cols - 1);
        let y2 = (bbox.y2.max(0.0) as usize).min(rows - 1);
        if x1 > x2 || y1 > y2 {
            return None;
        }

        let patch = map.slice(s![y1..=y2, x1..=x2]);
        let value = StatsHelper::median(patch.iter().copied())?.max(self.min_value);
        Some((self.scale / value).clamp(self.min_distance_m, self.max_distance_m))
    }
}

enum Strategy {
    Heuristic,
    Dense(DenseDepth),
}

/// Distances for one frame, plus whether the dense path had to fall back.
#[derive(Debug, Clone, PartialEq)]
pub struct Fusion {
    pub distances: Vec<f32>,
    pub fell_back: bool,
}

/// Converts box geometry (and optionally a dense depth map) into meters.
///
/// The strategy is fixed at construction. A dense model that fails to load
/// degrades to the heuristic for the whole run; a failed inference, or a map
/// whose size differs from the frame, degrades for that frame only.
pub struct DepthFuser {
    heuristic: HeuristicDepth,
    strategy: Strategy,
    logger: LogManager,
}

impl DepthFuser {
    pub fn heuristic(config: &DepthConfig) -> Self {
        Self {
            heuristic: HeuristicDepth::new(config),
            strategy: Strategy::Heuristic,
            logger: LogManager::new("depth"),
        }
    }

    pub fn from_config(config: &DepthConfig, model: Option<Box<dyn DepthModel>>) -> Self {
        let mut fuser = Self::heuristic(config);
        if config.backend != DepthBackendKind::Dense {
            return fuser;
        }

        match model {
            Some(mut model) => match model.load() {
                Ok(()) => {
                    fuser.logger.record("dense depth model loaded");
                    fuser.strategy = Strategy::Dense(DenseDepth::new(model, config));
                }
                Err(err) => fuser.logger.warn_once(
                    "load",
                    &format!("falling back to heuristic depth: {}", err),
                ),
            },
            None => fuser.logger.warn_once(
                "load",
                "dense depth requested without a model; using heuristic depth",
            ),
        }
        fuser
    }

    pub fn is_dense(&self) -> bool {
        matches!(self.strategy, Strategy::Dense(_))
    }

    pub fn estimate(&mut self, frame: &Frame, boxes: &[BoundingBox]) -> Fusion {
        let heuristic = self.heuristic;
        let fallback = |boxes: &[BoundingBox]| -> Vec<f32> {
            boxes.iter().map(|b| heuristic.distance(b)).collect()
        };

        let dense = match &mut self.strategy {
            Strategy::Heuristic => {
                return Fusion {
                    distances: fallback(boxes),
                    fell_back: false,
                }
            }
            Strategy::Dense(dense) => dense,
        };
        if boxes.is_empty() {
            return Fusion {
                distances: Vec::new(),
                fell_back: false,
            };
        }

        let expected = (frame.shape.height as usize, frame.shape.width as usize);
        match dense.model.infer(frame) {
            Ok(map) if map.dim() != expected => {
                self.logger.warn_once(
                    "shape",
                    &format!(
                        "depth map is {:?} for a {:?} frame, heuristic for this frame",
                        map.dim(),
                        expected
                    ),
                );
                Fusion {
                    distances: fallback(boxes),
                    fell_back: true,
                }
            }
            Ok(map) => Fusion {
                distances: boxes
                    .iter()
                    .map(|b| {
                        dense
                            .distance(&map, b)
                            .unwrap_or_else(|| heuristic.distance(b))
                    })
                    .collect(),
                fell_back: false,
            },
            Err(err) => {
                self.logger.warn_once(
                    "infer",
                    &format!("depth inference failed, heuristic for this frame: {}", err),
                );
                Fusion {
                    distances: fallback(boxes),
                    fell_back: true,
                }
            }
        }
    }
}
