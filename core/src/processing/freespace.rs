use crate::config::ZoneBounds;
use crate::interface::HazardDetection;
use crate::math::BoundingBox;
use crate::prelude::{FrameShape, Lane};
use serde::{Deserialize, Serialize};

/// Openness per lane in `[0, 1]`; higher is safer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LaneScores {
    pub left: f32,
    pub center: f32,
    pub right: f32,
}

impl LaneScores {
    pub fn new(left: f32, center: f32, right: f32) -> Self {
        Self {
            left,
            center,
            right,
        }
    }

    pub fn get(&self, lane: Lane) -> f32 {
        match lane {
            Lane::Left => self.left,
            Lane::Center => self.center,
            Lane::Right => self.right,
        }
    }

    fn slot(&mut self, lane: Lane) -> &mut f32 {
        match lane {
            Lane::Left => &mut self.left,
            Lane::Center => &mut self.center,
            Lane::Right => &mut self.right,
        }
    }
}

/// Occupancy-derived free space over the lower part of the frame.
pub struct FreeSpaceScorer {
    zones: ZoneBounds,
    lower_frame_start_ratio: f32,
}

impl FreeSpaceScorer {
    pub fn new(zones: ZoneBounds, lower_frame_start_ratio: f32) -> Self {
        Self {
            zones,
            lower_frame_start_ratio,
        }
    }

    fn lane_region(&self, lane: Lane, shape: FrameShape) -> BoundingBox {
        let width = shape.width as f32;
        let height = shape.height as f32;
        let y_min = (height * self.lower_frame_start_ratio).floor();
        let left_end = (width * self.zones.left_zone_end).floor();
        let right_start = (width * self.zones.right_zone_start).floor();
        let (x1, x2) = match lane {
            Lane::Left => (0.0, left_end),
            Lane::Center => (left_end, right_start),
            Lane::Right => (right_start, width),
        };
        BoundingBox::new(x1, y_min, x2, height)
    }

    /// Scores every lane from all detections of the frame.
    pub fn score(&self, shape: FrameShape, detections: &[HazardDetection]) -> LaneScores {
        let mut occupied = LaneScores::new(0.0, 0.0, 0.0);
        let regions = Lane::ALL.map(|lane| (lane, self.lane_region(lane, shape)));

        for det in detections {
            for (lane, region) in &regions {
                if let Some(overlap) = det.bbox.intersection(region) {
                    *occupied.slot(*lane) += overlap.area();
                }
            }
        }

        let mut scores = LaneScores::new(1.0, 1.0, 1.0);
        for (lane, region) in &regions {
            let lane_area = region.width().max(1.0) * region.height().max(1.0);
            let ratio = (occupied.get(*lane) / lane_area).min(1.0);
            *scores.slot(*lane) = (1.0 - ratio).max(0.0);
        }
        scores
    }
}
