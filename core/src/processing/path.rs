use crate::config::PathConfig;
use crate::interface::HazardDetection;
use crate::prelude::FrameShape;

/// Restricts detections to the forward-path corridor and collapses duplicates.
pub struct PathPreprocessor {
    config: PathConfig,
}

impl PathPreprocessor {
    pub fn new(config: PathConfig) -> Self {
        Self { config }
    }

    fn in_corridor(&self, det: &HazardDetection, shape: FrameShape) -> bool {
        let (center_x, _) = det.bbox.center();
        let center_ratio = center_x / shape.width.max(1) as f32;
        let bottom_ratio = det.bbox.y2 / shape.height.max(1) as f32;

        let in_lane = (self.config.x_start..=self.config.x_end).contains(&center_ratio);
        let near_ground = bottom_ratio >= self.config.min_bottom_ratio;
        let in_band =
            (self.config.min_distance_m..=self.config.max_distance_m).contains(&det.distance);
        in_lane && near_ground && in_band
    }

    fn is_duplicate(&self, det: &HazardDetection, kept: &HazardDetection) -> bool {
        det.bbox.iou(&kept.bbox) >= self.config.merge_iou
            || det.bbox.center_distance(&kept.bbox) <= self.config.merge_center_px
    }

    /// Corridor detections, nearest first, one survivor per duplicate cluster.
    pub fn preprocess(
        &self,
        detections: &[HazardDetection],
        shape: FrameShape,
    ) -> Vec<HazardDetection> {
        let mut filtered: Vec<&HazardDetection> = detections
            .iter()
            .filter(|det| self.in_corridor(det, shape))
            .collect();
        filtered.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        let mut merged: Vec<HazardDetection> = Vec::with_capacity(filtered.len());
        for det in filtered {
            if !merged.iter().any(|kept| self.is_duplicate(det, kept)) {
                merged.push(det.clone());
            }
        }
        merged
    }
}
