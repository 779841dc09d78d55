use crate::config::{DetectionConfig, ZoneBounds};
use crate::interface::{RawDetection, ZonedDetection};

/// Filters raw detector output against the hazard taxonomy and assigns a side.
pub struct DetectionNormalizer {
    config: DetectionConfig,
}

impl DetectionNormalizer {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    pub fn zones(&self) -> ZoneBounds {
        self.config.zones
    }

    pub fn normalize(&self, raw: &[RawDetection], frame_width: u32) -> Vec<ZonedDetection> {
        let width = frame_width.max(1) as f32;
        raw.iter()
            .filter(|det| det.confidence >= self.config.confidence_threshold)
            .filter_map(|det| {
                let hazard = self.config.hazard_classes.get(&det.class_id)?;
                let (center_x, _) = det.bbox.center();
                Some(ZonedDetection {
                    hazard: hazard.clone(),
                    direction: self.config.zones.lane_for(center_x / width),
                    confidence: det.confidence,
                    bbox: det.bbox,
                })
            })
            .collect()
    }
}
