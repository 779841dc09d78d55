use crate::math::BoundingBox;
use crate::prelude::Lane;
use serde::{Deserialize, Serialize};

/// Detector output for one box, before any filtering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDetection {
    pub class_id: u32,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl RawDetection {
    pub fn new(class_id: u32, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            class_id,
            confidence,
            bbox,
        }
    }
}

/// A hazard that passed the taxonomy and confidence checks; distance not yet known.
#[derive(Debug, Clone, PartialEq)]
pub struct ZonedDetection {
    pub hazard: String,
    pub direction: Lane,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// A fully enriched hazard for the current frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardDetection {
    pub hazard: String,
    pub direction: Lane,
    /// Meters, rounded to 0.1.
    pub distance: f32,
    pub confidence: f32,
    pub bbox: BoundingBox,
    pub track_id: Option<u64>,
    pub recommended_lane: Option<Lane>,
    pub guidance: Option<String>,
}

impl HazardDetection {
    /// Rounding never reports a distance below `min_distance`.
    pub fn from_zoned(zoned: ZonedDetection, distance: f32, min_distance: f32) -> Self {
        Self {
            hazard: zoned.hazard,
            direction: zoned.direction,
            distance: round_distance(distance, min_distance),
            confidence: round_to(zoned.confidence, 100.0),
            bbox: zoned.bbox,
            track_id: None,
            recommended_lane: None,
            guidance: None,
        }
    }
}

fn round_to(value: f32, scale: f32) -> f32 {
    (value * scale).round() / scale
}

fn round_distance(distance: f32, min_distance: f32) -> f32 {
    let rounded = round_to(distance, 10.0);
    if rounded < min_distance {
        (min_distance * 10.0).ceil() / 10.0
    } else {
        rounded
    }
}
