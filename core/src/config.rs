use crate::prelude::{EngineError, EngineResult, Lane};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Every behavior-defining tunable of the decision engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub detection: DetectionConfig,
    pub depth: DepthConfig,
    pub tracking: TrackingConfig,
    pub path: PathConfig,
    pub lock: LockConfig,
    pub debounce: DebounceConfig,
    pub guidance: GuidanceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub confidence_threshold: f32,
    /// Detector class id to hazard label.
    pub hazard_classes: BTreeMap<u32, String>,
    pub zones: ZoneBounds,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        let hazard_classes = [
            (0, "person"),
            (9, "traffic light"),
            (10, "fire hydrant"),
            (11, "stop sign"),
            (13, "bench"),
            (39, "bottle"),
            (56, "chair"),
            (60, "dining table"),
        ]
        .into_iter()
        .map(|(id, label)| (id, label.to_string()))
        .collect();

        Self {
            confidence_threshold: 0.60,
            hazard_classes,
            zones: ZoneBounds::default(),
        }
    }
}

/// Horizontal ratios splitting the frame into left / center / right.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneBounds {
    pub left_zone_end: f32,
    pub right_zone_start: f32,
}

impl Default for ZoneBounds {
    fn default() -> Self {
        Self {
            left_zone_end: 0.33,
            right_zone_start: 0.66,
        }
    }
}

impl ZoneBounds {
    /// Maps a horizontal center ratio (0 = left edge) to its lane.
    pub fn lane_for(&self, ratio: f32) -> Lane {
        if ratio < self.left_zone_end {
            Lane::Left
        } else if ratio > self.right_zone_start {
            Lane::Right
        } else {
            Lane::Center
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepthBackendKind {
    Heuristic,
    Dense,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthConfig {
    pub backend: DepthBackendKind,
    /// Pixel height of a 1 m reference object seen at 1 m.
    pub focal_constant: f32,
    pub dense_scale: f32,
    pub dense_min_value: f32,
    pub min_distance_m: f32,
    pub max_distance_m: f32,
}

impl Default for DepthConfig {
    fn default() -> Self {
        Self {
            backend: DepthBackendKind::Heuristic,
            focal_constant: 200.0,
            dense_scale: 10.0,
            dense_min_value: 1e-3,
            min_distance_m: 0.3,
            max_distance_m: 8.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub match_tolerance_px: f32,
    pub max_age_frames: u32,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            match_tolerance_px: 80.0,
            max_age_frames: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    pub x_start: f32,
    pub x_end: f32,
    pub min_bottom_ratio: f32,
    pub min_distance_m: f32,
    pub max_distance_m: f32,
    pub merge_iou: f32,
    pub merge_center_px: f32,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            x_start: 0.2,
            x_end: 0.8,
            min_bottom_ratio: 0.45,
            min_distance_m: 0.3,
            max_distance_m: 8.0,
            merge_iou: 0.5,
            merge_center_px: 40.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    pub near_distance_m: f32,
    pub far_distance_m: f32,
    pub pass_distance_increase_m: f32,
    pub lost_frames_to_switch: u32,
    pub switch_confirm_frames: u32,
    pub match_tolerance_px: f32,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            near_distance_m: 1.5,
            far_distance_m: 4.0,
            pass_distance_increase_m: 0.7,
            lost_frames_to_switch: 3,
            switch_confirm_frames: 2,
            match_tolerance_px: 80.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebounceConfig {
    pub cooldown_secs: f64,
    pub global_min_interval_secs: f64,
    pub distance_change_m: f32,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: 3.0,
            global_min_interval_secs: 1.0,
            distance_change_m: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuidanceConfig {
    /// Free space is only measured below this fraction of the frame height.
    pub lower_frame_start_ratio: f32,
    pub move_word: String,
    /// Openness a preferred lane needs before guidance commits to it.
    pub min_open_score: f32,
}

impl Default for GuidanceConfig {
    fn default() -> Self {
        Self {
            lower_frame_start_ratio: 0.5,
            move_word: "slightly".to_string(),
            min_open_score: 0.05,
        }
    }
}

fn check_ratio(name: &str, value: f32) -> EngineResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(EngineError::InvalidConfig(format!(
            "{} must lie in [0, 1], got {}",
            name, value
        )))
    }
}

fn check_range(name: &str, min: f32, max: f32) -> EngineResult<()> {
    if min > 0.0 && min < max {
        Ok(())
    } else {
        Err(EngineError::InvalidConfig(format!(
            "{} range must satisfy 0 < min < max, got [{}, {}]",
            name, min, max
        )))
    }
}

impl EngineConfig {
    pub fn validate(&self) -> EngineResult<()> {
        check_ratio(
            "detection.confidence_threshold",
            self.detection.confidence_threshold,
        )?;
        if self.detection.hazard_classes.is_empty() {
            return Err(EngineError::InvalidConfig(
                "detection.hazard_classes must not be empty".into(),
            ));
        }

        let zones = self.detection.zones;
        check_ratio("detection.zones.left_zone_end", zones.left_zone_end)?;
        check_ratio("detection.zones.right_zone_start", zones.right_zone_start)?;
        if zones.left_zone_end > zones.right_zone_start {
            return Err(EngineError::InvalidConfig(
                "left_zone_end must not exceed right_zone_start".into(),
            ));
        }

        if self.depth.focal_constant <= 0.0 || self.depth.dense_scale <= 0.0 {
            return Err(EngineError::InvalidConfig(
                "depth constants must be positive".into(),
            ));
        }
        if self.depth.dense_min_value <= 0.0 {
            return Err(EngineError::InvalidConfig(
                "depth.dense_min_value must be positive".into(),
            ));
        }
        check_range(
            "depth distance",
            self.depth.min_distance_m,
            self.depth.max_distance_m,
        )?;

        check_ratio("path.x_start", self.path.x_start)?;
        check_ratio("path.x_end", self.path.x_end)?;
        check_ratio("path.min_bottom_ratio", self.path.min_bottom_ratio)?;
        check_ratio("path.merge_iou", self.path.merge_iou)?;
        if self.path.x_start > self.path.x_end {
            return Err(EngineError::InvalidConfig(
                "path.x_start must not exceed path.x_end".into(),
            ));
        }
        check_range(
            "path distance",
            self.path.min_distance_m,
            self.path.max_distance_m,
        )?;

        if self.lock.near_distance_m > self.lock.far_distance_m {
            return Err(EngineError::InvalidConfig(
                "lock.near_distance_m must not exceed lock.far_distance_m".into(),
            ));
        }
        if self.lock.lost_frames_to_switch == 0 || self.lock.switch_confirm_frames == 0 {
            return Err(EngineError::InvalidConfig(
                "lock frame counts must be at least 1".into(),
            ));
        }

        if self.debounce.cooldown_secs < 0.0 || self.debounce.global_min_interval_secs < 0.0 {
            return Err(EngineError::InvalidConfig(
                "debounce intervals must not be negative".into(),
            ));
        }

        check_ratio(
            "guidance.lower_frame_start_ratio",
            self.guidance.lower_frame_start_ratio,
        )?;
        check_ratio("guidance.min_open_score", self.guidance.min_open_score)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.detection.hazard_classes.get(&0).map(String::as_str),
            Some("person")
        );
        assert!(!config.detection.hazard_classes.contains_key(&1));
    }

    #[test]
    fn inverted_zones_are_rejected() {
        let mut config = EngineConfig::default();
        config.detection.zones = ZoneBounds {
            left_zone_end: 0.7,
            right_zone_start: 0.3,
        };
        assert!(matches!(
            config.validate(),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn zero_confirm_frames_are_rejected() {
        let mut config = EngineConfig::default();
        config.lock.switch_confirm_frames = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zone_bounds_map_ratios_to_lanes() {
        let zones = ZoneBounds::default();
        assert_eq!(zones.lane_for(0.1), Lane::Left);
        assert_eq!(zones.lane_for(0.33), Lane::Center);
        assert_eq!(zones.lane_for(0.66), Lane::Center);
        assert_eq!(zones.lane_for(0.9), Lane::Right);
    }

    #[test]
    fn partial_sections_fill_from_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"lock": {"near_distance_m": 2.0}}"#).unwrap();
        assert_eq!(config.lock.near_distance_m, 2.0);
        assert_eq!(config.lock.switch_confirm_frames, 2);
        assert_eq!(config.debounce.cooldown_secs, 3.0);
    }
}
