use crate::config::LockConfig;
use crate::interface::HazardDetection;
use crate::telemetry::LogManager;

/// The hazard currently treated as the subject of guidance.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedTarget {
    pub detection: HazardDetection,
    /// Sticky: set once the target has been within the near threshold while locked.
    pub was_near: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCandidate {
    pub detection: HazardDetection,
    pub confirm_frames: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LockState {
    NoTarget,
    Locked {
        target: TrackedTarget,
        lost_frames: u32,
        candidate: Option<SwitchCandidate>,
    },
}

/// Single-target lock with switch hysteresis.
///
/// A passed target hands over to the next corridor hazard only after that
/// hazard has been confirmed for `switch_confirm_frames` consecutive frames.
pub struct TargetLock {
    config: LockConfig,
    state: LockState,
    logger: LogManager,
}

impl TargetLock {
    pub fn new(config: LockConfig) -> Self {
        Self {
            config,
            state: LockState::NoTarget,
            logger: LogManager::new("lock"),
        }
    }

    pub fn state(&self) -> &LockState {
        &self.state
    }

    pub fn target(&self) -> Option<&TrackedTarget> {
        match &self.state {
            LockState::NoTarget => None,
            LockState::Locked { target, .. } => Some(target),
        }
    }

    /// Advances the lock by one frame. `path` must be nearest first.
    pub fn update(&mut self, path: &[HazardDetection]) -> Option<&TrackedTarget> {
        let next_state = match path.first() {
            None => LockState::NoTarget,
            Some(nearest) => match std::mem::replace(&mut self.state, LockState::NoTarget) {
                LockState::NoTarget => self.fresh_lock(nearest),
                LockState::Locked {
                    target,
                    lost_frames,
                    candidate,
                } => self.advance(target, lost_frames, candidate, path),
            },
        };
        self.state = next_state;
        self.target()
    }

    fn fresh_lock(&self, detection: &HazardDetection) -> LockState {
        self.logger.trace(&format!(
            "locked {} at {:.1} m",
            detection.hazard, detection.distance
        ));
        LockState::Locked {
            target: TrackedTarget {
                detection: detection.clone(),
                was_near: detection.distance <= self.config.near_distance_m,
            },
            lost_frames: 0,
            candidate: None,
        }
    }

    fn advance(
        &self,
        target: TrackedTarget,
        lost_frames: u32,
        candidate: Option<SwitchCandidate>,
        path: &[HazardDetection],
    ) -> LockState {
        let Some(matched) = self.find_match(&target.detection, path) else {
            let lost_frames = lost_frames + 1;
            if lost_frames >= self.config.lost_frames_to_switch {
                self.logger.trace(&format!(
                    "{} lost for {} frames, reacquiring",
                    target.detection.hazard, lost_frames
                ));
                return self.fresh_lock(&path[0]);
            }
            return LockState::Locked {
                target,
                lost_frames,
                candidate,
            };
        };

        let near = self.config.near_distance_m;
        let was_near = target.was_near || matched.distance <= near;
        let passed = was_near
            && matched.distance - target.detection.distance
                >= self.config.pass_distance_increase_m
            && matched.distance > near;

        if !passed {
            return LockState::Locked {
                target: TrackedTarget {
                    detection: matched.clone(),
                    was_near,
                },
                lost_frames: 0,
                candidate: None,
            };
        }

        let Some(next) = self.next_after(matched, path) else {
            self.logger
                .trace(&format!("passed {}, corridor clear", matched.hazard));
            return LockState::NoTarget;
        };

        let confirm_frames = match candidate {
            Some(existing) if self.same_hazard(&existing.detection, next) => {
                existing.confirm_frames + 1
            }
            _ => 1,
        };

        if confirm_frames >= self.config.switch_confirm_frames {
            self.logger.trace(&format!(
                "passed {}, switching to {}",
                matched.hazard, next.hazard
            ));
            return self.fresh_lock(next);
        }

        LockState::Locked {
            target,
            lost_frames: 0,
            candidate: Some(SwitchCandidate {
                detection: next.clone(),
                confirm_frames,
            }),
        }
    }

    fn same_hazard(&self, a: &HazardDetection, b: &HazardDetection) -> bool {
        a.hazard == b.hazard && a.bbox.center_distance(&b.bbox) <= self.config.match_tolerance_px
    }

    /// Same label, nearest center, within tolerance.
    fn find_match<'a>(
        &self,
        target: &HazardDetection,
        path: &'a [HazardDetection],
    ) -> Option<&'a HazardDetection> {
        path.iter()
            .filter(|det| det.hazard == target.hazard)
            .map(|det| (det, det.bbox.center_distance(&target.bbox)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .filter(|(_, delta)| *delta <= self.config.match_tolerance_px)
            .map(|(det, _)| det)
    }

    /// First corridor hazard outside the matched target's region.
    fn next_after<'a>(
        &self,
        matched: &HazardDetection,
        path: &'a [HazardDetection],
    ) -> Option<&'a HazardDetection> {
        path.iter()
            .find(|det| det.bbox.center_distance(&matched.bbox) > self.config.match_tolerance_px)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::BoundingBox;
    use crate::prelude::Lane;

    fn det(label: &str, center_x: f32, distance: f32) -> HazardDetection {
        HazardDetection {
            hazard: label.into(),
            direction: Lane::Center,
            distance,
            confidence: 0.9,
            bbox: BoundingBox::new(center_x - 20.0, 300.0, center_x + 20.0, 400.0),
            track_id: None,
            recommended_lane: None,
            guidance: None,
        }
    }

    fn sorted(mut dets: Vec<HazardDetection>) -> Vec<HazardDetection> {
        dets.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        dets
    }

    fn lock() -> TargetLock {
        TargetLock::new(LockConfig {
            near_distance_m: 1.5,
            far_distance_m: 4.0,
            pass_distance_increase_m: 0.7,
            lost_frames_to_switch: 3,
            switch_confirm_frames: 2,
            match_tolerance_px: 80.0,
        })
    }

    fn locked_label(lock: &TargetLock) -> Option<(String, f32)> {
        lock.target()
            .map(|t| (t.detection.hazard.clone(), t.detection.distance))
    }

    #[test]
    fn empty_corridor_means_no_target() {
        let mut lock = lock();
        assert!(lock.update(&[]).is_none());
        assert_eq!(lock.state(), &LockState::NoTarget);
    }

    #[test]
    fn first_frame_locks_the_nearest() {
        let mut lock = lock();
        let path = sorted(vec![det("chair", 200.0, 3.0), det("person", 320.0, 1.2)]);
        let target = lock.update(&path).unwrap();
        assert_eq!(target.detection.hazard, "person");
        assert!(target.was_near);
    }

    #[test]
    fn empty_frame_drops_an_existing_lock() {
        let mut lock = lock();
        lock.update(&[det("person", 320.0, 1.2)]);
        assert!(lock.update(&[]).is_none());
    }

    #[test]
    fn matched_target_follows_updates() {
        let mut lock = lock();
        lock.update(&[det("person", 320.0, 3.0)]);
        let target = lock.update(&[det("person", 330.0, 2.5)]).unwrap();
        assert_eq!(target.detection.distance, 2.5);
        assert!(!target.was_near);

        let target = lock.update(&[det("person", 335.0, 1.4)]).unwrap();
        assert!(target.was_near);
    }

    #[test]
    fn passed_target_switches_only_after_confirmation() {
        let mut lock = lock();
        lock.update(&sorted(vec![det("person", 320.0, 1.2), det("chair", 500.0, 3.0)]));

        // person moved past: 1.2 -> 2.0 (increase 0.8, now beyond near)
        let passed = sorted(vec![det("person", 320.0, 2.0), det("chair", 500.0, 3.0)]);
        lock.update(&passed);
        assert_eq!(locked_label(&lock), Some(("person".into(), 1.2)));
        match lock.state() {
            LockState::Locked {
                candidate: Some(c), ..
            } => assert_eq!(c.confirm_frames, 1),
            other => panic!("expected a pending candidate, got {:?}", other),
        }

        lock.update(&passed);
        assert_eq!(locked_label(&lock), Some(("chair".into(), 3.0)));
        assert!(!lock.target().unwrap().was_near);
    }

    #[test]
    fn flickering_candidate_does_not_switch() {
        let mut lock = lock();
        lock.update(&sorted(vec![det("person", 320.0, 1.2), det("chair", 500.0, 3.0)]));

        lock.update(&sorted(vec![det("person", 320.0, 2.0), det("chair", 500.0, 3.0)]));
        // a different hazard takes the next slot for one frame
        lock.update(&sorted(vec![det("person", 320.0, 2.0), det("bottle", 120.0, 2.6)]));
        assert_eq!(locked_label(&lock), Some(("person".into(), 1.2)));

        lock.update(&sorted(vec![det("person", 320.0, 2.0), det("chair", 500.0, 3.0)]));
        assert_eq!(locked_label(&lock), Some(("person".into(), 1.2)));
    }

    #[test]
    fn passed_target_with_clear_corridor_releases_lock() {
        let mut lock = lock();
        lock.update(&[det("person", 320.0, 1.2)]);
        assert!(lock.update(&[det("person", 320.0, 2.0)]).is_none());
    }

    #[test]
    fn lost_target_is_replaced_by_current_nearest() {
        let mut lock = lock();
        lock.update(&[det("person", 320.0, 2.0)]);

        let others = [det("bench", 300.0, 2.5)];
        lock.update(&others);
        lock.update(&others);
        assert_eq!(locked_label(&lock), Some(("person".into(), 2.0)));

        lock.update(&others);
        assert_eq!(locked_label(&lock), Some(("bench".into(), 2.5)));
    }

    #[test]
    fn rematch_resets_lost_counter() {
        let mut lock = lock();
        lock.update(&[det("person", 320.0, 2.0)]);
        let others = [det("bench", 300.0, 2.5)];
        lock.update(&others);
        lock.update(&others);
        lock.update(&[det("person", 320.0, 2.0)]);
        lock.update(&others);
        lock.update(&others);
        assert_eq!(locked_label(&lock), Some(("person".into(), 2.0)));
    }

    #[test]
    fn far_move_of_same_label_is_not_a_match() {
        let mut lock = lock();
        lock.update(&[det("person", 100.0, 2.0)]);
        lock.update(&[det("person", 500.0, 2.0)]);
        match lock.state() {
            LockState::Locked { lost_frames, .. } => assert_eq!(*lost_frames, 1),
            other => panic!("expected lock, got {:?}", other),
        }
    }
}
