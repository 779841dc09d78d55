use crate::config::DebounceConfig;
use std::collections::HashMap;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebounceEntry {
    pub last_alert_at: Instant,
    pub last_alert_distance: f32,
}

/// Rate-limits announcements globally and per hazard label.
///
/// Entries are keyed by label, so two objects of the same class share one
/// cooldown. History is bounded: an entry whose cooldown has elapsed can no
/// longer suppress anything and is evicted on the next acceptance.
pub struct HazardDebouncer {
    config: DebounceConfig,
    history: HashMap<String, DebounceEntry>,
    last_alert_at: Option<Instant>,
}

impl HazardDebouncer {
    pub fn new(config: DebounceConfig) -> Self {
        Self {
            config,
            history: HashMap::new(),
            last_alert_at: None,
        }
    }

    fn elapsed_secs(since: Instant, now: Instant) -> f64 {
        now.saturating_duration_since(since).as_secs_f64()
    }

    /// Returns true and records the alert when both gates pass.
    pub fn should_alert(&mut self, hazard: &str, distance: f32, now: Instant) -> bool {
        if let Some(last) = self.last_alert_at {
            if Self::elapsed_secs(last, now) < self.config.global_min_interval_secs {
                return false;
            }
        }

        if let Some(entry) = self.history.get(hazard) {
            let within_cooldown =
                Self::elapsed_secs(entry.last_alert_at, now) < self.config.cooldown_secs;
            let small_change =
                (distance - entry.last_alert_distance).abs() < self.config.distance_change_m;
            if within_cooldown && small_change {
                return false;
            }
        }

        let cooldown = self.config.cooldown_secs;
        self.history
            .retain(|_, entry| Self::elapsed_secs(entry.last_alert_at, now) < cooldown);
        self.history.insert(
            hazard.to_string(),
            DebounceEntry {
                last_alert_at: now,
                last_alert_distance: distance,
            },
        );
        self.last_alert_at = Some(now);
        true
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.last_alert_at = None;
    }

    pub fn entry(&self, hazard: &str) -> Option<&DebounceEntry> {
        self.history.get(hazard)
    }

    pub fn tracked_hazards(&self) -> usize {
        self.history.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn debouncer() -> HazardDebouncer {
        HazardDebouncer::new(DebounceConfig {
            cooldown_secs: 3.0,
            global_min_interval_secs: 1.0,
            distance_change_m: 0.5,
        })
    }

    fn at(start: Instant, secs: f64) -> Instant {
        start + Duration::from_secs_f64(secs)
    }

    #[test]
    fn first_alert_always_passes() {
        let mut d = debouncer();
        assert!(d.should_alert("person", 2.0, Instant::now()));
    }

    #[test]
    fn global_gate_spaces_any_two_alerts() {
        let mut d = debouncer();
        let t0 = Instant::now();
        assert!(d.should_alert("person", 2.0, t0));
        assert!(!d.should_alert("chair", 1.0, at(t0, 0.5)));
        assert!(d.should_alert("chair", 1.0, at(t0, 1.0)));
    }

    #[test]
    fn per_hazard_gate_needs_time_or_distance_change() {
        let mut d = debouncer();
        let t0 = Instant::now();
        assert!(d.should_alert("person", 2.0, t0));
        assert!(!d.should_alert("person", 2.1, at(t0, 1.0)));
        assert!(d.should_alert("person", 3.0, at(t0, 1.0)));
    }

    #[test]
    fn cooldown_expiry_allows_same_distance() {
        let mut d = debouncer();
        let t0 = Instant::now();
        assert!(d.should_alert("person", 2.0, t0));
        assert!(!d.should_alert("person", 2.0, at(t0, 2.9)));
        assert!(d.should_alert("person", 2.0, at(t0, 3.0)));
    }

    #[test]
    fn rejected_candidates_do_not_touch_history() {
        let mut d = debouncer();
        let t0 = Instant::now();
        assert!(d.should_alert("person", 2.0, t0));
        assert!(!d.should_alert("person", 2.1, at(t0, 1.5)));
        assert_eq!(d.entry("person").unwrap().last_alert_distance, 2.0);
        assert_eq!(d.entry("person").unwrap().last_alert_at, t0);
    }

    #[test]
    fn reset_clears_all_cooldowns() {
        let mut d = debouncer();
        let t0 = Instant::now();
        assert!(d.should_alert("person", 2.0, t0));
        d.reset();
        assert_eq!(d.tracked_hazards(), 0);
        assert!(d.should_alert("person", 2.0, at(t0, 0.1)));
    }

    #[test]
    fn expired_entries_are_evicted() {
        let mut d = debouncer();
        let t0 = Instant::now();
        assert!(d.should_alert("person", 2.0, t0));
        assert!(d.should_alert("chair", 2.0, at(t0, 1.0)));
        assert_eq!(d.tracked_hazards(), 2);
        assert!(d.should_alert("bottle", 2.0, at(t0, 5.0)));
        assert_eq!(d.tracked_hazards(), 1);
    }
}
