use serde::Serialize;
use std::sync::Mutex;

/// Run counters shared between the frame loop and the status endpoint.
pub struct MetricsRecorder {
    inner: Mutex<Metrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Metrics {
    pub frames_processed: u64,
    pub alerts: u64,
    pub heartbeats: u64,
    pub detector_errors: u64,
    pub depth_fallbacks: u64,
    pub scene_requests: u64,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Metrics::default()),
        }
    }

    fn update(&self, apply: impl FnOnce(&mut Metrics)) {
        if let Ok(mut metrics) = self.inner.lock() {
            apply(&mut metrics);
        }
    }

    pub fn record_frame(&self, alerted: bool) {
        self.update(|m| {
            m.frames_processed += 1;
            if alerted {
                m.alerts += 1;
            } else {
                m.heartbeats += 1;
            }
        });
    }

    pub fn record_detector_error(&self) {
        self.update(|m| m.detector_errors += 1);
    }

    pub fn record_depth_fallback(&self) {
        self.update(|m| m.depth_fallbacks += 1);
    }

    pub fn record_scene_request(&self) {
        self.update(|m| m.scene_requests += 1);
    }

    pub fn snapshot(&self) -> Metrics {
        self.inner.lock().map(|m| *m).unwrap_or_default()
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_split_into_alerts_and_heartbeats() {
        let metrics = MetricsRecorder::new();
        metrics.record_frame(true);
        metrics.record_frame(false);
        metrics.record_frame(false);
        metrics.record_detector_error();

        let snap = metrics.snapshot();
        assert_eq!(snap.frames_processed, 3);
        assert_eq!(snap.alerts, 1);
        assert_eq!(snap.heartbeats, 2);
        assert_eq!(snap.detector_errors, 1);
    }
}
