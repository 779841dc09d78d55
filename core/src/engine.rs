use crate::config::{EngineConfig, LockConfig};
use crate::decision::{HazardDebouncer, TargetLock};
use crate::interface::{DepthModel, Detector, HazardAlert, HazardDetection};
use crate::math::BoundingBox;
use crate::prelude::{EngineResult, Frame};
use crate::processing::{
    DepthFuser, DetectionNormalizer, FreeSpaceScorer, IdentityTracker, LaneGuidance, LaneScores,
    PathPreprocessor,
};
use crate::telemetry::{LogManager, MetricsRecorder};
use std::sync::Arc;
use std::time::Instant;

/// Everything decided about one processed frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    /// The single event to broadcast: an alert or a heartbeat.
    pub alert: HazardAlert,
    /// Set only when `alert` is not a heartbeat.
    pub target: Option<HazardDetection>,
    pub corridor: usize,
    pub scores: LaneScores,
}

impl FrameReport {
    fn heartbeat(corridor: usize, scores: LaneScores) -> Self {
        Self {
            alert: HazardAlert::heartbeat(corridor),
            target: None,
            corridor,
            scores,
        }
    }

    pub fn is_alert(&self) -> bool {
        self.target.is_some()
    }
}

/// Per-frame orchestration of every processing and decision stage.
///
/// Owns all run state (track table, lock, debounce history); one instance
/// per capture stream.
pub struct HazardEngine {
    config: EngineConfig,
    detector: Box<dyn Detector>,
    normalizer: DetectionNormalizer,
    depth: DepthFuser,
    tracker: IdentityTracker,
    path: PathPreprocessor,
    free_space: FreeSpaceScorer,
    guidance: LaneGuidance,
    lock: TargetLock,
    debouncer: HazardDebouncer,
    metrics: Arc<MetricsRecorder>,
    logger: LogManager,
}

impl HazardEngine {
    pub fn new(
        config: EngineConfig,
        detector: Box<dyn Detector>,
        depth_model: Option<Box<dyn DepthModel>>,
        metrics: Arc<MetricsRecorder>,
    ) -> EngineResult<Self> {
        config.validate()?;
        let normalizer = DetectionNormalizer::new(config.detection.clone());
        let depth = DepthFuser::from_config(&config.depth, depth_model);
        let free_space = FreeSpaceScorer::new(
            normalizer.zones(),
            config.guidance.lower_frame_start_ratio,
        );

        let logger = LogManager::new("engine");
        logger.record(&format!(
            "engine ready ({} hazard classes, {} depth)",
            config.detection.hazard_classes.len(),
            if depth.is_dense() { "dense" } else { "heuristic" }
        ));

        Ok(Self {
            tracker: IdentityTracker::new(config.tracking.clone()),
            path: PathPreprocessor::new(config.path.clone()),
            guidance: LaneGuidance::new(config.guidance.clone()),
            lock: TargetLock::new(config.lock.clone()),
            debouncer: HazardDebouncer::new(config.debounce.clone()),
            normalizer,
            depth,
            free_space,
            detector,
            metrics,
            logger,
            config,
        })
    }

    pub fn lock_config(&self) -> &LockConfig {
        &self.config.lock
    }

    pub fn metrics(&self) -> Arc<MetricsRecorder> {
        self.metrics.clone()
    }

    /// Clears the debounce history so the first hazard after a pause is spoken.
    pub fn reset_debounce(&mut self) {
        self.debouncer.reset();
    }

    /// Runs one frame through the pipeline. Never fails: every degraded path
    /// still yields exactly one event.
    pub fn process(&mut self, frame: &Frame, now: Instant) -> FrameReport {
        let report = self.decide(frame, now);
        self.metrics.record_frame(report.is_alert());
        report
    }

    fn decide(&mut self, frame: &Frame, now: Instant) -> FrameReport {
        let raw = match self.detector.detect(frame) {
            Ok(raw) => raw,
            Err(err) => {
                self.logger
                    .warn(&format!("detector failed on frame {}: {}", frame.sequence, err));
                self.metrics.record_detector_error();
                return FrameReport::heartbeat(0, LaneScores::new(1.0, 1.0, 1.0));
            }
        };

        let zoned = self.normalizer.normalize(&raw, frame.shape.width);
        let boxes: Vec<BoundingBox> = zoned.iter().map(|det| det.bbox).collect();
        let fusion = self.depth.estimate(frame, &boxes);
        if fusion.fell_back {
            self.metrics.record_depth_fallback();
        }

        let min_distance = self.config.depth.min_distance_m;
        let mut detections: Vec<HazardDetection> = zoned
            .into_iter()
            .zip(fusion.distances)
            .map(|(det, distance)| HazardDetection::from_zoned(det, distance, min_distance))
            .collect();
        detections.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        self.tracker.assign(&mut detections);

        let scores = self.free_space.score(frame.shape, &detections);
        let corridor = self.path.preprocess(&detections, frame.shape);
        let total = corridor.len();

        let Some(locked) = self.lock.update(&corridor) else {
            return FrameReport::heartbeat(total, scores);
        };
        let mut target = locked.detection.clone();
        let (lane, phrase) = self.guidance.choose(target.direction, &scores);
        target.recommended_lane = Some(lane);
        target.guidance = Some(phrase);

        if !self
            .debouncer
            .should_alert(&target.hazard, target.distance, now)
        {
            return FrameReport::heartbeat(total, scores);
        }

        self.logger.trace(&format!(
            "alert {} {} {:.1} m ({})",
            target.hazard,
            target.direction,
            target.distance,
            target.guidance.as_deref().unwrap_or_default()
        ));
        FrameReport {
            alert: HazardAlert::for_target(&target, total),
            target: Some(target),
            corridor: total,
            scores,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::RawDetection;
    use crate::prelude::{EngineError, FrameShape, Lane};
    use std::collections::VecDeque;
    use std::time::Duration;

    const SHAPE: FrameShape = FrameShape {
        width: 640,
        height: 480,
    };

    /// Replays a fixed script of detector results, then reports nothing.
    struct Scripted {
        frames: VecDeque<EngineResult<Vec<RawDetection>>>,
    }

    impl Scripted {
        fn new(frames: Vec<EngineResult<Vec<RawDetection>>>) -> Box<Self> {
            Box::new(Self {
                frames: frames.into(),
            })
        }
    }

    impl Detector for Scripted {
        fn detect(&mut self, _frame: &Frame) -> EngineResult<Vec<RawDetection>> {
            self.frames.pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    /// A person in the corridor; height 100 px gives 2.0 m with the heuristic.
    fn person_ahead() -> RawDetection {
        RawDetection::new(0, 0.9, BoundingBox::new(290.0, 300.0, 350.0, 400.0))
    }

    fn engine(frames: Vec<EngineResult<Vec<RawDetection>>>) -> HazardEngine {
        HazardEngine::new(
            EngineConfig::default(),
            Scripted::new(frames),
            None,
            Arc::new(MetricsRecorder::new()),
        )
        .unwrap()
    }

    fn frame(seq: u64) -> Frame {
        Frame::blank(seq, SHAPE)
    }

    #[test]
    fn empty_frame_yields_zero_heartbeat() {
        let mut engine = engine(vec![Ok(Vec::new())]);
        let report = engine.process(&frame(0), Instant::now());
        assert_eq!(report.alert, HazardAlert::heartbeat(0));
        assert!(!report.is_alert());
    }

    #[test]
    fn corridor_hazard_alerts_then_debounces() {
        let mut engine = engine(vec![Ok(vec![person_ahead()]), Ok(vec![person_ahead()])]);
        let t0 = Instant::now();

        let first = engine.process(&frame(0), t0);
        assert_eq!(first.alert.hazard.as_deref(), Some("person"));
        assert_eq!(first.alert.direction, Some(Lane::Center));
        assert_eq!(first.alert.distance, Some(2.0));
        assert_eq!(first.alert.total_hazards, 1);
        assert_eq!(first.alert.guidance.as_deref(), Some("move slightly left"));

        let second = engine.process(&frame(1), t0 + Duration::from_millis(100));
        assert!(second.alert.is_heartbeat());
        assert_eq!(second.alert.total_hazards, 1);
    }

    #[test]
    fn reset_debounce_allows_immediate_repeat() {
        let mut engine = engine(vec![Ok(vec![person_ahead()]), Ok(vec![person_ahead()])]);
        let t0 = Instant::now();
        assert!(engine.process(&frame(0), t0).is_alert());
        engine.reset_debounce();
        assert!(engine
            .process(&frame(1), t0 + Duration::from_millis(100))
            .is_alert());
    }

    #[test]
    fn detector_failure_is_a_zero_heartbeat() {
        let mut engine = engine(vec![Err(EngineError::Backend("gpu lost".into()))]);
        let report = engine.process(&frame(0), Instant::now());
        assert_eq!(report.alert, HazardAlert::heartbeat(0));
        assert_eq!(engine.metrics().snapshot().detector_errors, 1);
    }

    #[test]
    fn off_corridor_hazards_score_free_space_but_do_not_alert() {
        // bottom-left box, center ratio 0.08: outside the corridor
        let left = RawDetection::new(0, 0.9, BoundingBox::new(0.0, 240.0, 100.0, 480.0));
        let mut engine = engine(vec![Ok(vec![left])]);
        let report = engine.process(&frame(0), Instant::now());
        assert_eq!(report.alert, HazardAlert::heartbeat(0));
        assert!(report.scores.left < 1.0);
        assert_eq!(report.scores.right, 1.0);
    }

    #[test]
    fn every_frame_produces_exactly_one_event() {
        let script = vec![
            Ok(vec![person_ahead()]),
            Err(EngineError::Backend("flaky".into())),
            Ok(Vec::new()),
            Ok(vec![person_ahead()]),
        ];
        let mut engine = engine(script);
        let t0 = Instant::now();
        for seq in 0..6 {
            engine.process(&frame(seq), t0 + Duration::from_millis(100 * seq));
        }
        let metrics = engine.metrics().snapshot();
        assert_eq!(metrics.frames_processed, 6);
        assert_eq!(metrics.alerts + metrics.heartbeats, 6);
        assert_eq!(metrics.alerts, 1);
    }

    #[test]
    fn reported_distance_never_undercuts_the_depth_floor() {
        let mut config = EngineConfig::default();
        config.depth.min_distance_m = 0.34;
        config.path.min_distance_m = 0.2;
        // 1079 px tall: the heuristic gives 0.19 m, clamped to the floor
        let close = RawDetection::new(0, 0.9, BoundingBox::new(290.0, 100.0, 350.0, 1179.0));
        let mut engine = HazardEngine::new(
            config,
            Scripted::new(vec![Ok(vec![close])]),
            None,
            Arc::new(MetricsRecorder::new()),
        )
        .unwrap();

        let report = engine.process(&Frame::blank(0, FrameShape::new(640, 1180)), Instant::now());
        let distance = report.alert.distance.unwrap();
        assert!(distance >= 0.34, "reported {distance}");
        assert_eq!(distance, 0.4);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = EngineConfig::default();
        config.detection.confidence_threshold = 1.5;
        let result = HazardEngine::new(
            config,
            Scripted::new(Vec::new()),
            None,
            Arc::new(MetricsRecorder::new()),
        );
        assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
    }
}
