use crate::bridge::control::ControlState;
use crate::workflow::config::CameraConfig;
use hazardcore::dispatch::{announcement, Mailbox};
use hazardcore::interface::{FrameSource, SceneCaptioner, SceneUpdate, ServerMessage};
use hazardcore::telemetry::LogManager;
use hazardcore::{Frame, HazardEngine};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

const FPS_LOG_INTERVAL: u64 = 30;
const SKIP_YIELD: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub captured: u64,
    pub processed: u64,
    pub read_failures: u64,
    pub scenes: u64,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn processing_fps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.processed as f64 / secs
        } else {
            0.0
        }
    }
}

/// The frame loop: capture, skip, decide, broadcast, speak.
///
/// Scene requests are served inline. The loop awaits the captioner, so no
/// hazard decisions are made while a description is being produced.
pub struct Runner {
    camera: CameraConfig,
    engine: HazardEngine,
    source: Box<dyn FrameSource>,
    captioner: Arc<dyn SceneCaptioner>,
    speech: Arc<Mailbox<String>>,
    control: Arc<ControlState>,
    events: broadcast::Sender<ServerMessage>,
    logger: LogManager,
}

impl Runner {
    pub fn new(
        camera: CameraConfig,
        engine: HazardEngine,
        source: Box<dyn FrameSource>,
        captioner: Arc<dyn SceneCaptioner>,
        speech: Arc<Mailbox<String>>,
        control: Arc<ControlState>,
        events: broadcast::Sender<ServerMessage>,
    ) -> Self {
        Self {
            camera,
            engine,
            source,
            captioner,
            speech,
            control,
            events,
            logger: LogManager::new("runner"),
        }
    }

    fn publish(&self, message: ServerMessage) {
        // no subscribers is not an error
        let _ = self.events.send(message);
    }

    fn speak(&self, text: String) {
        match self.speech.post(text) {
            Ok(true) => self.logger.trace("superseded an unspoken message"),
            Ok(false) => {}
            Err(err) => self.logger.warn_once("speech", &format!("speech unavailable: {}", err)),
        }
    }

    /// Runs until shutdown is requested or `frame_limit` frames were processed.
    /// The capture source must already be open; it is released on return.
    pub async fn run(&mut self, frame_limit: Option<u64>) -> RunSummary {
        let interval = Duration::from_secs_f32(1.0 / self.camera.target_fps.max(0.1));
        let retry = Duration::from_millis(self.camera.read_retry_ms);
        let skip = u64::from(self.camera.frame_skip.max(1));
        let started = Instant::now();
        let mut summary = RunSummary::default();

        while !self.control.shutdown_requested() {
            if frame_limit.map_or(false, |limit| summary.processed >= limit) {
                break;
            }
            let cycle_start = Instant::now();

            let frame = match self.source.read() {
                Ok(frame) => frame,
                Err(err) => {
                    summary.read_failures += 1;
                    self.logger
                        .warn_once("read", &format!("camera read failed, retrying: {}", err));
                    tokio::time::sleep(retry).await;
                    continue;
                }
            };
            summary.captured += 1;
            if summary.captured % skip != 0 {
                tokio::time::sleep(SKIP_YIELD).await;
                continue;
            }

            if self.control.take_scene_request() {
                self.engine.reset_debounce();
                self.describe_scene(frame).await;
                summary.scenes += 1;
                continue;
            }

            let report = self.engine.process(&frame, Instant::now());
            if let Some(target) = &report.target {
                let text = announcement(target, self.engine.lock_config());
                self.speak(text);
            }
            self.publish(ServerMessage::Hazard(report.alert));
            summary.processed += 1;

            if summary.processed % FPS_LOG_INTERVAL == 0 {
                let secs = started.elapsed().as_secs_f64();
                if secs > 0.0 {
                    self.logger.record(&format!(
                        "processing at {:.1} FPS",
                        summary.processed as f64 / secs
                    ));
                }
            }

            if let Some(rest) = interval.checked_sub(cycle_start.elapsed()) {
                tokio::time::sleep(rest).await;
            }
        }

        self.source.release();
        summary.elapsed = started.elapsed();
        summary
    }

    async fn describe_scene(&mut self, frame: Frame) {
        self.engine.metrics().record_scene_request();
        self.logger.record("describing scene");
        self.publish(ServerMessage::Scene(SceneUpdate::processing()));

        let captioner = self.captioner.clone();
        let outcome = tokio::task::spawn_blocking(move || captioner.describe(&frame)).await;
        let description = match outcome {
            Ok(Ok(description)) => description,
            Ok(Err(err)) => {
                self.logger.warn(&format!("scene description failed: {}", err));
                format!("Scene description unavailable: {}", err)
            }
            Err(err) => {
                self.logger.warn(&format!("scene description task died: {}", err));
                "Scene description unavailable: captioning task failed".to_string()
            }
        };

        self.logger.record(&format!("scene: {}", description));
        self.speak(description.clone());
        self.publish(ServerMessage::Scene(SceneUpdate::done(description)));
    }
}

/// Loads the captioner in the background; completion is only logged.
pub fn spawn_caption_preload(captioner: Arc<dyn SceneCaptioner>) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        let logger = LogManager::new("caption");
        let started = Instant::now();
        match captioner.load() {
            Ok(()) => logger.record(&format!(
                "captioner ready after {:.1} s",
                started.elapsed().as_secs_f32()
            )),
            Err(err) => logger.warn(&format!("captioner preload failed: {}", err)),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::caption::SyntheticCaptioner;
    use crate::generator::scene::SyntheticScene;
    use crate::generator::SyntheticStack;
    use crate::workflow::config::ServerConfig;
    use hazardcore::interface::SceneStatus;
    use hazardcore::telemetry::MetricsRecorder;
    use hazardcore::{EngineError, EngineResult, FrameShape};

    fn fast_config() -> ServerConfig {
        let mut config = ServerConfig::default();
        config.camera.target_fps = 1000.0;
        config.camera.frame_skip = 1;
        config.caption.latency_ms = 0;
        config.caption.load_ms = 0;
        config
    }

    struct Harness {
        runner: Runner,
        control: Arc<ControlState>,
        feed: broadcast::Receiver<ServerMessage>,
        metrics: Arc<MetricsRecorder>,
    }

    fn harness(config: &ServerConfig, captioner: Option<Arc<dyn SceneCaptioner>>) -> Harness {
        let stack = SyntheticStack::build(config);
        let metrics = Arc::new(MetricsRecorder::new());
        let engine = HazardEngine::new(
            config.engine.clone(),
            stack.detector,
            Some(stack.depth),
            metrics.clone(),
        )
        .unwrap();
        let mut source = stack.source;
        source.open().unwrap();

        let (events, feed) = broadcast::channel(256);
        let control = Arc::new(ControlState::new());
        let runner = Runner::new(
            config.camera.clone(),
            engine,
            source,
            captioner.unwrap_or(stack.captioner),
            Arc::new(Mailbox::new()),
            control.clone(),
            events,
        );
        Harness {
            runner,
            control,
            feed,
            metrics,
        }
    }

    /// Fails every other read with a transient camera error.
    #[derive(Default)]
    struct FlakyCamera {
        reads: u64,
    }

    impl FrameSource for FlakyCamera {
        fn open(&mut self) -> EngineResult<()> {
            Ok(())
        }

        fn read(&mut self) -> EngineResult<Frame> {
            self.reads += 1;
            if self.reads % 2 == 1 {
                return Err(EngineError::SourceUnavailable("usb hiccup".into()));
            }
            Ok(Frame::blank(self.reads, FrameShape::new(640, 480)))
        }
    }

    fn drain(feed: &mut broadcast::Receiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(message) = feed.try_recv() {
            out.push(message);
        }
        out
    }

    #[tokio::test]
    async fn runner_emits_one_event_per_processed_frame() {
        let mut h = harness(&fast_config(), None);
        let summary = h.runner.run(Some(12)).await;
        assert_eq!(summary.processed, 12);
        assert_eq!(summary.captured, 12);

        let events = drain(&mut h.feed);
        assert_eq!(events.len(), 12);
        assert!(events
            .iter()
            .all(|e| matches!(e, ServerMessage::Hazard(_))));
        assert_eq!(h.metrics.snapshot().frames_processed, 12);
    }

    #[tokio::test]
    async fn frame_skip_reads_but_does_not_process() {
        let mut config = fast_config();
        config.camera.frame_skip = 3;
        let mut h = harness(&config, None);
        let summary = h.runner.run(Some(4)).await;
        assert_eq!(summary.processed, 4);
        assert_eq!(summary.captured, 12);
        assert_eq!(drain(&mut h.feed).len(), 4);
    }

    #[tokio::test]
    async fn scene_request_pauses_decisions_and_speaks_description() {
        let mut h = harness(&fast_config(), None);
        h.control.request_scene();
        let summary = h.runner.run(Some(1)).await;
        assert_eq!(summary.scenes, 1);

        let events = drain(&mut h.feed);
        assert_eq!(events.len(), 3);
        match (&events[0], &events[1]) {
            (ServerMessage::Scene(first), ServerMessage::Scene(second)) => {
                assert_eq!(first.status, SceneStatus::Processing);
                assert_eq!(second.status, SceneStatus::Done);
                assert!(second.description.is_some());
            }
            other => panic!("expected two scene updates, got {:?}", other),
        }
        assert!(matches!(events[2], ServerMessage::Hazard(_)));
        assert_eq!(h.metrics.snapshot().scene_requests, 1);
    }

    #[tokio::test]
    async fn captioner_failure_still_completes_the_request() {
        let config = fast_config();
        let scene = SyntheticScene::new(&config.scene, &config.camera, 200.0);
        let failing: Arc<dyn SceneCaptioner> = Arc::new(SyntheticCaptioner::failing(scene));
        let mut h = harness(&config, Some(failing));
        h.control.request_scene();
        h.runner.run(Some(1)).await;

        let events = drain(&mut h.feed);
        assert_eq!(events.len(), 3);
        match &events[1] {
            ServerMessage::Scene(update) => {
                assert_eq!(update.status, SceneStatus::Done);
                let text = update.description.as_deref().unwrap();
                assert!(text.starts_with("Scene description unavailable"));
            }
            other => panic!("expected scene completion, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn read_failures_back_off_and_keep_the_loop_running() {
        let mut config = fast_config();
        config.camera.read_retry_ms = 1;
        let mut h = harness(&config, None);
        h.runner.source = Box::new(FlakyCamera::default());

        let summary = h.runner.run(Some(3)).await;
        assert_eq!(summary.processed, 3);
        assert_eq!(summary.captured, 3);
        assert_eq!(summary.read_failures, 3);
        assert_eq!(drain(&mut h.feed).len(), 3);
    }

    #[tokio::test]
    async fn shutdown_stops_the_loop() {
        let mut h = harness(&fast_config(), None);
        h.control.request_shutdown();
        let summary = h.runner.run(None).await;
        assert_eq!(summary.captured, 0);
    }
}
