use crate::config::LockConfig;
use crate::dispatch::Mailbox;
use crate::interface::{HazardDetection, SpeechBackend};
use crate::prelude::Lane;
use crate::telemetry::LogManager;
use std::sync::Arc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechOutcome {
    Spoken,
    Beeped,
    Dropped,
}

/// Sentence spoken for an accepted alert.
pub fn announcement(target: &HazardDetection, lock: &LockConfig) -> String {
    let lead = if target.distance <= lock.near_distance_m {
        "Hazard near"
    } else if target.distance <= lock.far_distance_m {
        "Next object"
    } else {
        "Distant object"
    };
    let side = match target.direction {
        Lane::Left => "on your left",
        Lane::Right => "on your right",
        Lane::Center => "ahead",
    };
    let mut message = format!(
        "{}: {} {}, {:.1} meters",
        lead, target.hazard, side, target.distance
    );
    if let Some(guidance) = target.guidance.as_deref().filter(|g| !g.is_empty()) {
        message.push_str(&format!(". {}.", guidance));
    }
    message
}

/// Speaks `text`, beeping when synthesis fails.
pub fn deliver(backend: &dyn SpeechBackend, text: &str, logger: &LogManager) -> SpeechOutcome {
    let err = match backend.speak(text) {
        Ok(()) => return SpeechOutcome::Spoken,
        Err(err) => err,
    };
    logger.warn(&format!("speech failed ({}), beeping", err));
    match backend.beep() {
        Ok(()) => SpeechOutcome::Beeped,
        Err(err) => {
            logger.warn(&format!("beep failed ({}), dropping message", err));
            SpeechOutcome::Dropped
        }
    }
}

/// Drains `mailbox` until it is closed, synthesizing on the blocking pool.
pub fn spawn_speech_worker(
    mailbox: Arc<Mailbox<String>>,
    backend: Arc<dyn SpeechBackend>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let logger = Arc::new(LogManager::new("speech"));
        while let Some(text) = mailbox.recv().await {
            let backend = backend.clone();
            let task_logger = logger.clone();
            let job = tokio::task::spawn_blocking(move || {
                deliver(backend.as_ref(), &text, &task_logger)
            });
            match job.await {
                Ok(outcome) => logger.trace(&format!("speech outcome {:?}", outcome)),
                Err(err) => logger.warn(&format!("speech task aborted: {}", err)),
            }
        }
        logger.trace("speech mailbox closed");
    })
}
