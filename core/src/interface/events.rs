use crate::interface::HazardDetection;
use crate::prelude::Lane;
use serde::{Deserialize, Serialize};

/// Messages pushed from the server to every subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "phase_1")]
    Hazard(HazardAlert),
    #[serde(rename = "phase_2")]
    Scene(SceneUpdate),
    #[serde(rename = "pong")]
    Pong,
}

impl ServerMessage {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Per-frame hazard event; the heartbeat form carries only the corridor count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardAlert {
    pub hazard: Option<String>,
    pub direction: Option<Lane>,
    pub distance: Option<f32>,
    pub confidence: Option<f32>,
    pub total_hazards: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance: Option<String>,
}

impl HazardAlert {
    pub fn heartbeat(total_hazards: usize) -> Self {
        Self {
            hazard: None,
            direction: None,
            distance: None,
            confidence: None,
            total_hazards,
            guidance: None,
        }
    }

    pub fn for_target(target: &HazardDetection, total_hazards: usize) -> Self {
        Self {
            hazard: Some(target.hazard.clone()),
            direction: Some(target.direction),
            distance: Some(target.distance),
            confidence: Some(target.confidence),
            total_hazards,
            guidance: target.guidance.clone(),
        }
    }

    pub fn is_heartbeat(&self) -> bool {
        self.hazard.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SceneStatus {
    Processing,
    Done,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneUpdate {
    pub status: SceneStatus,
    pub description: Option<String>,
}

impl SceneUpdate {
    pub fn processing() -> Self {
        Self {
            status: SceneStatus::Processing,
            description: None,
        }
    }

    pub fn done(description: impl Into<String>) -> Self {
        Self {
            status: SceneStatus::Done,
            description: Some(description.into()),
        }
    }
}

/// Control messages accepted from clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    TriggerPhase2,
    Ping,
}

impl ClientMessage {
    /// Parses a client frame; anything unrecognized yields `None`.
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }
}
