use anyhow::Context;
use hazardcore::EngineConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

/// Everything the server binary needs: listener, capture pacing, the engine
/// tunables and the synthetic stand-ins for the external models.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: ListenConfig,
    pub camera: CameraConfig,
    pub engine: EngineConfig,
    pub scene: SceneConfig,
    pub caption: CaptionConfig,
    pub speech: SpeechConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8765,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub width: u32,
    pub height: u32,
    /// Rate the source delivers frames at; drives the synthetic scene clock.
    pub capture_fps: f32,
    /// Processed-frame rate the loop paces itself to.
    pub target_fps: f32,
    /// Process every Nth captured frame.
    pub frame_skip: u32,
    pub read_retry_ms: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            capture_fps: 30.0,
            target_fps: 10.0,
            frame_skip: 3,
            read_retry_ms: 10,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub seed: u64,
    pub objects: usize,
    pub walking_speed_mps: f32,
    pub jitter_px: f32,
    /// Makes the synthetic depth model refuse to load.
    pub depth_unavailable: bool,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            seed: 7,
            objects: 4,
            walking_speed_mps: 1.2,
            jitter_px: 3.0,
            depth_unavailable: false,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionConfig {
    pub load_ms: u64,
    pub latency_ms: u64,
    pub preload: bool,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            load_ms: 500,
            latency_ms: 1500,
            preload: true,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// TTS program, e.g. `espeak`; the text is passed as the last argument.
    pub command: Option<String>,
    pub args: Vec<String>,
}

impl ServerConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading server config {}", path_ref.display()))?;
        let config: ServerConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing server config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.engine.validate().context("validating engine config")?;
        anyhow::ensure!(
            self.camera.target_fps > 0.0,
            "camera.target_fps must be positive"
        );
        anyhow::ensure!(
            self.camera.capture_fps > 0.0,
            "camera.capture_fps must be positive"
        );
        anyhow::ensure!(self.camera.frame_skip >= 1, "camera.frame_skip must be at least 1");
        anyhow::ensure!(
            self.camera.width > 0 && self.camera.height > 0,
            "camera frame size must be non-zero"
        );
        Ok(())
    }

    pub fn bind_address(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .with_context(|| {
                format!(
                    "parsing listen address {}:{}",
                    self.server.host, self.server.port
                )
            })
    }
}
