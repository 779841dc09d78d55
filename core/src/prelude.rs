use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// One of the three vertical bands of the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lane {
    Left,
    Center,
    Right,
}

impl Lane {
    pub const ALL: [Lane; 3] = [Lane::Left, Lane::Center, Lane::Right];

    pub fn as_str(&self) -> &'static str {
        match self {
            Lane::Left => "left",
            Lane::Center => "center",
            Lane::Right => "right",
        }
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pixel dimensions of a captured frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameShape {
    pub width: u32,
    pub height: u32,
}

impl FrameShape {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A captured frame as handed from the capture source to the backends.
///
/// `pixels` is row-major BGR and may be empty when the source annotates its
/// frames out of band (the synthetic scene does this).
#[derive(Debug, Clone)]
pub struct Frame {
    pub sequence: u64,
    pub shape: FrameShape,
    pub pixels: Arc<[u8]>,
}

impl Frame {
    pub fn new(sequence: u64, shape: FrameShape, pixels: Arc<[u8]>) -> Self {
        Self {
            sequence,
            shape,
            pixels,
        }
    }

    pub fn blank(sequence: u64, shape: FrameShape) -> Self {
        Self::new(sequence, shape, Arc::from(Vec::new()))
    }
}

/// Common error type for the engine and its backends.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("backend failure: {0}")]
    Backend(String),
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("channel closed")]
    Closed,
}

pub type EngineResult<T> = Result<T, EngineError>;
