//! Real-time hazard decision engine for the walking-guidance platform.
//!
//! Raw detector boxes enter through [`engine::HazardEngine`], flow through the
//! processing stages (normalization, depth fusion, tracking, path filtering,
//! free-space scoring, lane guidance) and the decision stages (target lock,
//! debounce), and leave as exactly one [`interface::HazardAlert`] per frame.

pub mod config;
pub mod decision;
pub mod dispatch;
pub mod engine;
pub mod interface;
pub mod math;
pub mod prelude;
pub mod processing;
pub mod telemetry;

pub use config::EngineConfig;
pub use engine::{FrameReport, HazardEngine};
pub use prelude::{EngineError, EngineResult, Frame, FrameShape, Lane};
