//! Core engine module
//!
//! Lifecycle state machine, timing, events, configuration and the winit
//! platform layer.

mod app;
mod config;
mod engine;
mod error;
mod events;
mod stats;
mod time;

pub use app::{App, WinitPlatform, run};
pub use config::{ConfigError, EngineConfig};
pub use engine::{Engine, EngineState, Platform, TransitionOutcome};
pub use error::EngineError;
pub use events::{EventQueue, WindowEvent};
pub use stats::FrameStats;
pub use time::{Clock, FrameStep, FrameTiming};
