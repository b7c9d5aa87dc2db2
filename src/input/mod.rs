//! Input handling module
//!
//! Tracks held keys fed by the platform layer.

mod state;

pub use state::Input;
