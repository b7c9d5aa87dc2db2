//! A fixed-timestep 3D rendering demo built in Rust
//!
//! This crate provides:
//! - A lifecycle state machine driving window, GPU and scene setup
//! - A fixed simulation step decoupled from the render rate
//! - A free-fly camera with mouse look and keyboard movement
//! - A memoizing shader program cache over wgpu

pub mod assets;
pub mod core;
pub mod input;
pub mod renderer;

// Re-exports for convenience
pub use glam;
pub use wgpu;
pub use winit;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::assets::{AssetError, AssetLoader};
    pub use crate::core::{
        Engine, EngineConfig, EngineError, EngineState, FrameTiming, Platform, WindowEvent,
    };
    pub use crate::input::Input;
    pub use crate::renderer::{Camera, DrawParams, RenderBackend, SceneKind, ShaderCache};
    pub use glam::{Mat4, Vec3};
    pub use winit::keyboard::KeyCode;
}
