//! Renderer backend contract
//!
//! The engine talks to the GPU only through [`RenderBackend`]. The wgpu
//! implementation lives in [`super::WgpuBackend`]; tests drive the engine
//! with a headless implementation.

use std::fmt;

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use super::ShaderCache;

/// Which demo geometry the backend sets up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SceneKind {
    /// A single colored triangle
    Triangle,
    /// An indexed, vertex-colored cube
    #[default]
    Cube,
    /// A full-screen ray-marched pass
    Raymarch,
}

/// Per-frame inputs for [`RenderBackend::draw`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawParams {
    /// Simulation angle in radians
    pub angle: f32,
    /// Camera view-projection
    pub view_projection: Mat4,
    /// Camera position in world space
    pub camera_position: Vec3,
    /// Seconds since start
    pub time: f32,
    /// Viewport width and height in pixels
    pub viewport: (u32, u32),
    /// Framebuffer clear color (RGBA)
    pub clear_color: [f64; 4],
    /// Draw the scene after clearing
    pub draw_scene: bool,
}

impl DrawParams {
    /// Model matrix: rotate about Y by `angle`, then about X by `0.7 * angle`
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_rotation_y(self.angle) * Mat4::from_rotation_x(self.angle * 0.7)
    }

    /// Model-view-projection for the demo geometry
    pub fn model_view_projection(&self) -> Mat4 {
        self.view_projection * self.model_matrix()
    }
}

/// Errors raised while acquiring GPU resources
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// No window/context has been acquired yet
    NoContext,
    /// Surface creation or configuration failed
    Surface(String),
    /// No suitable adapter
    Adapter,
    /// Device request failed
    Device(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoContext => write!(f, "no GPU context"),
            Self::Surface(e) => write!(f, "surface error: {e}"),
            Self::Adapter => write!(f, "no suitable GPU adapter"),
            Self::Device(e) => write!(f, "device error: {e}"),
        }
    }
}

impl std::error::Error for RenderError {}

/// GPU-side collaborator owned by the engine.
pub trait RenderBackend {
    /// Window type the platform hands over
    type Window;

    /// Acquire the GPU context for a freshly created window
    fn create_context(
        &mut self,
        window: Self::Window,
        width: u32,
        height: u32,
    ) -> Result<(), RenderError>;

    /// Check if a context is currently held
    fn has_context(&self) -> bool;

    /// Allocate buffers, upload static geometry and resolve uniforms.
    ///
    /// Fails only without a context. If the scene's program cannot be
    /// built the error is logged and later frames only clear.
    fn init(&mut self, kind: SceneKind, shaders: &mut ShaderCache) -> Result<(), RenderError>;

    /// Update the viewport. Zero sizes are ignored.
    fn resize(&mut self, width: u32, height: u32);

    /// Clear the framebuffer and, if requested, draw the scene
    fn draw(&mut self, params: &DrawParams);

    /// Release scene resources. Safe to call repeatedly.
    fn shutdown(&mut self);

    /// Delete every program in `shaders` and empty it
    fn shutdown_shaders(&mut self, shaders: &mut ShaderCache);

    /// Drop the context and window. Safe to call repeatedly.
    fn release_context(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_angle_model_is_identity() {
        let params = DrawParams {
            angle: 0.0,
            view_projection: Mat4::IDENTITY,
            camera_position: Vec3::ZERO,
            time: 0.0,
            viewport: (1, 1),
            clear_color: [0.0; 4],
            draw_scene: true,
        };

        assert!(params.model_matrix().abs_diff_eq(Mat4::IDENTITY, 1e-6));
        assert!(params.model_view_projection().abs_diff_eq(Mat4::IDENTITY, 1e-6));
    }

    #[test]
    fn test_mvp_applies_view_projection_last() {
        let vp = Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0));
        let params = DrawParams {
            angle: 1.2,
            view_projection: vp,
            camera_position: Vec3::ZERO,
            time: 0.0,
            viewport: (1, 1),
            clear_color: [0.0; 4],
            draw_scene: true,
        };

        let expected = vp * params.model_matrix();
        assert!(params.model_view_projection().abs_diff_eq(expected, 1e-6));
    }
}
