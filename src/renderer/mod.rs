//! Rendering module
//!
//! Camera, shader program cache and the wgpu backend the engine draws through.

mod backend;
mod camera;
pub mod geometry;
mod gpu;
mod resource;
mod shader_cache;
pub mod wgsl;

pub use backend::{DrawParams, RenderBackend, RenderError, SceneKind};
pub use camera::Camera;
pub use gpu::WgpuBackend;
pub use resource::{GpuSlot, HandleTable};
pub use shader_cache::{
    ProgramId, ShaderCache, ShaderCompiler, ShaderError, ShaderProgram, ShaderStage, ShaderStages,
    StageSource, UniformLocation, VertexLayout,
};
