//! Static demo geometry and built-in shader text

use super::shader_cache::{ShaderStages, VertexLayout};

/// Interleaved `[x, y, r, g, b]`
pub const TRIANGLE_VERTICES: [[f32; 5]; 3] = [
    [-0.6, -0.5, 1.0, 0.2, 0.2],
    [0.6, -0.5, 0.2, 1.0, 0.2],
    [0.0, 0.6, 0.2, 0.2, 1.0],
];

/// Interleaved `[x, y, z, r, g, b]`, front face then back face
pub const CUBE_VERTICES: [[f32; 6]; 8] = [
    [-0.5, -0.5, 0.5, 1.0, 0.0, 0.0],
    [0.5, -0.5, 0.5, 0.0, 1.0, 0.0],
    [0.5, 0.5, 0.5, 0.0, 0.0, 1.0],
    [-0.5, 0.5, 0.5, 1.0, 1.0, 0.0],
    [-0.5, -0.5, -0.5, 1.0, 0.0, 1.0],
    [0.5, -0.5, -0.5, 0.0, 1.0, 1.0],
    [0.5, 0.5, -0.5, 1.0, 1.0, 1.0],
    [-0.5, 0.5, -0.5, 0.0, 0.0, 0.0],
];

/// Counter-clockwise cube triangles
pub const CUBE_INDICES: [u32; 36] = [
    0, 1, 2, 2, 3, 0, // front
    5, 4, 7, 7, 6, 5, // back
    4, 0, 3, 3, 7, 4, // left
    1, 5, 6, 6, 2, 1, // right
    3, 2, 6, 6, 7, 3, // top
    4, 5, 1, 1, 0, 4, // bottom
];

/// One triangle covering the whole viewport
pub const FULLSCREEN_TRIANGLE: [[f32; 2]; 3] = [[-1.0, -1.0], [3.0, -1.0], [-1.0, 3.0]];

/// Cache name of the 2D flat-color program
pub const FLAT_2D_PROGRAM: &str = "flat2d";
/// Cache name of the 3D flat-color program
pub const FLAT_3D_PROGRAM: &str = "flat";
/// Cache name of the ray-march program
pub const RAYMARCH_PROGRAM: &str = "raymarch";

/// Ray-march stage files, relative to the asset directory
pub const RAYMARCH_VS_PATH: &str = "shaders/raymarch_vs.wgsl";
/// See [`RAYMARCH_VS_PATH`]
pub const RAYMARCH_FS_PATH: &str = "shaders/raymarch_fs.wgsl";

const FLAT_2D_VS: &str = r"
@group(0) @binding(0) var<uniform> u_transform: mat4x4<f32>;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec3<f32>,
};

@vertex
fn vs_main(@location(0) position: vec2<f32>, @location(1) color: vec3<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = u_transform * vec4<f32>(position, 0.0, 1.0);
    out.color = color;
    return out;
}
";

const FLAT_3D_VS: &str = r"
@group(0) @binding(0) var<uniform> u_transform: mat4x4<f32>;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec3<f32>,
};

@vertex
fn vs_main(@location(0) position: vec3<f32>, @location(1) color: vec3<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = u_transform * vec4<f32>(position, 1.0);
    out.color = color;
    return out;
}
";

const FLAT_FS: &str = r"
@fragment
fn fs_main(@location(0) color: vec3<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(color, 1.0);
}
";

/// Cache name and sources for a scene's program
pub fn program_for(kind: super::SceneKind) -> (&'static str, ShaderStages) {
    use super::SceneKind;

    match kind {
        SceneKind::Triangle => (
            FLAT_2D_PROGRAM,
            ShaderStages::inline(FLAT_2D_VS, FLAT_FS, VertexLayout::Pos2Color3),
        ),
        SceneKind::Cube => (
            FLAT_3D_PROGRAM,
            ShaderStages::inline(FLAT_3D_VS, FLAT_FS, VertexLayout::Pos3Color3),
        ),
        SceneKind::Raymarch => (
            RAYMARCH_PROGRAM,
            ShaderStages::files(RAYMARCH_VS_PATH, RAYMARCH_FS_PATH, VertexLayout::Pos2),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::SceneKind;
    use crate::renderer::shader_cache::StageSource;
    use crate::renderer::wgsl::reflect_uniforms;

    #[test]
    fn test_cube_indices_in_range() {
        assert!(CUBE_INDICES.iter().all(|&i| (i as usize) < CUBE_VERTICES.len()));
    }

    #[test]
    fn test_flat_programs_declare_transform() {
        for kind in [SceneKind::Triangle, SceneKind::Cube] {
            let (_, stages) = program_for(kind);
            let StageSource::Inline(vs) = stages.vertex else {
                panic!("flat vertex stage should be inline");
            };
            let decls = reflect_uniforms(&vs).unwrap();
            assert_eq!(decls.len(), 1);
            assert_eq!(decls[0].name, "u_transform");
        }
    }

    #[test]
    fn test_raymarch_reads_files() {
        let (name, stages) = program_for(SceneKind::Raymarch);
        assert_eq!(name, RAYMARCH_PROGRAM);
        assert!(matches!(stages.fragment, StageSource::File(_)));
    }
}
