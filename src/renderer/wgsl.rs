//! Uniform reflection for WGSL sources
//!
//! WGSL has no runtime uniform-location query, so the source is parsed with
//! naga and its group-0 `var<uniform>` globals are read back:
//!
//! ```text
//! @group(0) @binding(2) var<uniform> u_resolution: vec2<f32>;
//! ```
//!
//! Every uniform lives in its own binding.

use naga::{AddressSpace, Module};
use smallvec::SmallVec;

/// Uniform buffers are sized in whole 16-byte rows
const UNIFORM_ROW: u64 = 16;

/// One `var<uniform>` declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformDecl {
    /// Variable name
    pub name: String,
    /// Binding index within group 0
    pub binding: u32,
    /// Buffer size in bytes
    pub size: u64,
}

/// Uniform declarations of one stage or program
pub type UniformDecls = SmallVec<[UniformDecl; 4]>;

/// Parse `source` and collect its group-0 uniform declarations, ordered by
/// binding.
///
/// # Errors
///
/// Returns the formatted parser diagnostic if `source` is not valid WGSL.
pub fn reflect_uniforms(source: &str) -> Result<UniformDecls, String> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| e.emit_to_string(source))?;
    let mut decls = uniforms_of(&module);
    decls.sort_by_key(|d| d.binding);
    Ok(decls)
}

fn uniforms_of(module: &Module) -> UniformDecls {
    let ctx = module.to_ctx();

    module
        .global_variables
        .iter()
        .filter(|(_, var)| var.space == AddressSpace::Uniform)
        .filter_map(|(_, var)| {
            let binding = var.binding.as_ref().filter(|b| b.group == 0)?;
            let size = u64::from(module.types[var.ty].inner.size(ctx));
            Some(UniformDecl {
                name: var.name.clone()?,
                binding: binding.binding,
                size: size.div_ceil(UNIFORM_ROW) * UNIFORM_ROW,
            })
        })
        .collect()
}

/// Merge the declarations of two stages, keeping the first of any
/// duplicate binding.
pub fn merge(mut into: UniformDecls, other: &[UniformDecl]) -> UniformDecls {
    for decl in other {
        if !into.iter().any(|d| d.binding == decl.binding) {
            into.push(decl.clone());
        }
    }
    into.sort_by_key(|d| d.binding);
    into
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAGMENT: &str = r"
        // camera
        @group(0) @binding(0) var<uniform> u_inv_view_proj: mat4x4<f32>;
        @group(0) @binding(1) var<uniform> u_time: f32;
        @group(0) @binding(2) var<uniform> u_resolution: vec2< f32 >;
        @group(1) @binding(0) var<uniform> u_other: f32;
        // @group(0) @binding(9) var<uniform> u_commented: f32;
        @group(0) @binding(3) var<uniform> u_camera_pos: vec3f;
    ";

    #[test]
    fn test_reflects_group_zero_uniforms() {
        let decls = reflect_uniforms(FRAGMENT).unwrap();
        let names: Vec<_> = decls.iter().map(|d| d.name.as_str()).collect();

        assert_eq!(
            names,
            vec!["u_inv_view_proj", "u_time", "u_resolution", "u_camera_pos"]
        );
        assert_eq!(decls[0].size, 64);
        assert_eq!(decls[1].size, 16);
        assert_eq!(decls[2].size, 16);
        assert_eq!(decls[3].binding, 3);
        assert_eq!(decls[3].size, 16);
    }

    #[test]
    fn test_attributes_on_separate_lines() {
        let decls = reflect_uniforms(
            "@group(0)\n@binding(4)\nvar<uniform>\n    u_transform : mat4x4<f32>;",
        )
        .unwrap();

        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0].name, "u_transform");
        assert_eq!(decls[0].binding, 4);
        assert_eq!(decls[0].size, 64);
    }

    #[test]
    fn test_struct_uniform_is_sized() {
        let decls = reflect_uniforms(
            "struct Light { color: vec3<f32>, intensity: f32, direction: vec3<f32> }\n\
             @group(0) @binding(0) var<uniform> u_light: Light;",
        )
        .unwrap();

        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0].size, 32);
    }

    #[test]
    fn test_no_uniforms() {
        let decls = reflect_uniforms(
            "@fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }",
        )
        .unwrap();
        assert!(decls.is_empty());
    }

    #[test]
    fn test_invalid_source_is_error() {
        let err = reflect_uniforms("@group(0) @binding(0) var<uniform> u_time f32").unwrap_err();
        assert!(!err.is_empty());
    }

    #[test]
    fn test_merge_deduplicates_bindings() {
        let vertex = reflect_uniforms("@group(0) @binding(1) var<uniform> u_transform: mat4x4f;").unwrap();
        let fragment = reflect_uniforms(
            "@group(0) @binding(1) var<uniform> u_transform: mat4x4f;\n\
             @group(0) @binding(0) var<uniform> u_time: f32;",
        )
        .unwrap();

        let merged = merge(vertex, &fragment);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].name, "u_time");
        assert_eq!(merged[1].name, "u_transform");
    }
}
