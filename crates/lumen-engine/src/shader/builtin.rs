//! Built-in shader programs compiled at startup.
//!
//! All built-ins share the same interface:
//! - group 0 / binding 0: frame uniform (`render::FrameUniform`)
//! - group 1 / binding 0: object uniform (`render::ObjectUniform`)
//! - vertex locations 0..=2: position, normal, color (`mesh::Vertex`)

use super::ShaderSource;

pub const UNLIT: &str = "unlit";
pub const VERTEX_COLOR: &str = "vertex_color";
pub const LAMBERT: &str = "lambert";
pub const NORMALS: &str = "normals";
pub const DEPTH: &str = "depth";

/// Fixed, ordered list of built-in programs. Registry ids follow this order.
pub static BUILTIN_SHADERS: &[ShaderSource] = &[
    ShaderSource::from_static(
        UNLIT,
        "flat material color",
        include_str!("wgsl/unlit.wgsl"),
    ),
    ShaderSource::from_static(
        VERTEX_COLOR,
        "per-vertex color tinted by the material color",
        include_str!("wgsl/vertex_color.wgsl"),
    ),
    ShaderSource::from_static(
        LAMBERT,
        "directional diffuse + ambient",
        include_str!("wgsl/lambert.wgsl"),
    ),
    ShaderSource::from_static(
        NORMALS,
        "world-space normal visualisation",
        include_str!("wgsl/normals.wgsl"),
    ),
    ShaderSource::from_static(
        DEPTH,
        "linear view depth as grayscale",
        include_str!("wgsl/depth.wgsl"),
    ),
];

/// Looks up a built-in program by name.
pub fn builtin(name: &str) -> Option<&'static ShaderSource> {
    BUILTIN_SHADERS.iter().find(|s| s.name == name)
}
