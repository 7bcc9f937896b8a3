//! Shader programs.
//!
//! A fixed set of built-in WGSL programs is compiled once at startup into a
//! [`ShaderRegistry`]; renderers look programs up by name or [`ShaderId`].

mod builtin;
mod error;
mod interface;
mod registry;
mod source;

pub use builtin::{builtin, BUILTIN_SHADERS, DEPTH, LAMBERT, NORMALS, UNLIT, VERTEX_COLOR};
pub use error::ShaderError;
pub use interface::{ShaderBinding, ShaderInterface};
pub use registry::{ShaderId, ShaderProgram, ShaderRegistry};
pub use source::ShaderSource;
