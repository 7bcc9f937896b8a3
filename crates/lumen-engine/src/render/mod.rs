//! GPU rendering subsystem.
//!
//! [`Renderer`] resolves a pipeline per draw item from the shader registry and
//! hands each primitive to the draw adapter in `primitive`.
//!
//! Convention:
//! - World space is right-handed, +Y up.
//! - Group 0 carries per-frame uniforms, group 1 per-object uniforms.

mod camera;
mod ctx;
mod pipeline;
mod renderer;
mod uniforms;

pub use camera::{Camera, DirectionalLight};
pub use ctx::{RenderCtx, RenderTarget, Viewport};
pub use pipeline::{BindLayouts, PipelineCache, PipelineKey};
pub use renderer::{DrawItem, RenderObject, Renderer, RendererConfig};
pub use uniforms::{FrameUniform, ObjectUniform};
