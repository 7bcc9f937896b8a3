//! Primitives and the draw adapter.
//!
//! A [`Primitive`] owns vertex/index buffers plus topology and instance count.
//! [`PrimitiveDrawer`] turns one into bind + draw calls on a render pass,
//! optionally caching the bind state as a render bundle per primitive.

mod buffers;
mod cache;
mod drawer;
mod encoder;
mod plan;
mod topology;

pub use buffers::{IndexStream, Primitive, PrimitiveId, VertexStream};
pub use cache::BindCache;
pub use drawer::{DrawOutcome, DrawStats, DrawerConfig, PrimitiveDrawer};
pub use encoder::{BindState, DrawEncoder};
pub use plan::{
    plan_draw, DrawCall, DrawPlan, DrawSkip, IndexBinding, IndexLayout, PrimitiveLayout, StepMode,
    StreamLayout, VertexBinding, VertexInput,
};
pub use topology::{IndexFormat, Topology};
