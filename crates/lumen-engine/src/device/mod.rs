//! GPU device + surface management.
//!
//! [`Gpu`] owns the device and the window surface with its depth buffer;
//! [`Headless`] renders into offscreen textures instead.

mod adapter;
mod context;
mod depth;
mod error;
mod frame;
mod headless;
mod init;
mod surface;

pub use context::Gpu;
pub use depth::DepthBuffer;
pub use error::SurfaceErrorAction;
pub use frame::GpuFrame;
pub use headless::Headless;
pub use init::GpuInit;

#[cfg(test)]
pub(crate) use headless::test_gpu;
