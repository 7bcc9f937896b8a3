//! CPU mesh data and upload into GPU primitives.

mod data;
mod shapes;
mod vertex;

pub use data::{Indices, MeshData};
pub use vertex::Vertex;
