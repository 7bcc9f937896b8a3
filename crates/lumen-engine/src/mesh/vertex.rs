use bytemuck::{Pod, Zeroable};

use crate::color::Color;
use crate::primitive::VertexInput;

/// Vertex layout shared by all built-in shader programs.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
}

impl Vertex {
    const ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x3, // position
        1 => Float32x3, // normal
        2 => Float32x4  // color
    ];

    pub const STRIDE: u64 = std::mem::size_of::<Vertex>() as u64;

    pub const INPUT: VertexInput = VertexInput::per_vertex(Self::STRIDE, &Self::ATTRS);

    /// Inputs of every built-in program: one interleaved stream at slot 0.
    pub const INPUTS: &'static [VertexInput] = &[Self::INPUT];

    #[inline]
    pub fn new(position: [f32; 3], normal: [f32; 3], color: Color) -> Self {
        Self {
            position,
            normal,
            color: color.to_array(),
        }
    }
}
