//! Draw planning.
//!
//! Turns a CPU-side summary of a primitive's buffers into the exact bind and
//! draw calls to issue. Kept free of GPU handles so every rule is testable.

use std::fmt;
use std::ops::Range;

use super::{IndexFormat, Topology};

/// Whether a vertex stream advances per vertex or per instance.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum StepMode {
    #[default]
    Vertex,
    Instance,
}

impl StepMode {
    pub fn to_wgpu(self) -> wgpu::VertexStepMode {
        match self {
            StepMode::Vertex => wgpu::VertexStepMode::Vertex,
            StepMode::Instance => wgpu::VertexStepMode::Instance,
        }
    }
}

/// A vertex buffer a pipeline reads, bound at the slot equal to its position
/// in the pipeline's input list.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct VertexInput {
    pub stride: u64,
    pub step: StepMode,
    pub attributes: &'static [wgpu::VertexAttribute],
}

impl VertexInput {
    pub const fn per_vertex(stride: u64, attributes: &'static [wgpu::VertexAttribute]) -> Self {
        Self {
            stride,
            step: StepMode::Vertex,
            attributes,
        }
    }

    pub const fn per_instance(stride: u64, attributes: &'static [wgpu::VertexAttribute]) -> Self {
        Self {
            stride,
            step: StepMode::Instance,
            attributes,
        }
    }

    pub fn layout(&self) -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: self.stride,
            step_mode: self.step.to_wgpu(),
            attributes: self.attributes,
        }
    }
}

/// One vertex stream as seen by the planner. The slot is its list position.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StreamLayout {
    pub offset: u64,
    pub stride: u64,
    pub count: u32,
    pub buffer_size: u64,
    pub step: StepMode,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct IndexLayout {
    pub format: IndexFormat,
    pub offset: u64,
    pub count: u32,
    pub buffer_size: u64,
}

/// Buffer summary of a primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimitiveLayout {
    pub topology: Topology,
    pub streams: Vec<StreamLayout>,
    pub index: Option<IndexLayout>,
    pub instances: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexBinding {
    pub slot: u32,
    pub range: Range<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexBinding {
    pub format: IndexFormat,
    pub range: Range<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawCall {
    Direct {
        vertices: Range<u32>,
        instances: Range<u32>,
    },
    Indexed {
        indices: Range<u32>,
        base_vertex: i32,
        instances: Range<u32>,
    },
}

/// Everything needed to issue one draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawPlan {
    pub vertex: Vec<VertexBinding>,
    pub index: Option<IndexBinding>,
    pub call: DrawCall,
}

impl DrawPlan {
    #[inline]
    pub fn is_indexed(&self) -> bool {
        self.index.is_some()
    }
}

/// Reason a primitive cannot be drawn.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DrawSkip {
    /// Neither a per-vertex stream nor an index buffer sets the element count.
    NoVertexData,
    NoInstances,
    /// The pipeline reads a slot the primitive has no stream for.
    MissingStream { slot: u32 },
    /// A stream's stride or step mode differs from what the pipeline reads.
    LayoutMismatch { slot: u32 },
    /// A stream declares a zero stride.
    ZeroStride { slot: u32 },
    /// A stream holds no elements.
    EmptyStream { slot: u32 },
    /// A stream's declared range runs past the end of its buffer.
    StreamOverflow { slot: u32 },
    /// An instance stream holds fewer elements than instances drawn.
    InstanceOverflow { slot: u32 },
    /// Index range runs past the end of the index buffer.
    IndexOverflow,
    /// Fewer elements than the topology needs for one primitive.
    Degenerate { topology: Topology, count: u32 },
}

impl fmt::Display for DrawSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrawSkip::NoVertexData => write!(f, "no vertex or index buffers bound"),
            DrawSkip::MissingStream { slot } => {
                write!(f, "pipeline reads vertex stream {slot}, which is missing")
            }
            DrawSkip::LayoutMismatch { slot } => {
                write!(f, "vertex stream {slot} does not match the pipeline's layout")
            }
            DrawSkip::NoInstances => write!(f, "instance count is zero"),
            DrawSkip::ZeroStride { slot } => write!(f, "vertex stream {slot} has zero stride"),
            DrawSkip::EmptyStream { slot } => write!(f, "vertex stream {slot} is empty"),
            DrawSkip::StreamOverflow { slot } => {
                write!(f, "vertex stream {slot} extends past its buffer")
            }
            DrawSkip::InstanceOverflow { slot } => {
                write!(f, "instance stream {slot} is shorter than the instance count")
            }
            DrawSkip::IndexOverflow => write!(f, "index range extends past the index buffer"),
            DrawSkip::Degenerate { topology, count } => {
                write!(f, "{count} elements is too few for {topology:?}")
            }
        }
    }
}

/// Plans the bind + draw calls for drawing `layout` with a pipeline that
/// reads `inputs`.
///
/// Only the streams the pipeline reads are bound; extra streams are ignored.
pub fn plan_draw(layout: &PrimitiveLayout, inputs: &[VertexInput]) -> Result<DrawPlan, DrawSkip> {
    if inputs.is_empty() && layout.index.is_none() {
        return Err(DrawSkip::NoVertexData);
    }
    if layout.instances == 0 {
        return Err(DrawSkip::NoInstances);
    }

    let mut vertex = Vec::with_capacity(inputs.len());
    let mut vertex_count: Option<u32> = None;

    for (slot, input) in inputs.iter().enumerate() {
        let slot = slot as u32;
        let s = layout
            .streams
            .get(slot as usize)
            .ok_or(DrawSkip::MissingStream { slot })?;

        if s.stride == 0 {
            return Err(DrawSkip::ZeroStride { slot });
        }
        if s.stride != input.stride || s.step != input.step {
            return Err(DrawSkip::LayoutMismatch { slot });
        }
        // wgpu cannot bind an empty buffer slice.
        if s.count == 0 {
            return Err(DrawSkip::EmptyStream { slot });
        }

        let end = s
            .stride
            .checked_mul(s.count as u64)
            .and_then(|bytes| s.offset.checked_add(bytes))
            .filter(|&end| end <= s.buffer_size)
            .ok_or(DrawSkip::StreamOverflow { slot })?;

        match s.step {
            StepMode::Vertex => {
                vertex_count = Some(vertex_count.map_or(s.count, |c| c.min(s.count)));
            }
            StepMode::Instance => {
                if s.count < layout.instances {
                    return Err(DrawSkip::InstanceOverflow { slot });
                }
            }
        }

        vertex.push(VertexBinding {
            slot,
            range: s.offset..end,
        });
    }

    let instances = 0..layout.instances;

    let (index, call) = match layout.index {
        Some(ix) => {
            check_min(layout.topology, ix.count)?;
            let end = (ix.count as u64)
                .checked_mul(ix.format.byte_size())
                .and_then(|bytes| ix.offset.checked_add(bytes))
                .filter(|&end| end <= ix.buffer_size)
                .ok_or(DrawSkip::IndexOverflow)?;

            (
                Some(IndexBinding {
                    format: ix.format,
                    range: ix.offset..end,
                }),
                DrawCall::Indexed {
                    indices: 0..ix.count,
                    base_vertex: 0,
                    instances,
                },
            )
        }
        None => {
            // No per-vertex stream and no indices: nothing sets the vertex count.
            let count = vertex_count.ok_or(DrawSkip::NoVertexData)?;
            check_min(layout.topology, count)?;
            (
                None,
                DrawCall::Direct {
                    vertices: 0..count,
                    instances,
                },
            )
        }
    };

    Ok(DrawPlan { vertex, index, call })
}

fn check_min(topology: Topology, count: u32) -> Result<(), DrawSkip> {
    if count < topology.min_elements() {
        Err(DrawSkip::Degenerate { topology, count })
    } else {
        Ok(())
    }
}
