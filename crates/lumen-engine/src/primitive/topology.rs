/// How vertices are assembled into primitives.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Topology {
    Points,
    Lines,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
}

impl Topology {
    pub fn to_wgpu(self) -> wgpu::PrimitiveTopology {
        match self {
            Topology::Points => wgpu::PrimitiveTopology::PointList,
            Topology::Lines => wgpu::PrimitiveTopology::LineList,
            Topology::LineStrip => wgpu::PrimitiveTopology::LineStrip,
            Topology::Triangles => wgpu::PrimitiveTopology::TriangleList,
            Topology::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
        }
    }

    /// Strip topologies need the index format baked into the pipeline.
    #[inline]
    pub fn is_strip(self) -> bool {
        matches!(self, Topology::LineStrip | Topology::TriangleStrip)
    }

    /// Fewest vertices (or indices) that produce at least one primitive.
    #[inline]
    pub fn min_elements(self) -> u32 {
        match self {
            Topology::Points => 1,
            Topology::Lines | Topology::LineStrip => 2,
            Topology::Triangles | Topology::TriangleStrip => 3,
        }
    }

    /// Triangle topologies are the only ones affected by face culling.
    #[inline]
    pub fn is_triangles(self) -> bool {
        matches!(self, Topology::Triangles | Topology::TriangleStrip)
    }
}

/// Index element type.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    U16,
    U32,
}

impl IndexFormat {
    #[inline]
    pub const fn byte_size(self) -> u64 {
        match self {
            IndexFormat::U16 => 2,
            IndexFormat::U32 => 4,
        }
    }

    pub fn to_wgpu(self) -> wgpu::IndexFormat {
        match self {
            IndexFormat::U16 => wgpu::IndexFormat::Uint16,
            IndexFormat::U32 => wgpu::IndexFormat::Uint32,
        }
    }

    /// Smallest format able to address `vertex_count` vertices.
    pub fn for_vertex_count(vertex_count: usize) -> Self {
        if vertex_count <= u16::MAX as usize + 1 {
            IndexFormat::U16
        } else {
            IndexFormat::U32
        }
    }
}
