use wgpu::util::DeviceExt;

use crate::color::Color;
use crate::primitive::{IndexFormat, IndexStream, Primitive, Topology, VertexStream};

use super::Vertex;

/// CPU-side index list in its GPU element type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Indices {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl Indices {
    /// Stores `indices` as `U16` when every value fits, `U32` otherwise.
    ///
    /// Strip topologies treat the all-ones index as a primitive restart, so
    /// for them `u16::MAX` forces `U32`.
    pub fn compact(indices: Vec<u32>, topology: Topology) -> Self {
        let limit = if topology.is_strip() {
            u16::MAX as u32 - 1
        } else {
            u16::MAX as u32
        };
        if indices.iter().all(|&i| i <= limit) {
            Indices::U16(indices.into_iter().map(|i| i as u16).collect())
        } else {
            Indices::U32(indices)
        }
    }

    /// Widens `U16` indices holding `u16::MAX` when drawn as a strip.
    pub fn for_topology(self, topology: Topology) -> Self {
        match self {
            Indices::U16(v) if topology.is_strip() && v.contains(&u16::MAX) => {
                Indices::U32(v.into_iter().map(u32::from).collect())
            }
            other => other,
        }
    }

    pub fn format(&self) -> IndexFormat {
        match self {
            Indices::U16(_) => IndexFormat::U16,
            Indices::U32(_) => IndexFormat::U32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Indices::U16(v) => v.len(),
            Indices::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max(&self) -> Option<u32> {
        match self {
            Indices::U16(v) => v.iter().max().map(|&i| i as u32),
            Indices::U32(v) => v.iter().max().copied(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Indices::U16(v) => bytemuck::cast_slice(v),
            Indices::U32(v) => bytemuck::cast_slice(v),
        }
    }
}

/// Geometry on the CPU, ready to be uploaded as a [`Primitive`].
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub topology: Topology,
    pub vertices: Vec<Vertex>,
    pub indices: Option<Indices>,
}

impl MeshData {
    pub fn new(topology: Topology, vertices: Vec<Vertex>, indices: Option<Indices>) -> Self {
        Self {
            topology,
            vertices,
            indices: indices.map(|ix| ix.for_topology(topology)),
        }
    }

    /// Sets every vertex color.
    pub fn with_color(mut self, color: Color) -> Self {
        let c = color.to_array();
        for v in &mut self.vertices {
            v.color = c;
        }
        self
    }

    /// Number of elements the draw call walks (indices if present, else vertices).
    pub fn element_count(&self) -> usize {
        self.indices
            .as_ref()
            .map_or(self.vertices.len(), Indices::len)
    }

    /// True when every index addresses an existing vertex.
    pub fn indices_in_bounds(&self) -> bool {
        match self.indices.as_ref().and_then(Indices::max) {
            Some(max) => (max as usize) < self.vertices.len(),
            None => true,
        }
    }

    /// Uploads vertices (and indices, if any) into new GPU buffers.
    ///
    /// Empty vertex or index lists produce no stream. Without a vertex stream
    /// the drawer skips the primitive for every program that reads vertex
    /// attributes (all built-ins do).
    pub fn upload(&self, device: &wgpu::Device, label: &str) -> Primitive {
        if !self.indices_in_bounds() {
            log::warn!("mesh `{label}` has indices past its {} vertices", self.vertices.len());
        }

        let mut streams = Vec::new();
        if !self.vertices.is_empty() {
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} vbo")),
                contents: bytemuck::cast_slice(&self.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
            streams.push(VertexStream::new(
                buffer,
                Vertex::STRIDE,
                self.vertices.len() as u32,
            ));
        }

        let index = self.indices.as_ref().filter(|ix| !ix.is_empty()).map(|ix| {
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} ibo")),
                contents: ix.as_bytes(),
                usage: wgpu::BufferUsages::INDEX,
            });
            IndexStream::new(buffer, ix.format(), ix.len() as u32)
        });

        Primitive::new(label, self.topology, streams, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f32) -> Vertex {
        Vertex::new([x, 0.0, 0.0], [0.0, 0.0, 1.0], Color::WHITE)
    }

    #[test]
    fn compact_picks_u16_when_possible() {
        let ix = Indices::compact(vec![0, 1, 65_535], Topology::Triangles);
        assert_eq!(ix.format(), IndexFormat::U16);
        assert_eq!(ix.as_bytes().len(), 6);
    }

    #[test]
    fn strip_index_of_u16_max_is_not_a_restart() {
        let ix = Indices::compact(vec![0, 1, 65_535], Topology::TriangleStrip);
        assert_eq!(ix, Indices::U32(vec![0, 1, 65_535]));

        let ix = Indices::compact(vec![0, 65_534], Topology::LineStrip);
        assert_eq!(ix.format(), IndexFormat::U16);
    }

    #[test]
    fn strip_mesh_widens_given_u16_indices() {
        let m = MeshData::new(
            Topology::LineStrip,
            vec![v(0.0), v(1.0)],
            Some(Indices::U16(vec![0, 1, u16::MAX])),
        );
        assert_eq!(m.indices, Some(Indices::U32(vec![0, 1, 65_535])));

        let m = MeshData::new(Topology::Lines, vec![v(0.0)], Some(Indices::U16(vec![u16::MAX])));
        assert_eq!(m.indices.map(|ix| ix.format()), Some(IndexFormat::U16));
    }

    #[test]
    fn compact_keeps_u32_for_large_indices() {
        let ix = Indices::compact(vec![0, 65_536], Topology::Triangles);
        assert_eq!(ix, Indices::U32(vec![0, 65_536]));
        assert_eq!(ix.as_bytes().len(), 8);
    }

    #[test]
    fn element_count_prefers_indices() {
        let m = MeshData::new(Topology::Triangles, vec![v(0.0), v(1.0), v(2.0)], None);
        assert_eq!(m.element_count(), 3);

        let m = MeshData::new(
            Topology::Triangles,
            vec![v(0.0), v(1.0), v(2.0)],
            Some(Indices::compact(vec![0, 1, 2, 2, 1, 0], Topology::Triangles)),
        );
        assert_eq!(m.element_count(), 6);
    }

    #[test]
    fn out_of_range_index_detected() {
        let m = MeshData::new(
            Topology::Lines,
            vec![v(0.0), v(1.0)],
            Some(Indices::compact(vec![0, 2], Topology::Lines)),
        );
        assert!(!m.indices_in_bounds());
    }

    #[test]
    fn with_color_overrides_all() {
        let m = MeshData::new(Topology::Points, vec![v(0.0), v(1.0)], None).with_color(Color::RED);
        assert!(m.vertices.iter().all(|v| v.color == [1.0, 0.0, 0.0, 1.0]));
    }
}
