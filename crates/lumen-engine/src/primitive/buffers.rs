use std::sync::atomic::{AtomicU64, Ordering};

use super::plan::{IndexLayout, PrimitiveLayout, StepMode, StreamLayout};
use super::{IndexFormat, Topology};

static NEXT_PRIMITIVE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique primitive identity. Used to key cached bind state.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrimitiveId(u64);

impl PrimitiveId {
    pub(crate) fn next() -> Self {
        Self(NEXT_PRIMITIVE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Vertex buffer bound to the slot matching its position in the stream list.
#[derive(Debug)]
pub struct VertexStream {
    pub buffer: wgpu::Buffer,
    /// Byte offset of the first element.
    pub offset: u64,
    /// Bytes per element.
    pub stride: u64,
    /// Number of elements.
    pub count: u32,
    pub step: StepMode,
}

impl VertexStream {
    /// Per-vertex stream covering the whole buffer from offset 0.
    pub fn new(buffer: wgpu::Buffer, stride: u64, count: u32) -> Self {
        Self {
            buffer,
            offset: 0,
            stride,
            count,
            step: StepMode::Vertex,
        }
    }

    pub fn per_instance(mut self) -> Self {
        self.step = StepMode::Instance;
        self
    }

    fn layout(&self) -> StreamLayout {
        StreamLayout {
            offset: self.offset,
            stride: self.stride,
            count: self.count,
            buffer_size: self.buffer.size(),
            step: self.step,
        }
    }
}

#[derive(Debug)]
pub struct IndexStream {
    pub buffer: wgpu::Buffer,
    pub offset: u64,
    pub format: IndexFormat,
    pub count: u32,
}

impl IndexStream {
    pub fn new(buffer: wgpu::Buffer, format: IndexFormat, count: u32) -> Self {
        Self {
            buffer,
            offset: 0,
            format,
            count,
        }
    }

    fn layout(&self) -> IndexLayout {
        IndexLayout {
            format: self.format,
            offset: self.offset,
            count: self.count,
            buffer_size: self.buffer.size(),
        }
    }
}

/// A drawable chunk: vertex/index buffers plus topology and instance count.
///
/// Every mutation bumps `version`, which invalidates bind state cached for the
/// primitive by a `PrimitiveDrawer`.
#[derive(Debug)]
pub struct Primitive {
    id: PrimitiveId,
    label: String,
    topology: Topology,
    streams: Vec<VertexStream>,
    index: Option<IndexStream>,
    instances: u32,
    version: u64,
}

impl Primitive {
    pub fn new(
        label: impl Into<String>,
        topology: Topology,
        streams: Vec<VertexStream>,
        index: Option<IndexStream>,
    ) -> Self {
        Self {
            id: PrimitiveId::next(),
            label: label.into(),
            topology,
            streams,
            index,
            instances: 1,
            version: 0,
        }
    }

    pub fn id(&self) -> PrimitiveId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn streams(&self) -> &[VertexStream] {
        &self.streams
    }

    pub fn index(&self) -> Option<&IndexStream> {
        self.index.as_ref()
    }

    pub fn index_format(&self) -> Option<IndexFormat> {
        self.index.as_ref().map(|ix| ix.format)
    }

    pub fn instances(&self) -> u32 {
        self.instances
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn set_instances(&mut self, instances: u32) {
        if self.instances != instances {
            self.instances = instances;
            self.touch();
        }
    }

    pub fn set_topology(&mut self, topology: Topology) {
        if self.topology != topology {
            self.topology = topology;
            self.touch();
        }
    }

    /// Swaps in new buffers, e.g. after re-uploading geometry.
    pub fn replace_streams(&mut self, streams: Vec<VertexStream>, index: Option<IndexStream>) {
        self.streams = streams;
        self.index = index;
        self.touch();
    }

    /// CPU-side summary consumed by the draw planner.
    pub fn layout(&self) -> PrimitiveLayout {
        PrimitiveLayout {
            topology: self.topology,
            streams: self.streams.iter().map(VertexStream::layout).collect(),
            index: self.index.as_ref().map(IndexStream::layout),
            instances: self.instances,
        }
    }

    #[inline]
    fn touch(&mut self) {
        self.version = self.version.wrapping_add(1);
    }
}
