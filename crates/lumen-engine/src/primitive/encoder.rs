use std::ops::Range;

use crate::render::PipelineKey;

use super::plan::{DrawCall, DrawPlan, VertexInput};
use super::Primitive;

/// Pipeline + bind groups a primitive is drawn with.
///
/// `binding` identifies the set of `bind_groups`: equal values must mean the
/// same bind groups. Cached bind state is kept per primitive and binding, so
/// one primitive drawn with several objects caches one bundle per object.
/// `vertex_inputs` must be the buffers `pipeline` was built to read.
pub struct BindState<'a> {
    pub pipeline: &'a wgpu::RenderPipeline,
    pub pipeline_key: PipelineKey,
    pub vertex_inputs: &'a [VertexInput],
    pub bind_groups: &'a [&'a wgpu::BindGroup],
    pub binding: u64,
}

/// Common surface of `RenderPass` and `RenderBundleEncoder`.
///
/// Lets the same binding sequence be issued live or recorded into a bundle.
pub trait DrawEncoder<'a> {
    fn bind_pipeline(&mut self, pipeline: &'a wgpu::RenderPipeline);
    fn bind_group(&mut self, index: u32, group: &'a wgpu::BindGroup);
    fn bind_vertex(&mut self, slot: u32, slice: wgpu::BufferSlice<'a>);
    fn bind_index(&mut self, slice: wgpu::BufferSlice<'a>, format: wgpu::IndexFormat);
    fn draw_vertices(&mut self, vertices: Range<u32>, instances: Range<u32>);
    fn draw_indices(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>);
}

impl<'a> DrawEncoder<'a> for wgpu::RenderPass<'_> {
    fn bind_pipeline(&mut self, pipeline: &'a wgpu::RenderPipeline) {
        self.set_pipeline(pipeline);
    }

    fn bind_group(&mut self, index: u32, group: &'a wgpu::BindGroup) {
        self.set_bind_group(index, group, &[]);
    }

    fn bind_vertex(&mut self, slot: u32, slice: wgpu::BufferSlice<'a>) {
        self.set_vertex_buffer(slot, slice);
    }

    fn bind_index(&mut self, slice: wgpu::BufferSlice<'a>, format: wgpu::IndexFormat) {
        self.set_index_buffer(slice, format);
    }

    fn draw_vertices(&mut self, vertices: Range<u32>, instances: Range<u32>) {
        self.draw(vertices, instances);
    }

    fn draw_indices(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>) {
        self.draw_indexed(indices, base_vertex, instances);
    }
}

impl<'a> DrawEncoder<'a> for wgpu::RenderBundleEncoder<'a> {
    fn bind_pipeline(&mut self, pipeline: &'a wgpu::RenderPipeline) {
        self.set_pipeline(pipeline);
    }

    fn bind_group(&mut self, index: u32, group: &'a wgpu::BindGroup) {
        self.set_bind_group(index, group, &[]);
    }

    fn bind_vertex(&mut self, slot: u32, slice: wgpu::BufferSlice<'a>) {
        self.set_vertex_buffer(slot, slice);
    }

    fn bind_index(&mut self, slice: wgpu::BufferSlice<'a>, format: wgpu::IndexFormat) {
        self.set_index_buffer(slice, format);
    }

    fn draw_vertices(&mut self, vertices: Range<u32>, instances: Range<u32>) {
        self.draw(vertices, instances);
    }

    fn draw_indices(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>) {
        self.draw_indexed(indices, base_vertex, instances);
    }
}

/// Issues pipeline, bind groups, buffers and the draw call described by `plan`.
pub(super) fn encode<'a, E>(
    enc: &mut E,
    state: &BindState<'a>,
    primitive: &'a Primitive,
    plan: &DrawPlan,
) where
    E: DrawEncoder<'a>,
{
    enc.bind_pipeline(state.pipeline);
    for (i, &group) in state.bind_groups.iter().enumerate() {
        enc.bind_group(i as u32, group);
    }

    let streams = primitive.streams();
    for binding in &plan.vertex {
        let stream = &streams[binding.slot as usize];
        enc.bind_vertex(binding.slot, stream.buffer.slice(binding.range.clone()));
    }

    if let (Some(binding), Some(ix)) = (&plan.index, primitive.index()) {
        enc.bind_index(ix.buffer.slice(binding.range.clone()), binding.format.to_wgpu());
    }

    match &plan.call {
        DrawCall::Direct { vertices, instances } => {
            enc.draw_vertices(vertices.clone(), instances.clone());
        }
        DrawCall::Indexed {
            indices,
            base_vertex,
            instances,
        } => {
            enc.draw_indices(indices.clone(), *base_vertex, instances.clone());
        }
    }
}
