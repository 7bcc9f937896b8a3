use std::collections::HashSet;

use super::cache::BindCache;
use super::encoder::{encode, BindState};
use super::plan::{plan_draw, DrawSkip};
use super::{Primitive, PrimitiveId};

/// Draw adapter configuration.
#[derive(Debug, Clone)]
pub struct DrawerConfig {
    /// Record bind state into render bundles and replay them on later frames.
    ///
    /// When disabled every draw binds its buffers directly on the pass.
    pub bind_cache: bool,

    /// Evict cached bundles of primitives not drawn during the previous frame.
    pub evict_unused: bool,
}

impl Default for DrawerConfig {
    fn default() -> Self {
        Self {
            bind_cache: true,
            evict_unused: true,
        }
    }
}

/// How a single `draw` call was carried out.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DrawOutcome {
    /// Buffers were bound directly on the pass.
    Direct,
    /// A new bundle was recorded and executed.
    Recorded,
    /// A cached bundle was executed.
    Replayed,
    Skipped(DrawSkip),
}

/// Per-frame counters.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct DrawStats {
    pub direct: u32,
    pub recorded: u32,
    pub replayed: u32,
    pub skipped: u32,
}

impl DrawStats {
    fn count(&mut self, outcome: DrawOutcome) {
        match outcome {
            DrawOutcome::Direct => self.direct += 1,
            DrawOutcome::Recorded => self.recorded += 1,
            DrawOutcome::Replayed => self.replayed += 1,
            DrawOutcome::Skipped(_) => self.skipped += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.direct + self.recorded + self.replayed
    }
}

/// Binds a primitive's buffers and issues its draw call.
///
/// Undrawable primitives are skipped with one warning per primitive for the
/// lifetime of the drawer.
pub struct PrimitiveDrawer {
    config: DrawerConfig,
    cache: BindCache,
    warned: HashSet<PrimitiveId>,
    stats: DrawStats,
}

impl PrimitiveDrawer {
    pub fn new(config: DrawerConfig) -> Self {
        Self {
            config,
            cache: BindCache::new(),
            warned: HashSet::new(),
            stats: DrawStats::default(),
        }
    }

    pub fn config(&self) -> &DrawerConfig {
        &self.config
    }

    /// Switches bundle caching; cached bundles are dropped on any change.
    ///
    /// Warnings already issued and this frame's counters are kept.
    pub fn set_bind_cache(&mut self, enabled: bool) {
        if self.config.bind_cache != enabled {
            self.config.bind_cache = enabled;
            self.cache.clear();
        }
    }

    pub fn cache(&self) -> &BindCache {
        &self.cache
    }

    /// Counters since the last `begin_frame`.
    pub fn stats(&self) -> DrawStats {
        self.stats
    }

    /// Resets counters and evicts bundles unused during the previous frame.
    pub fn begin_frame(&mut self) {
        self.stats = DrawStats::default();
        if self.config.bind_cache && self.config.evict_unused {
            let evicted = self.cache.begin_frame();
            if evicted > 0 {
                log::trace!("evicted {evicted} unused bind bundles");
            }
        }
    }

    /// Draws `primitive` into `pass` with the given pipeline and bind groups.
    pub fn draw(
        &mut self,
        device: &wgpu::Device,
        pass: &mut wgpu::RenderPass<'_>,
        state: &BindState<'_>,
        primitive: &Primitive,
    ) -> DrawOutcome {
        let outcome = self.dispatch(device, pass, state, primitive);
        self.stats.count(outcome);
        outcome
    }

    fn dispatch(
        &mut self,
        device: &wgpu::Device,
        pass: &mut wgpu::RenderPass<'_>,
        state: &BindState<'_>,
        primitive: &Primitive,
    ) -> DrawOutcome {
        // A fresh bundle implies the primitive planned successfully when recorded.
        if self.config.bind_cache {
            if let Some(bundle) = self.cache.lookup(primitive, state) {
                pass.execute_bundles(std::iter::once(bundle));
                return DrawOutcome::Replayed;
            }
        }

        let plan = match plan_draw(&primitive.layout(), state.vertex_inputs) {
            Ok(plan) => plan,
            Err(skip) => {
                self.warn_once(primitive, skip);
                return DrawOutcome::Skipped(skip);
            }
        };

        if self.config.bind_cache {
            let bundle = self.cache.record(device, state, primitive, &plan);
            pass.execute_bundles(std::iter::once(bundle));
            DrawOutcome::Recorded
        } else {
            encode(pass, state, primitive, &plan);
            DrawOutcome::Direct
        }
    }

    /// Logs `skip` unless this primitive was already reported. Returns whether it logged.
    fn warn_once(&mut self, primitive: &Primitive, skip: DrawSkip) -> bool {
        if !self.warned.insert(primitive.id()) {
            return false;
        }
        log::warn!("skipping primitive `{}`: {skip}", primitive.label());
        true
    }

    /// Drops cached state and the warning mark for a primitive being destroyed.
    pub fn forget(&mut self, id: PrimitiveId) {
        self.cache.evict(id);
        self.warned.remove(&id);
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

impl Default for PrimitiveDrawer {
    fn default() -> Self {
        Self::new(DrawerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use wgpu::util::DeviceExt;

    use super::*;
    use crate::device::{test_gpu, Headless};
    use crate::mesh::{MeshData, Vertex};
    use crate::primitive::{IndexFormat, IndexStream, Topology, VertexInput};
    use crate::render::{PipelineKey, RenderTarget};
    use crate::shader::ShaderId;

    #[test]
    fn warns_once_per_primitive() {
        let mut d = PrimitiveDrawer::default();
        let p = Primitive::new("bare", Topology::Triangles, Vec::new(), None);
        let q = Primitive::new("other", Topology::Triangles, Vec::new(), None);

        assert!(d.warn_once(&p, DrawSkip::NoVertexData));
        assert!(!d.warn_once(&p, DrawSkip::NoVertexData));
        assert!(!d.warn_once(&p, DrawSkip::NoInstances));
        assert!(d.warn_once(&q, DrawSkip::NoVertexData));
    }

    #[test]
    fn forget_rearms_warning() {
        let mut d = PrimitiveDrawer::default();
        let p = Primitive::new("bare", Topology::Lines, Vec::new(), None);
        assert!(d.warn_once(&p, DrawSkip::NoVertexData));
        d.forget(p.id());
        assert!(d.warn_once(&p, DrawSkip::NoVertexData));
    }

    #[test]
    fn stats_count_outcomes() {
        let mut s = DrawStats::default();
        s.count(DrawOutcome::Direct);
        s.count(DrawOutcome::Replayed);
        s.count(DrawOutcome::Replayed);
        s.count(DrawOutcome::Skipped(DrawSkip::NoInstances));
        assert_eq!(s.replayed, 2);
        assert_eq!(s.skipped, 1);
        assert_eq!(s.total(), 3);
    }

    #[test]
    fn begin_frame_resets_stats() {
        let mut d = PrimitiveDrawer::new(DrawerConfig {
            bind_cache: false,
            ..DrawerConfig::default()
        });
        d.stats.count(DrawOutcome::Direct);
        d.begin_frame();
        assert_eq!(d.stats(), DrawStats::default());
        assert!(d.cache().is_empty());
    }

    #[test]
    fn toggling_the_cache_keeps_warnings_and_counters() {
        let mut d = PrimitiveDrawer::default();
        let p = Primitive::new("bare", Topology::Triangles, Vec::new(), None);
        assert!(d.warn_once(&p, DrawSkip::NoVertexData));
        d.stats.count(DrawOutcome::Skipped(DrawSkip::NoVertexData));

        d.set_bind_cache(false);
        assert!(!d.config().bind_cache);
        assert_eq!(d.stats().skipped, 1);
        assert!(!d.warn_once(&p, DrawSkip::NoVertexData));

        d.set_bind_cache(true);
        assert!(d.config().bind_cache);
        assert_eq!(d.stats().skipped, 1);
    }

    // ── drawing on a device ───────────────────────────────────────────────

    const COLOR: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    const POSITIONS: &str = r#"
        @vertex
        fn vs_main(@location(0) p: vec3<f32>) -> @builtin(position) vec4<f32> {
            return vec4<f32>(p, 1.0);
        }
        @fragment
        fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }
    "#;

    const PROCEDURAL: &str = r#"
        @vertex
        fn vs_main(@builtin(vertex_index) i: u32) -> @builtin(position) vec4<f32> {
            return vec4<f32>(f32(i) * 0.5, f32(i & 1u), 0.0, 1.0);
        }
        @fragment
        fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }
    "#;

    fn pipeline(gpu: &Headless, wgsl: &str, inputs: &[VertexInput]) -> wgpu::RenderPipeline {
        let device = gpu.device();
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("drawer test"),
            source: wgpu::ShaderSource::Wgsl(wgsl.into()),
        });
        let buffers: Vec<_> = inputs.iter().map(VertexInput::layout).collect();

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("drawer test"),
            layout: None,
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &buffers,
            },
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(COLOR.into())],
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        })
    }

    fn key(shader: u32) -> PipelineKey {
        PipelineKey::new(ShaderId(shader), Topology::Triangles, None, COLOR, None)
    }

    fn color_pass<'e>(target: &'e mut RenderTarget<'_>) -> wgpu::RenderPass<'e> {
        target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("drawer test pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        })
    }

    /// Runs one frame drawing `primitive` once; returns the outcome.
    fn frame(
        gpu: &Headless,
        d: &mut PrimitiveDrawer,
        state: &BindState<'_>,
        primitive: &Primitive,
    ) -> DrawOutcome {
        let mut outcome = None;
        gpu.render(|ctx, target| {
            d.begin_frame();
            let mut pass = color_pass(target);
            outcome = Some(d.draw(ctx.device, &mut pass, state, primitive));
        });
        outcome.unwrap()
    }

    #[test]
    fn bundle_is_recorded_replayed_and_rerecorded_on_change() {
        let Some(gpu) = test_gpu() else { return };
        let pipe = pipeline(&gpu, POSITIONS, Vertex::INPUTS);
        let mut prim = MeshData::triangle().upload(gpu.device(), "tri");
        let mut d = PrimitiveDrawer::default();

        let state = BindState {
            pipeline: &pipe,
            pipeline_key: key(0),
            vertex_inputs: Vertex::INPUTS,
            bind_groups: &[],
            binding: 1,
        };
        assert_eq!(frame(&gpu, &mut d, &state, &prim), DrawOutcome::Recorded);
        assert_eq!(frame(&gpu, &mut d, &state, &prim), DrawOutcome::Replayed);
        assert_eq!(d.cache().len(), 1);

        prim.set_instances(2);
        assert_eq!(frame(&gpu, &mut d, &state, &prim), DrawOutcome::Recorded);

        let other = BindState {
            pipeline_key: key(1),
            ..state
        };
        assert_eq!(frame(&gpu, &mut d, &other, &prim), DrawOutcome::Recorded);
        assert_eq!(frame(&gpu, &mut d, &other, &prim), DrawOutcome::Replayed);
        assert_eq!(d.cache().len(), 1);
        assert!(d.cache().contains(prim.id()));
    }

    #[test]
    fn disabled_cache_draws_directly() {
        let Some(gpu) = test_gpu() else { return };
        let pipe = pipeline(&gpu, POSITIONS, Vertex::INPUTS);
        let prim = MeshData::triangle().upload(gpu.device(), "tri");
        let mut d = PrimitiveDrawer::default();
        let state = BindState {
            pipeline: &pipe,
            pipeline_key: key(0),
            vertex_inputs: Vertex::INPUTS,
            bind_groups: &[],
            binding: 1,
        };

        assert_eq!(frame(&gpu, &mut d, &state, &prim), DrawOutcome::Recorded);
        d.set_bind_cache(false);
        assert!(d.cache().is_empty());
        assert_eq!(frame(&gpu, &mut d, &state, &prim), DrawOutcome::Direct);
        assert_eq!(frame(&gpu, &mut d, &state, &prim), DrawOutcome::Direct);
        assert!(d.cache().is_empty());
        assert_eq!(d.stats().direct, 1);
    }

    fn index_only(gpu: &Headless) -> Primitive {
        let buffer = gpu.device().create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("index only"),
            contents: bytemuck::cast_slice(&[0u16, 1, 2, 0]),
            usage: wgpu::BufferUsages::INDEX,
        });
        let index = IndexStream::new(buffer, IndexFormat::U16, 3);
        Primitive::new("index only", Topology::Triangles, Vec::new(), Some(index))
    }

    #[test]
    fn index_only_primitive_is_skipped_by_attribute_programs() {
        let Some(gpu) = test_gpu() else { return };
        let pipe = pipeline(&gpu, POSITIONS, Vertex::INPUTS);
        let prim = index_only(&gpu);
        let mut d = PrimitiveDrawer::default();
        let state = BindState {
            pipeline: &pipe,
            pipeline_key: key(0),
            vertex_inputs: Vertex::INPUTS,
            bind_groups: &[],
            binding: 1,
        };

        assert_eq!(
            frame(&gpu, &mut d, &state, &prim),
            DrawOutcome::Skipped(DrawSkip::MissingStream { slot: 0 })
        );
        assert!(d.cache().is_empty());
    }

    #[test]
    fn index_only_primitive_draws_with_procedural_program() {
        let Some(gpu) = test_gpu() else { return };
        let pipe = pipeline(&gpu, PROCEDURAL, &[]);
        let prim = index_only(&gpu);
        let mut d = PrimitiveDrawer::default();
        let state = BindState {
            pipeline: &pipe,
            pipeline_key: key(7),
            vertex_inputs: &[],
            bind_groups: &[],
            binding: 1,
        };

        assert_eq!(frame(&gpu, &mut d, &state, &prim), DrawOutcome::Recorded);
        assert_eq!(frame(&gpu, &mut d, &state, &prim), DrawOutcome::Replayed);
    }
}
