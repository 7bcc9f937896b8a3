use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Context as _;
use glam::Mat4;
use wgpu::util::DeviceExt;

use crate::color::Color;
use crate::primitive::{BindState, DrawStats, DrawerConfig, Primitive, PrimitiveDrawer, PrimitiveId};
use crate::shader::{ShaderError, ShaderId, ShaderRegistry, ShaderSource};

use super::{
    BindLayouts, Camera, DirectionalLight, FrameUniform, ObjectUniform, PipelineCache, PipelineKey,
    RenderCtx, RenderTarget,
};

/// Renderer configuration.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Color + depth are cleared when set, otherwise the pass loads them.
    pub clear_color: Option<Color>,
    /// Face culling for triangle topologies; `None` draws both sides.
    pub cull_mode: Option<wgpu::Face>,
    pub light: DirectionalLight,
    pub drawer: DrawerConfig,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            clear_color: Some(Color::from_srgb_u8(24, 26, 32, 255)),
            cull_mode: Some(wgpu::Face::Back),
            light: DirectionalLight::default(),
            drawer: DrawerConfig::default(),
        }
    }
}

static NEXT_OBJECT: AtomicU64 = AtomicU64::new(1);

/// Per-object uniform state (transform + material color).
///
/// The uniform is written once per `render` call, so an object appears at a
/// single transform per frame. Draw the same primitive through several
/// objects to place it more than once.
pub struct RenderObject {
    pub transform: Mat4,
    pub color: Color,

    id: u64,
    ubo: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl RenderObject {
    fn new(device: &wgpu::Device, layouts: &BindLayouts) -> Self {
        let initial = ObjectUniform::default();
        let ubo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("lumen object ubo"),
            contents: bytemuck::bytes_of(&initial),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lumen object bg"),
            layout: &layouts.object,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: ubo.as_entire_binding(),
            }],
        });

        Self {
            transform: Mat4::IDENTITY,
            color: Color::WHITE,
            id: NEXT_OBJECT.fetch_add(1, Ordering::Relaxed),
            ubo,
            bind_group,
        }
    }

    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    fn upload(&self, queue: &wgpu::Queue) {
        let data = ObjectUniform::new(self.transform, self.color);
        queue.write_buffer(&self.ubo, 0, bytemuck::bytes_of(&data));
    }
}

/// One primitive drawn with one object's uniforms and one shader.
#[derive(Copy, Clone)]
pub struct DrawItem<'a> {
    pub primitive: &'a Primitive,
    pub object: &'a RenderObject,
    pub shader: ShaderId,
}

impl<'a> DrawItem<'a> {
    pub fn new(primitive: &'a Primitive, object: &'a RenderObject, shader: ShaderId) -> Self {
        Self {
            primitive,
            object,
            shader,
        }
    }
}

/// Forward renderer drawing [`DrawItem`]s with the built-in shader programs.
///
/// Owns the shader registry, pipelines and the primitive draw adapter.
pub struct Renderer {
    config: RendererConfig,

    registry: ShaderRegistry,
    layouts: BindLayouts,
    pipelines: PipelineCache,
    drawer: PrimitiveDrawer,

    frame_ubo: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,

    // Target formats of the last frame; pipelines are built for them.
    formats: Option<(wgpu::TextureFormat, Option<wgpu::TextureFormat>)>,

    // Shaders already reported as unusable.
    warned: HashSet<ShaderId>,
}

impl Renderer {
    pub fn new(ctx: &RenderCtx<'_>, config: RendererConfig) -> anyhow::Result<Self> {
        let device = ctx.device;

        let registry = ShaderRegistry::new(device).context("failed to compile built-in shaders")?;
        for program in registry.iter() {
            BindLayouts::check_interface(program.name(), program.interface())
                .context("built-in shader does not fit the pipeline layout")?;
        }
        let layouts = BindLayouts::new(device);

        let frame_ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lumen frame ubo"),
            size: FrameUniform::SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lumen frame bg"),
            layout: &layouts.frame,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_ubo.as_entire_binding(),
            }],
        });

        log::debug!(
            "renderer ready: color={:?} depth={:?} bind_cache={}",
            ctx.color_format,
            ctx.depth_format,
            config.drawer.bind_cache
        );

        Ok(Self {
            pipelines: PipelineCache::new(config.cull_mode),
            drawer: PrimitiveDrawer::new(config.drawer.clone()),
            config,
            registry,
            layouts,
            frame_ubo,
            frame_bind_group,
            formats: None,
            warned: HashSet::new(),
        })
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn registry(&self) -> &ShaderRegistry {
        &self.registry
    }

    /// Id of the program registered as `name`.
    pub fn shader(&self, name: &str) -> Result<ShaderId, ShaderError> {
        self.registry.program(name).map(|p| p.id())
    }

    /// Compiles and registers an additional program.
    ///
    /// The program may only bind the frame and object uniforms. Nothing is
    /// registered on failure.
    pub fn register_shader(
        &mut self,
        ctx: &RenderCtx<'_>,
        source: ShaderSource,
    ) -> Result<ShaderId, ShaderError> {
        let interface = source.validate()?;
        BindLayouts::check_interface(&source.name, &interface)?;
        self.registry.register(ctx.device, source)
    }

    pub fn set_light(&mut self, light: DirectionalLight) {
        self.config.light = light;
    }

    pub fn set_clear_color(&mut self, color: Option<Color>) {
        self.config.clear_color = color;
    }

    /// Switches bundle caching on or off; cached bundles are dropped either way.
    pub fn set_bind_cache(&mut self, enabled: bool) {
        if self.config.drawer.bind_cache == enabled {
            return;
        }
        self.config.drawer.bind_cache = enabled;
        self.drawer.set_bind_cache(enabled);
        log::info!("bind cache {}", if enabled { "enabled" } else { "disabled" });
    }

    pub fn create_object(&self, ctx: &RenderCtx<'_>) -> RenderObject {
        RenderObject::new(ctx.device, &self.layouts)
    }

    /// Counters of the last rendered frame.
    pub fn stats(&self) -> DrawStats {
        self.drawer.stats()
    }

    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    pub fn cached_bundles(&self) -> usize {
        self.drawer.cache().len()
    }

    /// Releases cached draw state of a primitive about to be dropped.
    pub fn forget(&mut self, id: PrimitiveId) {
        self.drawer.forget(id);
    }

    /// Drops pipelines and bundles built for other target formats.
    fn retarget(&mut self, color: wgpu::TextureFormat, depth: Option<wgpu::TextureFormat>) {
        let formats = Some((color, depth));
        if self.formats == formats {
            return;
        }
        if self.formats.is_some() {
            log::debug!("target formats changed to {color:?} / {depth:?}, dropping pipelines");
            self.pipelines.clear();
            self.drawer.clear_cache();
        }
        self.formats = formats;
    }

    /// Draws `items` in order, clearing the target first unless
    /// `clear_color` is `None`.
    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        camera: &Camera,
        items: &[DrawItem<'_>],
    ) {
        self.drawer.begin_frame();

        let frame = FrameUniform::new(camera, &self.config.light, ctx.viewport.aspect());
        ctx.queue.write_buffer(&self.frame_ubo, 0, bytemuck::bytes_of(&frame));

        // Depth testing needs both a format and an attachment.
        let depth_format = target.depth_view.and(ctx.depth_format);
        self.retarget(ctx.color_format, depth_format);

        let keys: Vec<Option<PipelineKey>> = items
            .iter()
            .map(|item| {
                item.object.upload(ctx.queue);
                self.resolve(ctx, depth_format, item)
            })
            .collect();

        let (color_load, depth_load) = match self.config.clear_color {
            Some(c) => (wgpu::LoadOp::Clear(c.to_wgpu()), wgpu::LoadOp::Clear(1.0)),
            None => (wgpu::LoadOp::Load, wgpu::LoadOp::Load),
        };

        let mut pass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("lumen main pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: color_load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: depth_format.and(target.depth_view).map(|view| {
                wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: depth_load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        for (item, key) in items.iter().zip(keys) {
            let Some(key) = key else { continue };
            let (Some(pipeline), Some(program)) =
                (self.pipelines.get(&key), self.registry.get(key.shader))
            else {
                continue;
            };

            let bind_groups = [&self.frame_bind_group, &item.object.bind_group];
            let state = BindState {
                pipeline,
                pipeline_key: key,
                vertex_inputs: program.vertex_inputs(),
                bind_groups: &bind_groups,
                binding: item.object.id,
            };

            self.drawer.draw(ctx.device, &mut pass, &state, item.primitive);
        }
    }

    /// Builds (or finds) the pipeline for `item`; `None` when its shader is unusable.
    fn resolve(
        &mut self,
        ctx: &RenderCtx<'_>,
        depth_format: Option<wgpu::TextureFormat>,
        item: &DrawItem<'_>,
    ) -> Option<PipelineKey> {
        let key = PipelineKey::new(
            item.shader,
            item.primitive.topology(),
            item.primitive.index_format(),
            ctx.color_format,
            depth_format,
        );

        match self
            .pipelines
            .get_or_create(ctx.device, &self.registry, &self.layouts, key)
        {
            Ok(_) => Some(key),
            Err(e) => {
                if self.warned.insert(item.shader) {
                    log::warn!("skipping draws with shader #{}: {e}", item.shader.0);
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::device::{test_gpu, Headless};
    use crate::mesh::MeshData;
    use crate::shader::{BUILTIN_SHADERS, LAMBERT, UNLIT};

    #[test]
    fn default_config_culls_back_faces_and_caches_binds() {
        let c = RendererConfig::default();
        assert_eq!(c.cull_mode, Some(wgpu::Face::Back));
        assert!(c.drawer.bind_cache);
        assert!(c.clear_color.is_some_and(|c| c.a == 1.0));
    }

    // ── on a device ───────────────────────────────────────────────────────

    fn camera() -> Camera {
        Camera::look_at(Vec3::new(0.0, 1.0, 3.0), Vec3::ZERO)
    }

    fn frame(gpu: &Headless, renderer: &mut Renderer, items: &[DrawItem<'_>]) -> DrawStats {
        gpu.render(|ctx, target| renderer.render(ctx, target, &camera(), items));
        renderer.stats()
    }

    #[test]
    fn binding_outside_the_layout_is_refused_at_registration() {
        let Some(gpu) = test_gpu() else { return };
        let ctx = gpu.render_ctx();
        let mut renderer = Renderer::new(&ctx, RendererConfig::default()).unwrap();
        let before = renderer.registry().len();

        let src = r#"
            struct Tint { color: vec4<f32> }
            @group(2) @binding(0) var<uniform> tint: Tint;
            @vertex
            fn vs_main(@location(0) p: vec3<f32>) -> @builtin(position) vec4<f32> {
                return vec4<f32>(p, 1.0);
            }
            @fragment
            fn fs_main() -> @location(0) vec4<f32> { return tint.color; }
        "#;
        let err = renderer
            .register_shader(&ctx, ShaderSource::new("tinted", src))
            .unwrap_err();
        assert!(matches!(err, ShaderError::Interface { .. }));
        assert_eq!(renderer.registry().len(), before);
        assert!(!renderer.registry().contains("tinted"));
    }

    #[test]
    fn second_frame_replays_cached_bundles() {
        let Some(gpu) = test_gpu() else { return };
        let ctx = gpu.render_ctx();
        let mut renderer = Renderer::new(&ctx, RendererConfig::default()).unwrap();
        assert_eq!(renderer.shader(BUILTIN_SHADERS[0].name.as_ref()).unwrap(), ShaderId(0));

        let cube = MeshData::cube(0.5).upload(ctx.device, "cube");
        let a = renderer.create_object(&ctx);
        let b = renderer.create_object(&ctx);
        let lambert = renderer.shader(LAMBERT).unwrap();
        let items = [DrawItem::new(&cube, &a, lambert), DrawItem::new(&cube, &b, lambert)];

        let first = frame(&gpu, &mut renderer, &items);
        assert_eq!((first.recorded, first.replayed), (2, 0));
        let second = frame(&gpu, &mut renderer, &items);
        assert_eq!((second.recorded, second.replayed), (0, 2));
        assert_eq!(renderer.cached_bundles(), 2);
        assert_eq!(renderer.pipeline_count(), 1);

        renderer.set_bind_cache(false);
        let direct = frame(&gpu, &mut renderer, &items);
        assert_eq!(direct.direct, 2);
        assert_eq!(renderer.cached_bundles(), 0);
    }

    #[test]
    fn undrawable_primitive_is_skipped() {
        let Some(gpu) = test_gpu() else { return };
        let ctx = gpu.render_ctx();
        let mut renderer = Renderer::new(&ctx, RendererConfig::default()).unwrap();

        let empty = MeshData::new(crate::primitive::Topology::Triangles, Vec::new(), None)
            .upload(ctx.device, "empty");
        let object = renderer.create_object(&ctx);
        let unlit = renderer.shader(UNLIT).unwrap();

        let stats = frame(&gpu, &mut renderer, &[DrawItem::new(&empty, &object, unlit)]);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.total(), 0);
    }

    #[test]
    fn changed_target_formats_drop_old_pipelines() {
        let Some(gpu) = test_gpu() else { return };
        let ctx = gpu.render_ctx();
        let mut renderer = Renderer::new(&ctx, RendererConfig::default()).unwrap();
        let cube = MeshData::cube(0.5).upload(ctx.device, "cube");
        let object = renderer.create_object(&ctx);
        let items = [DrawItem::new(&cube, &object, renderer.shader(UNLIT).unwrap())];

        frame(&gpu, &mut renderer, &items);
        assert_eq!(renderer.pipeline_count(), 1);

        // Same color target, no depth attachment.
        gpu.render(|ctx, target| {
            let mut color_only = RenderTarget::new(&mut *target.encoder, target.color_view, None);
            renderer.render(ctx, &mut color_only, &camera(), &items);
        });
        assert_eq!(renderer.pipeline_count(), 1);
        assert_eq!(renderer.stats().recorded, 1);
        assert_eq!(renderer.cached_bundles(), 1);
    }
}
