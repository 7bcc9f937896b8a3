use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::primitive::{IndexFormat, Primitive, Topology, VertexInput};
use crate::shader::{ShaderError, ShaderId, ShaderInterface, ShaderProgram, ShaderRegistry};

use super::{FrameUniform, ObjectUniform, RenderCtx};

/// Everything a render pipeline is specialised on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub shader: ShaderId,
    pub topology: Topology,
    /// Only set for indexed strip topologies.
    pub strip_index: Option<IndexFormat>,
    pub color_format: wgpu::TextureFormat,
    pub depth_format: Option<wgpu::TextureFormat>,
}

impl PipelineKey {
    pub fn new(
        shader: ShaderId,
        topology: Topology,
        index_format: Option<IndexFormat>,
        color_format: wgpu::TextureFormat,
        depth_format: Option<wgpu::TextureFormat>,
    ) -> Self {
        Self {
            shader,
            topology,
            strip_index: index_format.filter(|_| topology.is_strip()),
            color_format,
            depth_format,
        }
    }

    /// Key for drawing `primitive` with `shader` into the targets of `ctx`.
    pub fn for_primitive(shader: ShaderId, primitive: &Primitive, ctx: &RenderCtx<'_>) -> Self {
        Self::new(
            shader,
            primitive.topology(),
            primitive.index_format(),
            ctx.color_format,
            ctx.depth_format,
        )
    }
}

/// Bind group layouts shared by every program: the frame uniform at group 0
/// and the object uniform at group 1, both at binding 0.
pub struct BindLayouts {
    pub frame: wgpu::BindGroupLayout,
    pub object: wgpu::BindGroupLayout,
    pub pipeline: wgpu::PipelineLayout,
}

impl BindLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let frame = uniform_layout(device, "lumen frame bgl", FrameUniform::SIZE);
        let object = uniform_layout(device, "lumen object bgl", ObjectUniform::SIZE);

        let pipeline = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("lumen pipeline layout"),
            bind_group_layouts: &[&frame, &object],
            immediate_size: 0,
        });

        Self {
            frame,
            object,
            pipeline,
        }
    }

    /// Checks that `interface` reads nothing the shared layout lacks.
    ///
    /// wgpu rejects such a pipeline with a device error, so programs are
    /// checked before one is built.
    pub fn check_interface(name: &str, interface: &ShaderInterface) -> Result<(), ShaderError> {
        let fail = |message: String| ShaderError::Interface {
            name: name.to_string(),
            message,
        };

        for b in &interface.bindings {
            let (what, size) = match (b.group, b.binding) {
                (0, 0) => ("frame", FrameUniform::SIZE),
                (1, 0) => ("object", ObjectUniform::SIZE),
                (group, binding) => {
                    return Err(fail(format!(
                        "@group({group}) @binding({binding}) is not provided; \
                         only the frame (0/0) and object (1/0) uniforms are"
                    )));
                }
            };
            if !b.uniform {
                return Err(fail(format!("the {what} binding must be var<uniform>")));
            }
            if b.size > size {
                return Err(fail(format!(
                    "the {what} binding reads {} bytes but the uniform holds {size}",
                    b.size
                )));
            }
        }
        Ok(())
    }
}

fn uniform_layout(device: &wgpu::Device, label: &str, size: u64) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(size),
            },
            count: None,
        }],
    })
}

/// Lazily built render pipelines, one per [`PipelineKey`].
pub struct PipelineCache {
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    cull_mode: Option<wgpu::Face>,
}

impl PipelineCache {
    pub fn new(cull_mode: Option<wgpu::Face>) -> Self {
        Self {
            pipelines: HashMap::new(),
            cull_mode,
        }
    }

    /// Returns the pipeline for `key`, building it on first use.
    pub fn get_or_create(
        &mut self,
        device: &wgpu::Device,
        registry: &ShaderRegistry,
        layouts: &BindLayouts,
        key: PipelineKey,
    ) -> Result<&wgpu::RenderPipeline, ShaderError> {
        match self.pipelines.entry(key) {
            Entry::Occupied(o) => Ok(o.into_mut()),
            Entry::Vacant(v) => {
                let program = registry
                    .get(key.shader)
                    .ok_or_else(|| ShaderError::Unknown(format!("#{}", key.shader.0)))?;
                BindLayouts::check_interface(program.name(), program.interface())?;
                log::debug!("creating pipeline for `{}`: {key:?}", program.name());
                let cull_mode = key.topology.is_triangles().then_some(self.cull_mode).flatten();
                Ok(v.insert(build_pipeline(device, layouts, program, &key, cull_mode)))
            }
        }
    }

    /// Pipeline already built for `key`, if any.
    pub fn get(&self, key: &PipelineKey) -> Option<&wgpu::RenderPipeline> {
        self.pipelines.get(key)
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    /// Drops every pipeline, e.g. after the surface format changed.
    pub fn clear(&mut self) {
        self.pipelines.clear();
    }
}

fn build_pipeline(
    device: &wgpu::Device,
    layouts: &BindLayouts,
    program: &ShaderProgram,
    key: &PipelineKey,
    cull_mode: Option<wgpu::Face>,
) -> wgpu::RenderPipeline {
    let label = format!("lumen {} pipeline", program.name());
    let buffers: Vec<wgpu::VertexBufferLayout<'static>> =
        program.vertex_inputs().iter().map(VertexInput::layout).collect();

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&label),
        layout: Some(&layouts.pipeline),

        vertex: wgpu::VertexState {
            module: program.module(),
            entry_point: Some(program.vertex_entry()),
            compilation_options: Default::default(),
            buffers: &buffers,
        },

        fragment: Some(wgpu::FragmentState {
            module: program.module(),
            entry_point: Some(program.fragment_entry()),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: key.color_format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),

        primitive: wgpu::PrimitiveState {
            topology: key.topology.to_wgpu(),
            strip_index_format: key.strip_index.map(IndexFormat::to_wgpu),
            front_face: wgpu::FrontFace::Ccw,
            cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },

        depth_stencil: key.depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),

        multiview_mask: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::ShaderSource;

    const COLOR: wgpu::TextureFormat = wgpu::TextureFormat::Bgra8UnormSrgb;
    const DEPTH: Option<wgpu::TextureFormat> = Some(wgpu::TextureFormat::Depth32Float);

    #[test]
    fn strip_index_only_kept_for_strips() {
        let list = PipelineKey::new(ShaderId(0), Topology::Triangles, Some(IndexFormat::U16), COLOR, DEPTH);
        assert_eq!(list.strip_index, None);

        let strip =
            PipelineKey::new(ShaderId(0), Topology::TriangleStrip, Some(IndexFormat::U32), COLOR, DEPTH);
        assert_eq!(strip.strip_index, Some(IndexFormat::U32));
    }

    #[test]
    fn non_indexed_strip_has_no_strip_format() {
        let k = PipelineKey::new(ShaderId(1), Topology::LineStrip, None, COLOR, None);
        assert_eq!(k.strip_index, None);
    }

    #[test]
    fn list_primitives_share_a_key_regardless_of_index_format() {
        let a = PipelineKey::new(ShaderId(2), Topology::Lines, Some(IndexFormat::U16), COLOR, DEPTH);
        let b = PipelineKey::new(ShaderId(2), Topology::Lines, None, COLOR, DEPTH);
        assert_eq!(a, b);
    }

    #[test]
    fn empty_cache() {
        let c = PipelineCache::new(Some(wgpu::Face::Back));
        assert!(c.is_empty());
    }

    // ── interface checks ──────────────────────────────────────────────────

    const EXTRA_GROUP: &str = r#"
        struct Tint { color: vec4<f32> }
        @group(2) @binding(0) var<uniform> tint: Tint;

        @vertex
        fn vs_main(@location(0) p: vec3<f32>) -> @builtin(position) vec4<f32> {
            return vec4<f32>(p, 1.0);
        }

        @fragment
        fn fs_main() -> @location(0) vec4<f32> {
            return tint.color;
        }
    "#;

    fn extra_group_program() -> ShaderSource {
        ShaderSource::new("tinted", EXTRA_GROUP)
    }

    #[test]
    fn builtins_fit_the_shared_layout() {
        for source in crate::shader::BUILTIN_SHADERS {
            let interface = source.validate().unwrap();
            BindLayouts::check_interface(&source.name, &interface).unwrap();
        }
    }

    #[test]
    fn binding_outside_the_layout_is_rejected() {
        let interface = extra_group_program().validate().unwrap();
        let err = BindLayouts::check_interface("tinted", &interface).unwrap_err();
        assert!(matches!(err, ShaderError::Interface { ref message, .. } if message.contains("@group(2)")));
    }

    #[test]
    fn oversized_uniform_is_rejected() {
        let interface = ShaderInterface {
            bindings: vec![crate::shader::ShaderBinding {
                group: 1,
                binding: 0,
                uniform: true,
                size: ObjectUniform::SIZE + 16,
            }],
            vertex_locations: vec![0],
        };
        assert!(BindLayouts::check_interface("big", &interface).is_err());
    }

    #[test]
    fn unfit_program_fails_pipeline_creation_without_building() {
        let Some(gpu) = crate::device::test_gpu() else { return };
        let ctx = gpu.render_ctx();
        let mut registry = ShaderRegistry::empty();
        let id = registry.register(ctx.device, extra_group_program()).unwrap();
        let layouts = BindLayouts::new(ctx.device);
        let mut cache = PipelineCache::new(None);

        let key = PipelineKey::new(id, Topology::Triangles, None, ctx.color_format, ctx.depth_format);
        let res = cache.get_or_create(ctx.device, &registry, &layouts, key);
        assert!(matches!(res, Err(ShaderError::Interface { .. })));
        assert!(cache.is_empty());
    }

    #[test]
    fn pipeline_follows_program_vertex_inputs() {
        let Some(gpu) = crate::device::test_gpu() else { return };
        let ctx = gpu.render_ctx();
        let src = r#"
            @vertex
            fn vs_main(@builtin(vertex_index) i: u32) -> @builtin(position) vec4<f32> {
                return vec4<f32>(f32(i) * 0.5, 0.0, 0.0, 1.0);
            }
            @fragment
            fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }
        "#;
        let source = ShaderSource::new("procedural", src).with_vertex_inputs(Vec::<VertexInput>::new());
        let mut registry = ShaderRegistry::empty();
        let id = registry.register(ctx.device, source).unwrap();
        let layouts = BindLayouts::new(ctx.device);
        let mut cache = PipelineCache::new(None);

        let key = PipelineKey::new(id, Topology::Triangles, None, ctx.color_format, ctx.depth_format);
        assert!(cache.get_or_create(ctx.device, &registry, &layouts, key).is_ok());
        assert_eq!(cache.len(), 1);
    }
}
