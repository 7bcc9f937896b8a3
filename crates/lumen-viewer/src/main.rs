use anyhow::Result;
use glam::{Mat4, Quat, Vec3};
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use lumen_engine::color::Color;
use lumen_engine::core::{App, AppControl, FrameCtx};
use lumen_engine::device::GpuInit;
use lumen_engine::logging::{init_logging, LoggingConfig};
use lumen_engine::mesh::MeshData;
use lumen_engine::primitive::Primitive;
use lumen_engine::render::{Camera, DrawItem, RenderCtx, RenderObject, Renderer, RendererConfig};
use lumen_engine::shader::{ShaderId, BUILTIN_SHADERS, LAMBERT, VERTEX_COLOR};
use lumen_engine::window::{Runtime, RuntimeConfig};

/// Seconds each built-in shader stays on screen before cycling.
const SHADER_PERIOD: f32 = 4.0;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = RuntimeConfig {
        title: "lumen viewer".to_string(),
        ..Default::default()
    };

    Runtime::run(config, GpuInit::default(), Viewer::default())
}

/// GPU side of the viewer, created on the first frame.
struct Scene {
    renderer: Renderer,
    cube: Primitive,
    grid: Primitive,
    axes: Primitive,
    cubes: Vec<RenderObject>,
    floor: RenderObject,
    gizmo: RenderObject,
    vertex_color: ShaderId,
}

impl Scene {
    fn new(ctx: &RenderCtx<'_>) -> Result<Self> {
        let renderer = Renderer::new(ctx, RendererConfig::default())?;

        let cube = MeshData::cube(0.5).upload(ctx.device, "cube");
        let grid = MeshData::grid(5.0, 10, Color::rgb(0.3, 0.3, 0.35)).upload(ctx.device, "grid");
        let axes = MeshData::axes(1.5).upload(ctx.device, "axes");

        let palette = [
            Color::from_srgb_u8(230, 120, 80, 255),
            Color::from_srgb_u8(110, 190, 120, 255),
            Color::from_srgb_u8(90, 140, 230, 255),
        ];
        let cubes = palette
            .iter()
            .enumerate()
            .map(|(i, &color)| {
                let x = (i as f32 - 1.0) * 1.6;
                renderer
                    .create_object(ctx)
                    .with_transform(Mat4::from_translation(Vec3::new(x, 0.5, 0.0)))
                    .with_color(color)
            })
            .collect();

        Ok(Self {
            floor: renderer.create_object(ctx),
            gizmo: renderer.create_object(ctx),
            vertex_color: renderer.shader(VERTEX_COLOR)?,
            renderer,
            cube,
            grid,
            axes,
            cubes,
        })
    }

    fn animate(&mut self, t: f32) {
        for (i, object) in self.cubes.iter_mut().enumerate() {
            let x = (i as f32 - 1.0) * 1.6;
            let spin = Quat::from_rotation_y(t * (0.6 + 0.3 * i as f32));
            object.transform = Mat4::from_rotation_translation(spin, Vec3::new(x, 0.5, 0.0));
        }
    }
}

struct Viewer {
    scene: Option<Scene>,
    shader_index: usize,
    manual_shader: bool,
    bind_cache: bool,
    last_report: u64,
}

impl Default for Viewer {
    fn default() -> Self {
        Self {
            scene: None,
            shader_index: BUILTIN_SHADERS
                .iter()
                .position(|s| s.name == LAMBERT)
                .unwrap_or(0),
            manual_shader: false,
            bind_cache: true,
            last_report: 0,
        }
    }
}

impl Viewer {
    fn on_key(&mut self, code: KeyCode) -> AppControl {
        match code {
            KeyCode::Escape => return AppControl::Exit,
            KeyCode::Space => {
                self.manual_shader = true;
                self.shader_index = (self.shader_index + 1) % BUILTIN_SHADERS.len();
                log::info!("shader: {}", BUILTIN_SHADERS[self.shader_index].name);
            }
            KeyCode::KeyC => {
                self.bind_cache = !self.bind_cache;
                if let Some(scene) = &mut self.scene {
                    scene.renderer.set_bind_cache(self.bind_cache);
                }
            }
            _ => {}
        }
        AppControl::Continue
    }
}

impl App for Viewer {
    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => self.on_key(*code),
            _ => AppControl::Continue,
        }
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if self.scene.is_none() {
            match Scene::new(&ctx.render_ctx()) {
                Ok(scene) => self.scene = Some(scene),
                Err(e) => {
                    log::error!("failed to set up scene: {e:#}");
                    return AppControl::Exit;
                }
            }
        }
        let Some(scene) = self.scene.as_mut() else {
            return AppControl::Exit;
        };

        let t = ctx.time.elapsed;
        if !self.manual_shader {
            self.shader_index = (t / SHADER_PERIOD) as usize % BUILTIN_SHADERS.len();
        }
        let Some(shader) = scene.renderer.registry().id(&BUILTIN_SHADERS[self.shader_index].name)
        else {
            return AppControl::Continue;
        };

        scene.animate(t);
        let camera = Camera::orbit(Vec3::new(0.0, 0.5, 0.0), 6.0, 3.0, t * 0.25);

        let Scene {
            renderer,
            cube,
            grid,
            axes,
            cubes,
            floor,
            gizmo,
            vertex_color,
        } = scene;

        let mut items: Vec<DrawItem<'_>> = cubes
            .iter()
            .map(|object| DrawItem::new(cube, object, shader))
            .collect();
        items.push(DrawItem::new(grid, floor, *vertex_color));
        items.push(DrawItem::new(axes, gizmo, *vertex_color));

        let control = ctx.render(None, |rctx, target| {
            renderer.render(rctx, target, &camera, &items);
        });

        // Stats every five seconds.
        let bucket = t as u64 / 5;
        if bucket != self.last_report {
            self.last_report = bucket;
            let stats = renderer.stats();
            log::info!(
                "frame {}: {} draws ({} direct, {} recorded, {} replayed, {} skipped), {} pipelines, {} bundles",
                ctx.time.frame_index,
                stats.total(),
                stats.direct,
                stats.recorded,
                stats.replayed,
                stats.skipped,
                renderer.pipeline_count(),
                renderer.cached_bundles(),
            );
        }

        control
    }
}
