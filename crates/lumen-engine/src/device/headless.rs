use anyhow::Result;

use crate::render::{RenderCtx, RenderTarget, Viewport};

use super::adapter::{self, DeviceRequest};
use super::DepthBuffer;

/// Device plus an offscreen color (and optional depth) target.
///
/// Renders without a window, e.g. for thumbnails or tests.
pub struct Headless {
    device: wgpu::Device,
    queue: wgpu::Queue,
    color: wgpu::Texture,
    color_view: wgpu::TextureView,
    depth: Option<DepthBuffer>,
}

impl Headless {
    pub async fn new(
        viewport: Viewport,
        color_format: wgpu::TextureFormat,
        depth_format: Option<wgpu::TextureFormat>,
    ) -> Result<Self> {
        anyhow::ensure!(!viewport.is_empty(), "offscreen target has zero size");

        let instance = adapter::instance();
        let (_, device, queue) = adapter::open_device(
            &instance,
            None,
            DeviceRequest {
                label: "lumen headless device",
                power_preference: wgpu::PowerPreference::default(),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
            },
        )
        .await?;

        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("lumen offscreen color"),
            size: wgpu::Extent3d {
                width: viewport.width,
                height: viewport.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: color_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());
        let depth = depth_format.map(|f| DepthBuffer::new(&device, f, viewport.width, viewport.height));

        Ok(Self {
            device,
            queue,
            color,
            color_view,
            depth,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn color_texture(&self) -> &wgpu::Texture {
        &self.color
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.color.width(), self.color.height())
    }

    pub fn render_ctx(&self) -> RenderCtx<'_> {
        RenderCtx::new(
            &self.device,
            &self.queue,
            self.color.format(),
            self.depth.as_ref().map(DepthBuffer::format),
            self.viewport(),
        )
    }

    /// Records `draw` into a fresh encoder targeting the offscreen textures
    /// and submits it.
    pub fn render<F>(&self, draw: F)
    where
        F: FnOnce(&RenderCtx<'_>, &mut RenderTarget<'_>),
    {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("lumen offscreen encoder"),
            });

        let ctx = self.render_ctx();
        {
            let mut target = RenderTarget::new(
                &mut encoder,
                &self.color_view,
                self.depth.as_ref().map(DepthBuffer::view),
            );
            draw(&ctx, &mut target);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
    }
}

/// Small offscreen context for tests; `None` (with a note on stderr) when the
/// machine has no usable adapter.
#[cfg(test)]
pub(crate) fn test_gpu() -> Option<Headless> {
    let gpu = pollster::block_on(Headless::new(
        Viewport::new(32, 32),
        wgpu::TextureFormat::Rgba8UnormSrgb,
        Some(wgpu::TextureFormat::Depth32Float),
    ));
    match gpu {
        Ok(gpu) => Some(gpu),
        Err(e) => {
            eprintln!("no GPU available, skipping: {e:#}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sized_target_is_rejected() {
        let res = pollster::block_on(Headless::new(
            Viewport::new(0, 16),
            wgpu::TextureFormat::Rgba8Unorm,
            None,
        ));
        assert!(res.is_err());
    }

    #[test]
    fn render_ctx_reports_offscreen_formats() {
        let Some(gpu) = test_gpu() else { return };
        let ctx = gpu.render_ctx();
        assert_eq!(ctx.color_format, wgpu::TextureFormat::Rgba8UnormSrgb);
        assert_eq!(ctx.depth_format, Some(wgpu::TextureFormat::Depth32Float));
        assert_eq!(ctx.viewport, Viewport::new(32, 32));
    }
}
