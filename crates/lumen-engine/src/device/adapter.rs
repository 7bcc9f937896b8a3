use anyhow::{Context, Result};

/// What to ask the adapter for when opening a device.
pub(super) struct DeviceRequest<'a> {
    pub label: &'a str,
    pub power_preference: wgpu::PowerPreference,
    pub required_features: wgpu::Features,
    pub required_limits: wgpu::Limits,
}

/// Picks an adapter (able to present to `surface` when given) and opens a
/// device on it.
pub(super) async fn open_device(
    instance: &wgpu::Instance,
    surface: Option<&wgpu::Surface<'_>>,
    request: DeviceRequest<'_>,
) -> Result<(wgpu::Adapter, wgpu::Device, wgpu::Queue)> {
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: request.power_preference,
            compatible_surface: surface,
            force_fallback_adapter: false,
        })
        .await
        .context("failed to find a suitable GPU adapter")?;

    let info = adapter.get_info();
    log::info!("adapter: {} ({:?}, {:?})", info.name, info.backend, info.device_type);

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some(request.label),
            required_features: request.required_features,
            required_limits: request.required_limits,
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        })
        .await
        .context("failed to create wgpu device/queue")?;

    Ok((adapter, device, queue))
}

pub(super) fn instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    })
}
