use std::{cell::Cell, sync::Arc};

use futures::executor::block_on;
use winit::window::Window;

use crate::{
    data_structures::texture::Texture,
    error::{RasterError, RasterResult},
};

/// The GPU handles every rasterizer operation runs against.
///
/// A `Context` must exist before `Rasterizer::init` is called. It plays the
/// part of the "current rendering context": all command issuance happens on
/// the thread that owns it.
#[derive(Debug)]
pub struct Context {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    live: Cell<ResourceCounters>,
}

/// Live GPU objects allocated through a [`Context`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResourceCounters {
    pub buffers: usize,
    pub textures: usize,
    pub programs: usize,
    pub framebuffers: usize,
}

impl ResourceCounters {
    fn slot(&mut self, kind: Resource) -> &mut usize {
        match kind {
            Resource::Buffer => &mut self.buffers,
            Resource::Texture => &mut self.textures,
            Resource::Program => &mut self.programs,
            Resource::Framebuffer => &mut self.framebuffers,
        }
    }

    pub fn total(&self) -> usize {
        self.buffers + self.textures + self.programs + self.framebuffers
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) enum Resource {
    Buffer,
    Texture,
    Program,
    Framebuffer,
}

/// GPU errors raised while a [`Context::capture`] closure ran.
#[derive(Debug, Default)]
pub(crate) struct CapturedErrors {
    pub(crate) out_of_memory: Option<wgpu::Error>,
    pub(crate) validation: Option<wgpu::Error>,
}

impl CapturedErrors {
    /// Out-of-memory always maps to `ResourceExhausted`; validation errors
    /// are mapped by `on_validation` since their meaning depends on the call.
    pub(crate) fn into_result(
        self,
        on_validation: impl FnOnce(String) -> RasterError,
    ) -> RasterResult<()> {
        if let Some(e) = self.out_of_memory {
            log::error!("GPU out of memory: {}", e);
            return Err(RasterError::resource_exhausted(e.to_string()));
        }
        if let Some(e) = self.validation {
            log::error!("GPU validation error: {}", e);
            return Err(on_validation(e.to_string()));
        }
        Ok(())
    }
}

pub fn default_instance() -> wgpu::Instance {
    wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: wgpu::Backends::PRIMARY,
        ..wgpu::InstanceDescriptor::new_without_display_handle()
    })
}

impl Context {
    pub async fn new(
        instance: wgpu::Instance,
        compatible_surface: Option<&wgpu::Surface<'_>>,
    ) -> RasterResult<Self> {
        log::debug!("requesting adapter");
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| RasterError::context_unavailable(format!("no adapter: {e}")))?;

        let info = adapter.get_info();
        log::info!(
            "Using {:?} adapter \"{}\" ({} {})",
            info.backend,
            info.name,
            info.driver,
            info.driver_info
        );

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("mesh-raster device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
                ..Default::default()
            })
            .await
            .map_err(|e| RasterError::context_unavailable(format!("no device: {e}")))?;

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            live: Cell::new(ResourceCounters::default()),
        })
    }

    /// Blocking constructor for offscreen use without any window.
    pub fn headless() -> RasterResult<Self> {
        block_on(Self::new(default_instance(), None))
    }

    /// Create a context whose adapter can present to `window`.
    pub fn with_window(window: Arc<Window>) -> RasterResult<(Self, wgpu::Surface<'static>)> {
        let instance = default_instance();
        let surface = instance
            .create_surface(window)
            .map_err(|e| RasterError::context_unavailable(format!("no surface: {e}")))?;
        let ctx = block_on(Self::new(instance, Some(&surface)))?;
        Ok((ctx, surface))
    }

    /// Fails unless the adapter can render into and copy out of `color_format`
    /// and depth-test with [`Texture::DEPTH_FORMAT`].
    pub fn ensure_render_target_support(&self, color_format: wgpu::TextureFormat) -> RasterResult<()> {
        let color = self.adapter.get_texture_format_features(color_format);
        let needed = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC;
        if !color.allowed_usages.contains(needed) {
            return Err(RasterError::context_unavailable(format!(
                "{:?} cannot be used as a readable render target (allowed: {:?})",
                color_format, color.allowed_usages
            )));
        }
        let depth = self.adapter.get_texture_format_features(Texture::DEPTH_FORMAT);
        if !depth
            .allowed_usages
            .contains(wgpu::TextureUsages::RENDER_ATTACHMENT)
        {
            return Err(RasterError::context_unavailable(format!(
                "{:?} cannot be used as a depth attachment",
                Texture::DEPTH_FORMAT
            )));
        }
        Ok(())
    }

    pub fn live_resources(&self) -> ResourceCounters {
        self.live.get()
    }

    pub(crate) fn track(&self, kind: Resource, n: usize) {
        let mut live = self.live.get();
        *live.slot(kind) += n;
        self.live.set(live);
    }

    pub(crate) fn untrack(&self, kind: Resource, n: usize) {
        let mut live = self.live.get();
        let slot = live.slot(kind);
        debug_assert!(*slot >= n, "released more {:?}s than were allocated", kind);
        *slot = slot.saturating_sub(n);
        self.live.set(live);
    }

    /// Run `f` inside out-of-memory and validation error scopes.
    pub(crate) fn capture<T>(&self, f: impl FnOnce(&wgpu::Device) -> T) -> (T, CapturedErrors) {
        let out_of_memory_scope = self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let validation_scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f(&self.device);
        // Scopes pop in reverse push order.
        let validation = block_on(validation_scope.pop());
        let out_of_memory = block_on(out_of_memory_scope.pop());
        (
            value,
            CapturedErrors {
                out_of_memory,
                validation,
            },
        )
    }
}
