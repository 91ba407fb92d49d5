//! Optional on-screen viewer around a [`Rasterizer`].
//!
//! The rasterizer itself never owns a window or an event loop. This module
//! plays the windowing collaborator: it opens a winit window, creates a
//! context that can present to it and forwards events as plain calls.
//!
//! # Event dispatch
//!
//! - `Resized` reconfigures the surface and calls [`Rasterizer::resize`]
//! - `RedrawRequested` calls [`Rasterizer::display`] and copies the frame to the window
//! - `CloseRequested` calls [`Rasterizer::cleanup`] and leaves the event loop;
//!   [`run`] then returns to the caller instead of ending the process
//!
//! Handlers run to completion one event at a time.

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    dpi::{PhysicalPosition, PhysicalSize},
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowId},
};

use crate::{
    context::Context,
    error::RasterResult,
    framebuffer::SUPPORTED_COLOR_FORMATS,
    rasterizer::{Rasterizer, RasterizerConfig},
};

#[derive(Clone, Debug)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub x: i32,
    pub y: i32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Generic Viewer".to_string(),
            width: 768,
            height: 768,
            x: 100,
            y: 100,
        }
    }
}

/// Called once the context exists and before `init()`: load the scene and
/// set the transform here.
pub type SceneSetup = Box<dyn FnOnce(&mut Rasterizer) -> RasterResult<()>>;

struct ViewerState {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    rasterizer: Rasterizer,
}

impl ViewerState {
    fn resize(&mut self, width: u32, height: u32) -> RasterResult<()> {
        if width == 0 || height == 0 {
            log::warn!("ignoring resize to {}x{}", width, height);
            return Ok(());
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface
            .configure(&self.rasterizer.context().device, &self.surface_config);
        self.rasterizer.resize(width, height)?;
        self.window.request_redraw();
        Ok(())
    }

    fn redraw(&mut self) -> RasterResult<()> {
        self.rasterizer.display()?;
        match self.surface.get_current_texture() {
            wgpu::CurrentSurfaceTexture::Success(frame)
            | wgpu::CurrentSurfaceTexture::Suboptimal(frame) => {
                self.rasterizer.present(&frame.texture)?;
                frame.present();
            }
            e => {
                log::warn!("could not acquire window texture: {:?}", e);
                self.surface
                    .configure(&self.rasterizer.context().device, &self.surface_config);
            }
        }
        Ok(())
    }
}

pub struct Viewer {
    window_config: WindowConfig,
    raster_config: RasterizerConfig,
    setup: Option<SceneSetup>,
    state: Option<ViewerState>,
    error: Option<anyhow::Error>,
}

impl Viewer {
    pub fn new(window_config: WindowConfig, raster_config: RasterizerConfig, setup: SceneSetup) -> Self {
        Self {
            window_config,
            raster_config,
            setup: Some(setup),
            state: None,
            error: None,
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<ViewerState> {
        let cfg = &self.window_config;
        let attributes = Window::default_attributes()
            .with_title(cfg.title.clone())
            .with_inner_size(PhysicalSize::new(cfg.width, cfg.height))
            .with_position(PhysicalPosition::new(cfg.x, cfg.y));
        let window = Arc::new(event_loop.create_window(attributes)?);

        let (ctx, surface) = Context::with_window(window.clone())?;
        let caps = surface.get_capabilities(&ctx.adapter);
        let format = pick_surface_format(&caps.formats, self.raster_config.color_format)
            .ok_or_else(|| {
                anyhow::anyhow!("window offers none of {:?}", SUPPORTED_COLOR_FORMATS)
            })?;
        if !caps.usages.contains(wgpu::TextureUsages::COPY_DST) {
            log::warn!("window surface is not a copy destination; frames will not be shown");
        }

        let size = window.inner_size();
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | (caps.usages & wgpu::TextureUsages::COPY_DST),
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: caps.present_modes[0],
            alpha_mode: caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&ctx.device, &surface_config);

        let config = RasterizerConfig {
            width: surface_config.width,
            height: surface_config.height,
            color_format: format.remove_srgb_suffix(),
            ..self.raster_config.clone()
        };
        let mut rasterizer = Rasterizer::new(ctx, config)?;
        if let Some(setup) = self.setup.take() {
            setup(&mut rasterizer)?;
        }
        rasterizer.init()?;
        window.request_redraw();

        Ok(ViewerState {
            window,
            surface,
            surface_config,
            rasterizer,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("viewer stopped: {}", error);
        if let Some(state) = self.state.as_mut() {
            state.rasterizer.cleanup();
        }
        self.error = Some(error);
        event_loop.exit();
    }
}

impl ApplicationHandler for Viewer {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        match self.start(event_loop) {
            Ok(state) => self.state = Some(state),
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _: WindowId, event: WindowEvent) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        let result = match event {
            WindowEvent::CloseRequested => {
                state.rasterizer.cleanup();
                event_loop.exit();
                Ok(())
            }
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::RedrawRequested => state.redraw(),
            _ => Ok(()),
        };
        if let Err(e) = result {
            self.fail(event_loop, e.into());
        }
    }
}

/// Prefer a surface format whose linear form is `preferred`, else any other
/// format the pixel reader supports.
fn pick_surface_format(
    formats: &[wgpu::TextureFormat],
    preferred: wgpu::TextureFormat,
) -> Option<wgpu::TextureFormat> {
    formats
        .iter()
        .copied()
        .find(|f| f.remove_srgb_suffix() == preferred)
        .or_else(|| {
            formats
                .iter()
                .copied()
                .find(|f| SUPPORTED_COLOR_FORMATS.contains(&f.remove_srgb_suffix()))
        })
}

/// Open a window, render the scene `setup` loads and keep it on screen until
/// the window is closed.
pub fn run(
    window_config: WindowConfig,
    raster_config: RasterizerConfig,
    setup: impl FnOnce(&mut Rasterizer) -> RasterResult<()> + 'static,
) -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    };

    let event_loop = EventLoop::new()?;
    let mut viewer = Viewer::new(window_config, raster_config, Box::new(setup));
    event_loop.run_app(&mut viewer)?;

    match viewer.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use wgpu::TextureFormat;

    use super::*;

    #[test]
    fn prefers_the_configured_format() {
        let formats = [TextureFormat::Bgra8UnormSrgb, TextureFormat::Rgba8UnormSrgb];
        assert_eq!(
            pick_surface_format(&formats, TextureFormat::Rgba8Unorm),
            Some(TextureFormat::Rgba8UnormSrgb)
        );
    }

    #[test]
    fn falls_back_to_any_readable_format() {
        let formats = [TextureFormat::Rgb10a2Unorm, TextureFormat::Bgra8Unorm];
        assert_eq!(
            pick_surface_format(&formats, TextureFormat::Rgba8Unorm),
            Some(TextureFormat::Bgra8Unorm)
        );
        assert_eq!(
            pick_surface_format(&[TextureFormat::Rgba16Float], TextureFormat::Rgba8Unorm),
            None
        );
    }

    #[test]
    fn window_defaults() {
        let config = WindowConfig::default();
        assert_eq!(config.title, "Generic Viewer");
        assert_eq!((config.width, config.height), (768, 768));
        assert_eq!((config.x, config.y), (100, 100));
    }
}
