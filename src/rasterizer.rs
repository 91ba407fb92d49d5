//! The owning rasterizer object and its lifecycle.
//!
//! A [`Rasterizer`] exclusively owns every GPU object it renders with. Callers
//! only see it through the operations below, which follow the sequence
//!
//! ```text
//! Uninitialized --init--> Ready --display--> Rendered --cleanup--> Cleaned --init--> Ready
//! ```
//!
//! with `init_scene` allowed before or after `init`, and `resize` and
//! `return_fb_pixels` allowed whenever a framebuffer exists.

use crate::{
    camera::{Projection, Transform},
    context::{Context, ResourceCounters},
    data_structures::{
        mesh::Mesh,
        texture::{CHANNELS, RowOrder, TextureImage},
    },
    error::{RasterError, RasterResult},
    framebuffer::FrameBuffer,
    pipelines::{self, Program},
    readback, render,
    resources::SceneResources,
};

#[derive(Clone, Debug)]
pub struct RasterizerConfig {
    /// Output resolution of the offscreen framebuffer.
    pub width: u32,
    pub height: u32,
    pub clear_colour: wgpu::Color,
    /// One of [`crate::framebuffer::SUPPORTED_COLOR_FORMATS`].
    pub color_format: wgpu::TextureFormat,
    /// Row order of texture uploads and readbacks.
    pub row_order: RowOrder,
}

impl Default for RasterizerConfig {
    fn default() -> Self {
        Self {
            width: 768,
            height: 768,
            clear_colour: wgpu::Color::BLACK,
            color_format: wgpu::TextureFormat::Rgba8Unorm,
            row_order: RowOrder::TopDown,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Lifecycle {
    #[default]
    Uninitialized,
    /// Program and framebuffer exist.
    Ready,
    /// The framebuffer holds a frame of the current scene.
    Rendered,
    /// Everything was released; only `init` is valid.
    Cleaned,
}

impl Lifecycle {
    pub fn has_targets(self) -> bool {
        matches!(self, Lifecycle::Ready | Lifecycle::Rendered)
    }

    fn invalidate_frame(self) -> Self {
        match self {
            Lifecycle::Rendered => Lifecycle::Ready,
            other => other,
        }
    }

    fn after_cleanup(self) -> Self {
        match self {
            Lifecycle::Uninitialized => Lifecycle::Uninitialized,
            _ => Lifecycle::Cleaned,
        }
    }
}

#[derive(Debug)]
pub struct Rasterizer {
    ctx: Context,
    config: RasterizerConfig,
    transform: Transform,
    texture_layout: wgpu::BindGroupLayout,
    program: Option<Program>,
    frame_buffer: Option<FrameBuffer>,
    scene: Option<SceneResources>,
    lifecycle: Lifecycle,
}

impl Rasterizer {
    /// Wrap an existing context. Fails if its adapter cannot render into
    /// and read back from `config.color_format`.
    pub fn new(ctx: Context, config: RasterizerConfig) -> RasterResult<Self> {
        ctx.ensure_render_target_support(config.color_format)?;
        let texture_layout = pipelines::texture_layout(&ctx.device);
        Ok(Self {
            ctx,
            config,
            transform: Transform::default(),
            texture_layout,
            program: None,
            frame_buffer: None,
            scene: None,
            lifecycle: Lifecycle::Uninitialized,
        })
    }

    /// A rasterizer on its own windowless context.
    pub fn headless(config: RasterizerConfig) -> RasterResult<Self> {
        Self::new(Context::headless()?, config)
    }

    /// Build the shader program, then the framebuffer.
    ///
    /// Calling this again replaces both without leaking the previous ones.
    pub fn init(&mut self) -> RasterResult<()> {
        self.init_program_and_shaders()?;
        self.init_frame_buffer()?;
        self.lifecycle = Lifecycle::Ready;
        log::debug!("rasterizer ready");
        Ok(())
    }

    /// Replace the program. A failed build leaves no program behind.
    pub fn init_program_and_shaders(&mut self) -> RasterResult<()> {
        if let Some(old) = self.program.take() {
            old.release(&self.ctx);
        }
        let program = Program::build(&self.ctx, &self.texture_layout, self.config.color_format)?;
        self.program = Some(program);
        Ok(())
    }

    /// Replace the framebuffer with one of the configured output size.
    ///
    /// The old framebuffer is only released once the new one exists.
    pub fn init_frame_buffer(&mut self) -> RasterResult<()> {
        self.replace_frame_buffer(self.config.width, self.config.height)
    }

    fn replace_frame_buffer(&mut self, width: u32, height: u32) -> RasterResult<()> {
        let fb = FrameBuffer::new(&self.ctx, width, height, self.config.color_format)?;
        if let Some(old) = self.frame_buffer.replace(fb) {
            old.release(&self.ctx);
        }
        Ok(())
    }

    /// Load the scene to render, replacing any previous one.
    ///
    /// Invalid or oversized input is rejected before anything is released,
    /// so the previously loaded scene stays intact.
    pub fn init_scene(&mut self, mesh: &Mesh, texture: &TextureImage) -> RasterResult<()> {
        if self.lifecycle == Lifecycle::Cleaned {
            return Err(RasterError::not_initialized(
                "the rasterizer was cleaned up; call init() first",
            ));
        }
        SceneResources::check(&self.ctx, mesh, texture)?;

        if let Some(old) = self.scene.take() {
            old.release(&self.ctx);
        }
        let scene = SceneResources::upload(
            &self.ctx,
            &self.texture_layout,
            mesh,
            texture,
            self.config.row_order,
        )?;
        self.scene = Some(scene);
        self.lifecycle = self.lifecycle.invalidate_frame();
        Ok(())
    }

    /// Render the loaded scene into the framebuffer.
    ///
    /// Safe to call repeatedly: every call clears and redraws from scratch.
    pub fn display(&mut self) -> RasterResult<()> {
        let (program, fb) = self.targets()?;
        let scene = self
            .scene
            .as_ref()
            .ok_or_else(|| RasterError::not_initialized("no scene loaded; call init_scene() first"))?;

        program.write_transform(&self.ctx.queue, &self.transform.to_uniform());
        render::draw(&self.ctx, program, fb, scene.into(), self.config.clear_colour)?;
        self.lifecycle = Lifecycle::Rendered;
        Ok(())
    }

    /// Copy the framebuffer into `pixels` as RGBA8 rows in the configured
    /// [`RowOrder`].
    ///
    /// This blocks until the GPU has finished all submitted work. `width` and
    /// `height` must match the current framebuffer size and `pixels` must
    /// hold at least `width * height * 4` bytes.
    pub fn return_fb_pixels(&mut self, pixels: &mut [u8], width: u32, height: u32) -> RasterResult<()> {
        let fb = self.frame_buffer()?;
        if fb.size() != (width, height) {
            return Err(RasterError::invalid_argument(format!(
                "requested {}x{} pixels but the framebuffer is {}x{}",
                width,
                height,
                fb.size().0,
                fb.size().1
            )));
        }
        let needed = width as usize * height as usize * CHANNELS;
        if pixels.len() < needed {
            return Err(RasterError::invalid_argument(format!(
                "pixel buffer holds {} bytes, {} are needed",
                pixels.len(),
                needed
            )));
        }

        let data = self.grab_framebuffer_data()?;
        pixels[..needed].copy_from_slice(&data);
        Ok(())
    }

    /// The framebuffer as an image, with the same conventions as
    /// [`Rasterizer::return_fb_pixels`].
    pub fn grab_image(&mut self) -> RasterResult<image::RgbaImage> {
        let (width, height) = self.frame_buffer()?.size();
        let data = self.grab_framebuffer_data()?;
        image::RgbaImage::from_raw(width, height, data)
            .ok_or_else(|| RasterError::transfer_failed("readback size does not match the framebuffer"))
    }

    fn grab_framebuffer_data(&self) -> RasterResult<Vec<u8>> {
        let fb = self.frame_buffer()?;
        let mut data = readback::grab_framebuffer_data(&self.ctx, fb)?;
        readback::normalize(&mut data, fb.size().0, fb.format(), self.config.row_order);
        Ok(data)
    }

    /// Handle a viewport resize: the framebuffer is reallocated at once so a
    /// stale-sized attachment is never rendered to or read from.
    ///
    /// On failure the previous framebuffer and size are kept, so the call can
    /// be retried.
    pub fn resize(&mut self, width: u32, height: u32) -> RasterResult<()> {
        if width == 0 || height == 0 {
            return Err(RasterError::invalid_argument(format!(
                "cannot resize to {}x{}",
                width, height
            )));
        }
        match self.frame_buffer_size() {
            Some(size) if size == (width, height) => return Ok(()),
            Some(_) => {
                self.replace_frame_buffer(width, height)?;
                self.lifecycle = self.lifecycle.invalidate_frame();
            }
            None => {}
        }
        self.config.width = width;
        self.config.height = height;
        log::debug!("resized output to {}x{}", width, height);
        Ok(())
    }

    /// Copy the last rendered frame into a window texture. Returns whether
    /// anything was copied.
    pub fn present(&mut self, target: &wgpu::Texture) -> RasterResult<bool> {
        if self.lifecycle != Lifecycle::Rendered {
            return Err(RasterError::not_initialized("nothing has been rendered yet"));
        }
        let fb = self.frame_buffer()?;
        Ok(render::present(&self.ctx, fb, target))
    }

    /// Release the framebuffer, the program and the scene, in that order.
    /// Calling it again is a no-op.
    pub fn cleanup(&mut self) {
        if let Some(fb) = self.frame_buffer.take() {
            fb.release(&self.ctx);
        }
        if let Some(program) = self.program.take() {
            program.release(&self.ctx);
        }
        if let Some(scene) = self.scene.take() {
            scene.release(&self.ctx);
        }
        self.lifecycle = self.lifecycle.after_cleanup();
        log::debug!("rasterizer cleaned up");
    }

    pub fn set_projection(&mut self, projection: Projection) {
        self.transform.projection = projection;
    }

    pub fn set_translation(&mut self, translation: cgmath::Vector3<f32>) {
        self.transform.translation = translation;
    }

    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    pub fn set_clear_colour(&mut self, colour: wgpu::Color) {
        self.config.clear_colour = colour;
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn config(&self) -> &RasterizerConfig {
        &self.config
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn program(&self) -> Option<&Program> {
        self.program.as_ref()
    }

    pub fn has_scene(&self) -> bool {
        self.scene.is_some()
    }

    pub fn frame_buffer_size(&self) -> Option<(u32, u32)> {
        self.frame_buffer.as_ref().map(FrameBuffer::size)
    }

    pub fn live_resources(&self) -> ResourceCounters {
        self.ctx.live_resources()
    }

    fn frame_buffer(&self) -> RasterResult<&FrameBuffer> {
        self.frame_buffer
            .as_ref()
            .ok_or_else(|| RasterError::not_initialized("no framebuffer; call init() first"))
    }

    fn targets(&self) -> RasterResult<(&Program, &FrameBuffer)> {
        if !self.lifecycle.has_targets() {
            return Err(RasterError::not_initialized(format!(
                "cannot render in state {:?}; call init() first",
                self.lifecycle
            )));
        }
        let program = self
            .program
            .as_ref()
            .ok_or_else(|| RasterError::not_initialized("no shader program"))?;
        Ok((program, self.frame_buffer()?))
    }
}

impl Drop for Rasterizer {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_ready_states_have_targets() {
        assert!(!Lifecycle::Uninitialized.has_targets());
        assert!(Lifecycle::Ready.has_targets());
        assert!(Lifecycle::Rendered.has_targets());
        assert!(!Lifecycle::Cleaned.has_targets());
    }

    #[test]
    fn new_targets_invalidate_a_rendered_frame() {
        assert_eq!(Lifecycle::Rendered.invalidate_frame(), Lifecycle::Ready);
        assert_eq!(Lifecycle::Ready.invalidate_frame(), Lifecycle::Ready);
        assert_eq!(
            Lifecycle::Uninitialized.invalidate_frame(),
            Lifecycle::Uninitialized
        );
    }

    #[test]
    fn cleanup_is_idempotent() {
        let once = Lifecycle::Rendered.after_cleanup();
        assert_eq!(once, Lifecycle::Cleaned);
        assert_eq!(once.after_cleanup(), Lifecycle::Cleaned);
        assert_eq!(
            Lifecycle::Uninitialized.after_cleanup(),
            Lifecycle::Uninitialized
        );
    }

    #[test]
    fn default_config_matches_the_viewer_window() {
        let config = RasterizerConfig::default();
        assert_eq!((config.width, config.height), (768, 768));
        assert_eq!(config.color_format, wgpu::TextureFormat::Rgba8Unorm);
        assert_eq!(config.row_order, RowOrder::TopDown);
    }
}
