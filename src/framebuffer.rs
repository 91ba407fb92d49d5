//! Offscreen render targets.
//!
//! A [`FrameBuffer`] is a color attachment, a depth attachment and the
//! staging buffer the color attachment is read back through, all sized to
//! the requested output resolution rather than to any window.

use crate::{
    context::{Context, Resource},
    data_structures::texture::Texture,
    error::{RasterError, RasterResult},
    readback,
};

/// Color formats the pixel reader knows how to normalise to RGBA.
pub const SUPPORTED_COLOR_FORMATS: [wgpu::TextureFormat; 2] = [
    wgpu::TextureFormat::Rgba8Unorm,
    wgpu::TextureFormat::Bgra8Unorm,
];

#[derive(Debug)]
pub struct FrameBuffer {
    pub color: Texture,
    pub depth: Texture,
    pub(crate) readback: wgpu::Buffer,
    pub(crate) padded_bytes_per_row: u32,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
}

impl FrameBuffer {
    pub fn new(
        ctx: &Context,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> RasterResult<Self> {
        if width == 0 || height == 0 {
            return Err(RasterError::invalid_argument(format!(
                "framebuffer must not be empty ({}x{})",
                width, height
            )));
        }
        if !SUPPORTED_COLOR_FORMATS.contains(&format) {
            return Err(RasterError::incomplete_framebuffer(format!(
                "{:?} is not a supported color attachment format",
                format
            )));
        }
        let features = ctx.adapter.get_texture_format_features(format);
        if !features
            .allowed_usages
            .contains(wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC)
        {
            return Err(RasterError::incomplete_framebuffer(format!(
                "{:?} cannot be rendered to and copied from on this adapter",
                format
            )));
        }

        let limits = ctx.device.limits();
        if width > limits.max_texture_dimension_2d || height > limits.max_texture_dimension_2d {
            return Err(RasterError::resource_exhausted(format!(
                "a {}x{} framebuffer exceeds the device limit of {}",
                width, height, limits.max_texture_dimension_2d
            )));
        }
        let padded_bytes_per_row = readback::padded_bytes_per_row(width)?;
        let readback_size = padded_bytes_per_row as u64 * height as u64;
        if readback_size > limits.max_buffer_size {
            return Err(RasterError::resource_exhausted(format!(
                "a readback buffer of {} bytes exceeds the device limit of {}",
                readback_size, limits.max_buffer_size
            )));
        }

        let ((color, depth, readback), errors) = ctx.capture(|device| {
            let color = Texture::create_color_target(
                device,
                [width, height],
                format,
                "framebuffer color attachment",
            );
            let depth =
                Texture::create_depth_texture(device, [width, height], "framebuffer depth attachment");
            let readback = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("framebuffer readback"),
                size: readback_size,
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                mapped_at_creation: false,
            });
            (color, depth, readback)
        });
        if let Err(e) = errors.into_result(RasterError::IncompleteFramebuffer) {
            color.destroy();
            depth.destroy();
            readback.destroy();
            return Err(e);
        }

        ctx.track(Resource::Framebuffer, 1);
        ctx.track(Resource::Texture, 2);
        ctx.track(Resource::Buffer, 1);
        log::debug!("allocated {}x{} {:?} framebuffer", width, height, format);

        Ok(Self {
            color,
            depth,
            readback,
            padded_bytes_per_row,
            width,
            height,
            format,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub fn extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        }
    }

    pub fn release(self, ctx: &Context) {
        self.color.destroy();
        self.depth.destroy();
        self.readback.destroy();
        ctx.untrack(Resource::Buffer, 1);
        ctx.untrack(Resource::Texture, 2);
        ctx.untrack(Resource::Framebuffer, 1);
    }
}
