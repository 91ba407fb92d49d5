//! Texture images and GPU textures.
//!
//! This module provides [`TextureImage`], the host-side RGBA8 pixel buffer a
//! scene is textured with, and [`Texture`], a wrapper around the wgpu texture
//! and view that back it (and the framebuffer attachments).

use crate::error::{RasterError, RasterResult};

/// Bytes per pixel of every texture and readback buffer (RGBA8).
pub const CHANNELS: usize = 4;

/// Memory order of image rows, shared by texture uploads and pixel readback.
///
/// `TopDown` stores the top row of the image first (image-file order),
/// `BottomUp` stores the bottom row first (GL order). Reading back a frame
/// and uploading it as a texture with the same order reproduces the image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RowOrder {
    #[default]
    TopDown,
    BottomUp,
}

/// A borrowed RGBA8 image: `data.len() == width * height * CHANNELS`.
#[derive(Clone, Copy, Debug)]
pub struct TextureImage<'a> {
    pub data: &'a [u8],
    pub width: u32,
    pub height: u32,
}

impl<'a> TextureImage<'a> {
    pub fn new(data: &'a [u8], width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
        }
    }

    pub fn validate(&self) -> RasterResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(RasterError::invalid_argument(format!(
                "texture must not be empty ({}x{})",
                self.width, self.height
            )));
        }
        let expected = self.width as usize * self.height as usize * CHANNELS;
        if self.data.len() != expected {
            return Err(RasterError::invalid_argument(format!(
                "a {}x{} texture needs {} bytes, got {}",
                self.width,
                self.height,
                expected,
                self.data.len()
            )));
        }
        Ok(())
    }
}

/// A GPU texture and its default view.
#[derive(Clone, Debug)]
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl Texture {
    /// Standard depth buffer texture format (32-bit float).
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Format of scene textures. Linear so bytes are sampled back unchanged.
    pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    /// Create the depth attachment of an offscreen framebuffer.
    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let desc = wgpu::TextureDescriptor {
            label: Some(label),
            size: extent(size),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        };
        let texture = device.create_texture(&desc);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self { texture, view }
    }

    /// Create the color attachment of an offscreen framebuffer. It can be
    /// copied out both to a readback buffer and to a window texture.
    pub fn create_color_target(
        device: &wgpu::Device,
        size: [u32; 2],
        format: wgpu::TextureFormat,
        label: &str,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent(size),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self { texture, view }
    }

    /// Upload a validated [`TextureImage`] as it is laid out in memory.
    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        img: &TextureImage,
        label: Option<&str>,
    ) -> Self {
        let size = extent([img.width, img.height]);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::COLOR_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            img.data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(CHANNELS as u32 * img.width),
                rows_per_image: Some(img.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self { texture, view }
    }

    /// Release the GPU memory now rather than when the last handle drops.
    pub fn destroy(self) {
        self.texture.destroy();
    }
}

fn extent(size: [u32; 2]) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: size[0],
        height: size[1],
        depth_or_array_layers: 1,
    }
}

/// Texels are sampled without blending so solid colours survive exactly.
pub fn create_nearest_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("scene texture sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Nearest,
        min_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_exact_rgba_buffer() {
        let data = [255, 0, 0, 255].repeat(4);
        TextureImage::new(&data, 2, 2).validate().unwrap();
    }

    #[test]
    fn rejects_rgb_sized_buffer() {
        let data = [255, 0, 0].repeat(4);
        assert!(matches!(
            TextureImage::new(&data, 2, 2).validate(),
            Err(RasterError::InvalidArgument(_))
        ));
    }

    #[test]
    fn rejects_zero_dimensions() {
        assert!(matches!(
            TextureImage::new(&[], 0, 4).validate(),
            Err(RasterError::InvalidArgument(_))
        ));
    }
}
