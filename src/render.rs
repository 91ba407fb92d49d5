//! Draw submission into the offscreen framebuffer.
//!
//! Each call is a pure re-render of what it is given: the target is cleared,
//! the program bound and the whole index range drawn once. Nothing carries
//! over between frames.

use std::iter;

use crate::{
    context::Context,
    error::{RasterError, RasterResult},
    framebuffer::FrameBuffer,
    pipelines::{Program, locations},
    resources::SceneResources,
};

/// Indexed geometry with its texture bind group, ready to be drawn.
pub struct Flat<'a> {
    pub vertex: &'a wgpu::Buffer,
    pub index: &'a wgpu::Buffer,
    pub group: &'a wgpu::BindGroup,
    pub amount: u32,
}

impl<'a> From<&'a SceneResources> for Flat<'a> {
    fn from(scene: &'a SceneResources) -> Self {
        Flat {
            vertex: &scene.vertex_buffer,
            index: &scene.index_buffer,
            group: &scene.bind_group,
            amount: scene.num_indices,
        }
    }
}

/// Clear `fb` to `clear_colour` and depth 1.0, then draw `flat` with `program`.
pub(crate) fn draw(
    ctx: &Context,
    program: &Program,
    fb: &FrameBuffer,
    flat: Flat<'_>,
    clear_colour: wgpu::Color,
) -> RasterResult<()> {
    let ((), errors) = ctx.capture(|device| {
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &fb.color.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &fb.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                ..Default::default()
            });

            render_pass.set_pipeline(&program.pipeline);
            render_pass.set_bind_group(locations::TEXTURE_GROUP, flat.group, &[]);
            render_pass.set_bind_group(
                locations::TRANSFORM_GROUP,
                &program.transform_bind_group,
                &[],
            );
            render_pass.set_vertex_buffer(0, flat.vertex.slice(..));
            render_pass.set_index_buffer(flat.index.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..flat.amount, 0, 0..1);
        }
        ctx.queue.submit(iter::once(encoder.finish()));
    });
    errors.into_result(RasterError::IncompleteFramebuffer)
}

/// Copy the rendered color attachment into a window texture.
///
/// Returns `false` without copying when size or format differ; presenting
/// is best effort and never fails the render path.
pub(crate) fn present(ctx: &Context, fb: &FrameBuffer, target: &wgpu::Texture) -> bool {
    let (width, height) = fb.size();
    if target.width() != width || target.height() != height {
        log::warn!(
            "skipping present: window texture is {}x{}, framebuffer is {}x{}",
            target.width(),
            target.height(),
            width,
            height
        );
        return false;
    }
    if target.format().remove_srgb_suffix() != fb.format() {
        log::warn!(
            "skipping present: window format {:?} does not match {:?}",
            target.format(),
            fb.format()
        );
        return false;
    }
    if !target.usage().contains(wgpu::TextureUsages::COPY_DST) {
        log::warn!("skipping present: window texture is not a copy destination");
        return false;
    }

    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Present Encoder"),
        });
    encoder.copy_texture_to_texture(
        wgpu::TexelCopyTextureInfo {
            aspect: wgpu::TextureAspect::All,
            texture: &fb.color.texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
        },
        wgpu::TexelCopyTextureInfo {
            aspect: wgpu::TextureAspect::All,
            texture: target,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
        },
        fb.extent(),
    );
    ctx.queue.submit(iter::once(encoder.finish()));
    true
}
