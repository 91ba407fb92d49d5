//! Synchronous GPU→host transfer of the framebuffer's color attachment.
//!
//! Reading back is a blocking synchronisation point: the calling thread waits
//! until every command submitted so far has finished on the GPU. It is not
//! cheap and should not be called per frame at high frequency.

use std::iter;

use futures::executor::block_on;

use crate::{
    context::Context,
    data_structures::texture::{CHANNELS, RowOrder},
    error::{RasterError, RasterResult},
    framebuffer::FrameBuffer,
};

/// Rows copied out of a texture must start on a 256 byte boundary.
pub fn padded_bytes_per_row(width: u32) -> RasterResult<u32> {
    let unpadded = width
        .checked_mul(CHANNELS as u32)
        .ok_or_else(|| RasterError::invalid_argument("framebuffer width overflows a row"))?;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded
        .checked_add(align - 1)
        .map(|v| v / align * align)
        .ok_or_else(|| RasterError::invalid_argument("framebuffer width overflows a row"))
}

/// Copy the color attachment into host memory as tightly packed rows,
/// top row first, in the attachment's own channel order.
pub(crate) fn grab_framebuffer_data(ctx: &Context, fb: &FrameBuffer) -> RasterResult<Vec<u8>> {
    let (width, height) = fb.size();
    let ((), errors) = ctx.capture(|device| {
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback Encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &fb.color.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &fb.readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(fb.padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            fb.extent(),
        );
        ctx.queue.submit(iter::once(encoder.finish()));
    });
    errors.into_result(RasterError::TransferFailed)?;

    // The mapping has to be requested before polling, otherwise the wait
    // below never observes it.
    let buffer_slice = fb.readback.slice(..);
    let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    let mapped = ctx
        .device
        .poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: None,
        })
        .map_err(|e| RasterError::transfer_failed(format!("device poll failed: {e:?}")))
        .and_then(|_| await_mapping(&rx));
    if let Err(e) = mapped {
        // A map left pending would make the next readback fail validation.
        fb.readback.unmap();
        return Err(e);
    }

    let pixels = {
        let data = buffer_slice.get_mapped_range();
        unpad_rows(&data, fb.padded_bytes_per_row as usize, width, height)
    };
    fb.readback.unmap();
    Ok(pixels)
}

fn await_mapping(
    rx: &futures_intrusive::channel::shared::OneshotReceiver<Result<(), wgpu::BufferAsyncError>>,
) -> RasterResult<()> {
    block_on(rx.receive())
        .ok_or_else(|| RasterError::transfer_failed("readback channel closed"))?
        .map_err(|e| RasterError::transfer_failed(format!("readback map failed: {e:?}")))
}

pub(crate) fn unpad_rows(data: &[u8], padded_bytes_per_row: usize, width: u32, height: u32) -> Vec<u8> {
    let row_bytes = width as usize * CHANNELS;
    let mut out = Vec::with_capacity(row_bytes * height as usize);
    for row in data.chunks(padded_bytes_per_row).take(height as usize) {
        out.extend_from_slice(&row[..row_bytes]);
    }
    out
}

/// Bring tightly packed top-down pixels in `format` channel order into RGBA
/// with rows in `row_order`.
pub(crate) fn normalize(pixels: &mut [u8], width: u32, format: wgpu::TextureFormat, row_order: RowOrder) {
    if format == wgpu::TextureFormat::Bgra8Unorm {
        for px in pixels.chunks_exact_mut(CHANNELS) {
            px.swap(0, 2);
        }
    }
    if row_order == RowOrder::BottomUp {
        flip_rows(pixels, width as usize * CHANNELS);
    }
}

fn flip_rows(pixels: &mut [u8], row_bytes: usize) {
    let rows = pixels.len() / row_bytes;
    for top in 0..rows / 2 {
        let bottom = rows - 1 - top;
        let (upper, lower) = pixels.split_at_mut(bottom * row_bytes);
        upper[top * row_bytes..(top + 1) * row_bytes].swap_with_slice(&mut lower[..row_bytes]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_padded_to_copy_alignment() {
        assert_eq!(padded_bytes_per_row(4).unwrap(), 256);
        assert_eq!(padded_bytes_per_row(64).unwrap(), 256);
        assert_eq!(padded_bytes_per_row(65).unwrap(), 512);
        assert!(padded_bytes_per_row(u32::MAX).is_err());
    }

    #[test]
    fn dropped_map_callback_is_a_transfer_failure() {
        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel::<
            Result<(), wgpu::BufferAsyncError>,
        >();
        drop(tx);
        let err = await_mapping(&rx).unwrap_err();
        assert!(matches!(err, RasterError::TransferFailed(_)), "{err}");
    }

    #[test]
    fn completed_map_is_accepted() {
        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
        tx.send(Ok(())).unwrap();
        assert!(await_mapping(&rx).is_ok());
    }

    #[test]
    fn unpadding_drops_row_tails() {
        // two rows of one pixel, each padded to 8 bytes
        let data = [1, 2, 3, 4, 0, 0, 0, 0, 5, 6, 7, 8, 0, 0, 0, 0];
        assert_eq!(unpad_rows(&data, 8, 1, 2), vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn bgra_is_swizzled_to_rgba() {
        let mut px = vec![10, 20, 30, 40];
        normalize(&mut px, 1, wgpu::TextureFormat::Bgra8Unorm, RowOrder::TopDown);
        assert_eq!(px, vec![30, 20, 10, 40]);
    }

    #[test]
    fn rgba_top_down_is_untouched() {
        let mut px = vec![1, 2, 3, 4, 5, 6, 7, 8];
        normalize(&mut px, 1, wgpu::TextureFormat::Rgba8Unorm, RowOrder::TopDown);
        assert_eq!(px, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn bottom_up_reverses_rows() {
        let mut px: Vec<u8> = (0..12).collect();
        normalize(&mut px, 1, wgpu::TextureFormat::Rgba8Unorm, RowOrder::BottomUp);
        assert_eq!(px, vec![8, 9, 10, 11, 4, 5, 6, 7, 0, 1, 2, 3]);
    }
}
