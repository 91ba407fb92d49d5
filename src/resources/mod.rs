//! Uploads host meshes and texture images into GPU-owned scene resources.

use wgpu::util::DeviceExt;

use crate::{
    context::{Context, Resource},
    data_structures::{
        mesh::{Mesh, MeshVertex},
        texture::{RowOrder, Texture, TextureImage, create_nearest_sampler},
    },
    error::{RasterError, RasterResult},
    pipelines::locations,
};

/// The vertex/index buffers, texture and bind group of one loaded scene.
#[derive(Debug)]
pub struct SceneResources {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_indices: u32,
    pub texture: Texture,
    pub sampler: wgpu::Sampler,
    pub bind_group: wgpu::BindGroup,
}

impl SceneResources {
    /// Reject input that is malformed or that the device could never hold,
    /// before any GPU work is done.
    pub fn check(ctx: &Context, mesh: &Mesh, image: &TextureImage) -> RasterResult<u32> {
        mesh.validate()?;
        image.validate()?;
        let num_indices = u32::try_from(mesh.trilist.len()).map_err(|_| {
            RasterError::invalid_argument(format!("{} triangles exceed the index range", mesh.n_tris))
        })?;
        check_limits(ctx, mesh, image)?;
        Ok(num_indices)
    }

    /// Check `mesh` and `image` and copy them into new GPU objects.
    ///
    /// Nothing is allocated when the check fails, so a previously uploaded
    /// scene stays usable.
    pub fn upload(
        ctx: &Context,
        texture_layout: &wgpu::BindGroupLayout,
        mesh: &Mesh,
        image: &TextureImage,
        row_order: RowOrder,
    ) -> RasterResult<Self> {
        let num_indices = Self::check(ctx, mesh, image)?;
        let vertices = mesh.vertices(row_order);

        let (scene, errors) = ctx.capture(|device| {
            let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Scene Vertex Buffer"),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
            let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Scene Index Buffer"),
                contents: bytemuck::cast_slice(mesh.trilist),
                usage: wgpu::BufferUsages::INDEX,
            });
            let texture = Texture::from_image(device, &ctx.queue, image, Some("Scene Texture"));
            let sampler = create_nearest_sampler(device);
            let bind_group = texture_bind_group(device, texture_layout, &texture, &sampler);
            Self {
                vertex_buffer,
                index_buffer,
                num_indices,
                texture,
                sampler,
                bind_group,
            }
        });
        if let Err(e) = errors.into_result(RasterError::ResourceExhausted) {
            scene.vertex_buffer.destroy();
            scene.index_buffer.destroy();
            scene.texture.destroy();
            return Err(e);
        }

        ctx.track(Resource::Buffer, 2);
        ctx.track(Resource::Texture, 1);
        log::debug!(
            "uploaded scene: {} points, {} triangles, {}x{} texture",
            mesh.n_points,
            mesh.n_tris,
            image.width,
            image.height
        );
        Ok(scene)
    }

    pub fn release(self, ctx: &Context) {
        self.vertex_buffer.destroy();
        self.index_buffer.destroy();
        self.texture.destroy();
        ctx.untrack(Resource::Buffer, 2);
        ctx.untrack(Resource::Texture, 1);
    }
}

/// Reject uploads the device could never hold before touching the GPU.
fn check_limits(ctx: &Context, mesh: &Mesh, image: &TextureImage) -> RasterResult<()> {
    let limits = ctx.device.limits();
    let max_dim = limits.max_texture_dimension_2d;
    if image.width > max_dim || image.height > max_dim {
        return Err(RasterError::resource_exhausted(format!(
            "a {}x{} texture exceeds the device limit of {}",
            image.width, image.height, max_dim
        )));
    }
    let vertex_bytes = (mesh.n_points as u64).saturating_mul(std::mem::size_of::<MeshVertex>() as u64);
    let index_bytes = std::mem::size_of_val(mesh.trilist) as u64;
    for (what, bytes) in [("vertex", vertex_bytes), ("index", index_bytes)] {
        if bytes > limits.max_buffer_size {
            return Err(RasterError::resource_exhausted(format!(
                "{} buffer of {} bytes exceeds the device limit of {}",
                what, bytes, limits.max_buffer_size
            )));
        }
    }
    Ok(())
}

fn texture_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    texture: &Texture,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: locations::TEXTURE,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            },
            wgpu::BindGroupEntry {
                binding: locations::SAMPLER,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
        label: Some("scene texture_bind_group"),
    })
}
