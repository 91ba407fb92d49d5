//! Shader program construction.
//!
//! A [`Program`] is the linked vertex + fragment stage pair the scene is drawn
//! with, together with the uniform buffer that feeds its projection and
//! translation. Compilation and linking problems are captured from the device
//! and returned with the compiler's diagnostic text.

use std::collections::HashMap;

use wgpu::util::DeviceExt;

use crate::{
    camera::{Transform, TransformUniform},
    context::{Context, Resource},
    error::{RasterError, RasterResult},
};

pub mod textured;

/// Binding points shared by the WGSL source and the host-side layouts.
pub mod locations {
    pub const POSITION: u32 = 0;
    pub const TEX_COORDS: u32 = 1;

    pub const TEXTURE_GROUP: u32 = 0;
    pub const TEXTURE: u32 = 0;
    pub const SAMPLER: u32 = 1;

    pub const TRANSFORM_GROUP: u32 = 1;
    pub const TRANSFORM: u32 = 0;
}

/// Where a named shader input lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Location {
    Attribute(u32),
    Uniform { group: u32, binding: u32 },
}

#[derive(Debug)]
pub struct Program {
    pub pipeline: wgpu::RenderPipeline,
    pub transform_buffer: wgpu::Buffer,
    pub transform_bind_group: wgpu::BindGroup,
    locations: HashMap<&'static str, Location>,
}

impl Program {
    /// Compile and link the built-in textured-mesh shader.
    pub fn build(
        ctx: &Context,
        texture_layout: &wgpu::BindGroupLayout,
        color_format: wgpu::TextureFormat,
    ) -> RasterResult<Self> {
        Self::build_from_source(ctx, texture_layout, color_format, textured::SHADER_SOURCE)
    }

    /// Compile and link `source`, which must expose `vs_main`/`fs_main` and
    /// the bindings listed in [`locations`].
    pub fn build_from_source(
        ctx: &Context,
        texture_layout: &wgpu::BindGroupLayout,
        color_format: wgpu::TextureFormat,
        source: &str,
    ) -> RasterResult<Self> {
        let (shader, errors) =
            ctx.capture(|device| device.create_shader_module(textured::mk_shader_descriptor(source)));
        errors.into_result(RasterError::ShaderCompile)?;

        let transform_layout = transform_layout(&ctx.device);
        let (pipeline, errors) = ctx.capture(|device| {
            let layout = textured::mk_pipeline_layout(device, texture_layout, &transform_layout);
            textured::mk_render_pipeline(device, &layout, &shader, color_format)
        });
        errors.into_result(RasterError::ShaderLink)?;

        let (transform_buffer, errors) = ctx.capture(|device| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Transform Buffer"),
                contents: bytemuck::cast_slice(&[Transform::default().to_uniform()]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            })
        });
        errors.into_result(RasterError::ResourceExhausted)?;

        let transform_bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &transform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: locations::TRANSFORM,
                resource: transform_buffer.as_entire_binding(),
            }],
            label: Some("transform_bind_group"),
        });

        let locations = HashMap::from([
            ("position", Location::Attribute(locations::POSITION)),
            ("tex_coords", Location::Attribute(locations::TEX_COORDS)),
            (
                "transform",
                Location::Uniform {
                    group: locations::TRANSFORM_GROUP,
                    binding: locations::TRANSFORM,
                },
            ),
            (
                "t_diffuse",
                Location::Uniform {
                    group: locations::TEXTURE_GROUP,
                    binding: locations::TEXTURE,
                },
            ),
            (
                "s_diffuse",
                Location::Uniform {
                    group: locations::TEXTURE_GROUP,
                    binding: locations::SAMPLER,
                },
            ),
        ]);
        ctx.track(Resource::Program, 1);
        ctx.track(Resource::Buffer, 1);
        log::debug!("linked textured mesh program for {:?}", color_format);

        Ok(Self {
            pipeline,
            transform_buffer,
            transform_bind_group,
            locations,
        })
    }

    pub fn location(&self, name: &str) -> Option<Location> {
        self.locations.get(name).copied()
    }

    pub fn attribute_location(&self, name: &str) -> Option<u32> {
        match self.location(name)? {
            Location::Attribute(location) => Some(location),
            Location::Uniform { .. } => None,
        }
    }

    pub fn uniform_location(&self, name: &str) -> Option<(u32, u32)> {
        match self.location(name)? {
            Location::Uniform { group, binding } => Some((group, binding)),
            Location::Attribute(_) => None,
        }
    }

    pub fn write_transform(&self, queue: &wgpu::Queue, uniform: &TransformUniform) {
        queue.write_buffer(&self.transform_buffer, 0, bytemuck::cast_slice(&[*uniform]));
    }

    pub fn release(self, ctx: &Context) {
        self.transform_buffer.destroy();
        ctx.untrack(Resource::Buffer, 1);
        ctx.untrack(Resource::Program, 1);
    }
}

fn transform_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: locations::TRANSFORM,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("transform_bind_group_layout"),
    })
}

/// Layout of the scene texture group; shared by uploads and the program.
pub fn texture_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: locations::TEXTURE,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: locations::SAMPLER,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("scene texture_bind_group_layout"),
    })
}
