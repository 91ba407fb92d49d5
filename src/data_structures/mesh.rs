//! Host-side triangle meshes and their GPU vertex layout.

use crate::{
    data_structures::texture::RowOrder,
    error::{RasterError, RasterResult},
    pipelines::locations,
};

/// A borrowed textured triangle mesh with explicit element counts.
///
/// * `points` holds `3 * n_points` coordinates (x, y, z per vertex)
/// * `trilist` holds `3 * n_tris` vertex indices, each `< n_points`
/// * `tcoords` holds `2 * n_points` texture coordinates (u, v per vertex),
///   with `v = 0` at the bottom of the texture image
#[derive(Clone, Copy, Debug)]
pub struct Mesh<'a> {
    pub points: &'a [f64],
    pub n_points: usize,
    pub trilist: &'a [u32],
    pub n_tris: usize,
    pub tcoords: &'a [f32],
}

impl<'a> Mesh<'a> {
    /// Derive the counts from the slice lengths. Lengths that are not a
    /// multiple of the stride are still rejected by [`Mesh::validate`].
    pub fn new(points: &'a [f64], trilist: &'a [u32], tcoords: &'a [f32]) -> Self {
        Self {
            points,
            n_points: points.len() / 3,
            trilist,
            n_tris: trilist.len() / 3,
            tcoords,
        }
    }

    pub fn validate(&self) -> RasterResult<()> {
        if self.n_points == 0 {
            return Err(RasterError::invalid_argument("mesh has no points"));
        }
        if self.n_tris == 0 {
            return Err(RasterError::invalid_argument("mesh has no triangles"));
        }
        if self.points.len() != 3 * self.n_points {
            return Err(RasterError::invalid_argument(format!(
                "expected {} point coordinates for {} points, got {}",
                3 * self.n_points,
                self.n_points,
                self.points.len()
            )));
        }
        if self.trilist.len() != 3 * self.n_tris {
            return Err(RasterError::invalid_argument(format!(
                "expected {} indices for {} triangles, got {}",
                3 * self.n_tris,
                self.n_tris,
                self.trilist.len()
            )));
        }
        if self.tcoords.len() != 2 * self.n_points {
            return Err(RasterError::invalid_argument(format!(
                "expected {} texture coordinates for {} points, got {}",
                2 * self.n_points,
                self.n_points,
                self.tcoords.len()
            )));
        }
        if let Some((pos, index)) = self
            .trilist
            .iter()
            .enumerate()
            .find(|(_, i)| **i as usize >= self.n_points)
        {
            return Err(RasterError::invalid_argument(format!(
                "triangle {} references vertex {} but the mesh has {} points",
                pos / 3,
                index,
                self.n_points
            )));
        }
        Ok(())
    }

    /// Interleave positions and texture coordinates into GPU vertices.
    ///
    /// `row_order` is the order of the texture rows in memory; `v` is flipped
    /// when the first row is the top of the image since wgpu samples row 0 at
    /// `v = 0`.
    pub(crate) fn vertices(&self, row_order: RowOrder) -> Vec<MeshVertex> {
        self.points
            .chunks_exact(3)
            .zip(self.tcoords.chunks_exact(2))
            .map(|(p, t)| MeshVertex {
                position: [p[0] as f32, p[1] as f32, p[2] as f32],
                tex_coords: match row_order {
                    RowOrder::TopDown => [t[0], 1.0 - t[1]],
                    RowOrder::BottomUp => [t[0], t[1]],
                },
            })
            .collect()
    }
}

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl Vertex for MeshVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: locations::POSITION,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: locations::TEX_COORDS,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}
