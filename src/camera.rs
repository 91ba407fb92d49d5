//! Projection and translation applied to mesh positions.
//!
//! Matrices are expressed in the GL clip convention (z in -1..1) and moved
//! into wgpu's 0..1 depth range by [`OPENGL_TO_WGPU_MATRIX`] when uploaded.

use cgmath::SquareMatrix;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// The projection half of a [`Transform`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Projection {
    /// Positions are already in clip space.
    Identity,
    Orthographic {
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    },
    /// Symmetric frustum described by a scale on x/y rather than a field of view.
    Perspective {
        frustum_scale: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
    /// Uniform x/y scale with x corrected for a `width`/`height` viewport.
    AspectCorrected { scale: f32, width: u32, height: u32 },
    Matrix(cgmath::Matrix4<f32>),
}

impl Default for Projection {
    fn default() -> Self {
        Projection::Identity
    }
}

impl Projection {
    /// Frustum scale 1.0 with planes at 0.5 and 10.0.
    pub fn default_perspective() -> Self {
        Projection::Perspective {
            frustum_scale: 1.0,
            aspect: 1.0,
            near: 0.5,
            far: 10.0,
        }
    }

    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        match *self {
            Projection::Identity => cgmath::Matrix4::identity(),
            Projection::Orthographic {
                left,
                right,
                bottom,
                top,
                near,
                far,
            } => cgmath::ortho(left, right, bottom, top, near, far),
            Projection::Perspective {
                frustum_scale,
                aspect,
                near,
                far,
            } => {
                #[rustfmt::skip]
                let m = cgmath::Matrix4::new(
                    frustum_scale / aspect, 0.0, 0.0, 0.0,
                    0.0, frustum_scale, 0.0, 0.0,
                    0.0, 0.0, (far + near) / (near - far), -1.0,
                    0.0, 0.0, (2.0 * far * near) / (near - far), 0.0,
                );
                m
            }
            Projection::AspectCorrected {
                scale,
                width,
                height,
            } => {
                let aspect = width.max(1) as f32 / height.max(1) as f32;
                cgmath::Matrix4::from_nonuniform_scale(scale / aspect, scale, 1.0)
            }
            Projection::Matrix(m) => m,
        }
    }
}

/// Projection plus a translation added to every position before projecting.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub projection: Projection,
    pub translation: cgmath::Vector3<f32>,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            projection: Projection::Identity,
            translation: cgmath::Vector3::new(0.0, 0.0, 0.0),
        }
    }
}

impl Transform {
    /// The default perspective, with the mesh pushed two units into the screen.
    pub fn perspective() -> Self {
        Self {
            projection: Projection::default_perspective(),
            translation: cgmath::Vector3::new(0.0, 0.0, -2.0),
        }
    }

    pub fn to_uniform(&self) -> TransformUniform {
        TransformUniform {
            projection: (OPENGL_TO_WGPU_MATRIX * self.projection.to_matrix()).into(),
            translation: self.translation.extend(0.0).into(),
        }
    }
}

/// Host mirror of the shader's `Transform` uniform block.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TransformUniform {
    pub projection: [[f32; 4]; 4],
    pub translation: [f32; 4],
}

#[cfg(test)]
mod tests {
    use cgmath::{Matrix4, Vector3, Vector4};

    use super::*;

    fn clip(transform: &Transform, p: [f32; 3]) -> Vector4<f32> {
        let u = transform.to_uniform();
        let m: Matrix4<f32> = u.projection.into();
        let t = Vector3::new(u.translation[0], u.translation[1], u.translation[2]);
        m * (Vector3::from(p) + t).extend(1.0)
    }

    #[test]
    fn identity_keeps_xy_and_maps_depth_into_unit_range() {
        let c = clip(&Transform::default(), [0.5, -0.25, 0.0]);
        assert_eq!((c.x, c.y, c.w), (0.5, -0.25, 1.0));
        assert!((c.z - 0.5).abs() < 1e-6);
    }

    #[test]
    fn translation_is_applied_before_projection() {
        let t = Transform {
            projection: Projection::Identity,
            translation: Vector3::new(1.0, 2.0, 0.0),
        };
        let c = clip(&t, [0.0, 0.0, 0.0]);
        assert_eq!((c.x, c.y), (1.0, 2.0));
    }

    #[test]
    fn perspective_puts_the_origin_between_the_planes() {
        let c = clip(&Transform::perspective(), [0.0, 0.0, 0.0]);
        let depth = c.z / c.w;
        assert!(c.w > 0.0);
        assert!(depth > 0.0 && depth < 1.0, "depth was {depth}");
        assert_eq!(c.x, 0.0);
    }

    #[test]
    fn aspect_correction_squeezes_wide_viewports() {
        let m = Projection::AspectCorrected {
            scale: 1.4,
            width: 200,
            height: 100,
        }
        .to_matrix();
        assert!((m.x.x - 0.7).abs() < 1e-6);
        assert!((m.y.y - 1.4).abs() < 1e-6);
    }

    #[test]
    fn orthographic_maps_box_corners_to_clip_corners() {
        let t = Transform {
            projection: Projection::Orthographic {
                left: 0.0,
                right: 4.0,
                bottom: 0.0,
                top: 2.0,
                near: -1.0,
                far: 1.0,
            },
            ..Default::default()
        };
        let c = clip(&t, [4.0, 2.0, 0.0]);
        assert!((c.x - 1.0).abs() < 1e-6 && (c.y - 1.0).abs() < 1e-6);
    }
}
