//! Host-side scene data: meshes, texture images and the GPU texture wrapper.
//!
//! - `mesh` contains the borrowed mesh type, its validation and vertex layout
//! - `texture` contains texture images, row-order conventions and GPU textures

pub mod mesh;
pub mod texture;
