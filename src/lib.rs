//! mesh-raster
//!
//! An offscreen rasterizer for a single textured triangle mesh. A caller
//! hands over vertex positions, triangle indices, per-vertex texture
//! coordinates and an RGBA8 image, renders the mesh into a framebuffer of a
//! chosen resolution and reads the result back as packed RGBA8 pixels.
//!
//! ```no_run
//! use mesh_raster::{Mesh, Rasterizer, RasterizerConfig, TextureImage};
//!
//! # fn main() -> mesh_raster::RasterResult<()> {
//! let points = [-1.0, -1.0, 0.0, 1.0, -1.0, 0.0, 0.0, 1.0, 0.0];
//! let tcoords = [0.0, 0.0, 1.0, 0.0, 0.5, 1.0];
//! let red = [255, 0, 0, 255];
//!
//! let mut rasterizer = Rasterizer::headless(RasterizerConfig {
//!     width: 4,
//!     height: 4,
//!     ..Default::default()
//! })?;
//! rasterizer.init_scene(
//!     &Mesh::new(&points, &[0, 1, 2], &tcoords),
//!     &TextureImage::new(&red, 1, 1),
//! )?;
//! rasterizer.init()?;
//! rasterizer.display()?;
//!
//! let mut pixels = vec![0; 4 * 4 * 4];
//! rasterizer.return_fb_pixels(&mut pixels, 4, 4)?;
//! rasterizer.cleanup();
//! # Ok(())
//! # }
//! ```
//!
//! High-level modules
//! - `rasterizer`: the owning object and its init/display/readback/cleanup lifecycle
//! - `context`: device and queue acquisition, error capture, resource counters
//! - `data_structures`: the borrowed mesh and image inputs and GPU texture wrappers
//! - `pipelines`: the textured shader program and its attribute/uniform locations
//! - `resources`: scene geometry and texture uploads
//! - `framebuffer`: offscreen color and depth attachments
//! - `render` / `readback`: draw submission and GPU→host pixel transfer
//! - `camera`: the projection and translation applied in the vertex stage
//! - `flow`: an optional winit window that shows the rendered frame
//!

pub mod camera;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod flow;
pub mod framebuffer;
pub mod pipelines;
pub mod rasterizer;
pub mod readback;
pub mod render;
pub mod resources;

pub use camera::{Projection, Transform};
pub use context::{Context, ResourceCounters};
pub use data_structures::mesh::Mesh;
pub use data_structures::texture::{RowOrder, TextureImage};
pub use error::{RasterError, RasterResult};
pub use rasterizer::{Lifecycle, Rasterizer, RasterizerConfig};

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath;
pub use wgpu;
