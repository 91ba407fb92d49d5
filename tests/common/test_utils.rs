use mesh_raster::{Mesh, Rasterizer, RasterizerConfig, TextureImage};

pub(crate) const RED: [u8; 4] = [255, 0, 0, 255];
pub(crate) const BLUE: [u8; 4] = [0, 0, 255, 255];
pub(crate) const BLACK: [u8; 4] = [0, 0, 0, 255];

pub(crate) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub(crate) fn headless(width: u32, height: u32) -> Rasterizer {
    headless_with(RasterizerConfig {
        width,
        height,
        ..Default::default()
    })
}

pub(crate) fn headless_with(config: RasterizerConfig) -> Rasterizer {
    init_logger();
    Rasterizer::headless(config).expect("no GPU adapter available for integration tests")
}

/// Owned scene data that can be borrowed as a [`Mesh`] and [`TextureImage`].
pub(crate) struct Scene {
    pub(crate) points: Vec<f64>,
    pub(crate) trilist: Vec<u32>,
    pub(crate) tcoords: Vec<f32>,
    pub(crate) texels: Vec<u8>,
    pub(crate) tex_width: u32,
    pub(crate) tex_height: u32,
}

impl Scene {
    pub(crate) fn mesh(&self) -> Mesh<'_> {
        Mesh::new(&self.points, &self.trilist, &self.tcoords)
    }

    pub(crate) fn image(&self) -> TextureImage<'_> {
        TextureImage::new(&self.texels, self.tex_width, self.tex_height)
    }

    pub(crate) fn load(&self, rasterizer: &mut Rasterizer) {
        rasterizer
            .init_scene(&self.mesh(), &self.image())
            .expect("scene should load");
    }
}

/// A single red triangle covering the half of the viewport above the
/// diagonal from the top-left to the bottom-right corner.
pub(crate) fn upper_right_triangle() -> Scene {
    Scene {
        points: vec![-1.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0, -1.0, 0.0],
        trilist: vec![0, 1, 2],
        tcoords: vec![0.0, 1.0, 1.0, 1.0, 1.0, 0.0],
        texels: RED.to_vec(),
        tex_width: 1,
        tex_height: 1,
    }
}

/// A quad filling the viewport, textured with a 1x2 image whose first row
/// is red and second row is blue.
pub(crate) fn two_row_quad() -> Scene {
    Scene {
        points: vec![
            -1.0, -1.0, 0.0, //
            1.0, -1.0, 0.0, //
            1.0, 1.0, 0.0, //
            -1.0, 1.0, 0.0,
        ],
        trilist: vec![0, 1, 2, 0, 2, 3],
        tcoords: vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0],
        texels: [RED, BLUE].concat(),
        tex_width: 1,
        tex_height: 2,
    }
}

pub(crate) fn read_pixels(rasterizer: &mut Rasterizer) -> Vec<u8> {
    let (width, height) = rasterizer
        .frame_buffer_size()
        .expect("rasterizer has no framebuffer");
    let mut pixels = vec![0; width as usize * height as usize * 4];
    rasterizer
        .return_fb_pixels(&mut pixels, width, height)
        .expect("readback should succeed");
    pixels
}

/// The RGBA value at `col`/`row` of a tightly packed buffer.
pub(crate) fn pixel(pixels: &[u8], width: u32, col: u32, row: u32) -> [u8; 4] {
    let i = (row * width + col) as usize * 4;
    [pixels[i], pixels[i + 1], pixels[i + 2], pixels[i + 3]]
}
