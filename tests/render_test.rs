#[cfg(feature = "integration-tests")]
use crate::common::test_utils::*;

mod common;

#[test]
#[cfg(feature = "integration-tests")]
fn should_render_red_triangle_on_clear_background() {
    let mut rasterizer = headless(4, 4);
    upper_right_triangle().load(&mut rasterizer);
    rasterizer.init().unwrap();
    rasterizer.display().unwrap();

    let pixels = read_pixels(&mut rasterizer);
    assert_eq!(pixels.len(), 4 * 4 * 4);
    assert_eq!(pixel(&pixels, 4, 3, 0), RED);
    assert_eq!(pixel(&pixels, 4, 2, 1), RED);
    assert_eq!(pixel(&pixels, 4, 0, 3), BLACK);
    assert_eq!(pixel(&pixels, 4, 1, 2), BLACK);
    rasterizer.cleanup();
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_colour_only_the_pixels_a_unit_triangle_covers() {
    let scene = Scene {
        points: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
        trilist: vec![0, 1, 2],
        tcoords: vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
        texels: [RED; 4].concat(),
        tex_width: 2,
        tex_height: 2,
    };
    let mut rasterizer = headless(4, 4);
    scene.load(&mut rasterizer);
    rasterizer.init().unwrap();
    rasterizer.display().unwrap();

    let pixels = read_pixels(&mut rasterizer);
    assert_eq!(pixel(&pixels, 4, 2, 1), RED);
    for (col, row) in [(0, 0), (3, 0), (0, 3), (3, 3), (1, 1), (2, 2)] {
        assert_eq!(pixel(&pixels, 4, col, row), BLACK, "pixel {col},{row}");
    }
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_render_the_same_frame_twice() {
    let mut rasterizer = headless(16, 16);
    upper_right_triangle().load(&mut rasterizer);
    rasterizer.init().unwrap();

    rasterizer.display().unwrap();
    let first = read_pixels(&mut rasterizer);
    rasterizer.display().unwrap();
    let second = read_pixels(&mut rasterizer);
    assert_eq!(first, second);
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_use_the_clear_colour() {
    let mut rasterizer = headless(4, 4);
    upper_right_triangle().load(&mut rasterizer);
    rasterizer.set_clear_colour(wgpu::Color::WHITE);
    rasterizer.init().unwrap();
    rasterizer.display().unwrap();

    let pixels = read_pixels(&mut rasterizer);
    assert_eq!(pixel(&pixels, 4, 0, 3), [255, 255, 255, 255]);
    assert_eq!(pixel(&pixels, 4, 3, 0), RED);
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_place_the_first_texture_row_at_the_top() {
    let mut rasterizer = headless(4, 4);
    two_row_quad().load(&mut rasterizer);
    rasterizer.init().unwrap();
    rasterizer.display().unwrap();

    let pixels = read_pixels(&mut rasterizer);
    for col in 0..4 {
        assert_eq!(pixel(&pixels, 4, col, 0), RED);
        assert_eq!(pixel(&pixels, 4, col, 3), BLUE);
    }
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_keep_bottom_up_rows_consistent() {
    use mesh_raster::{RasterizerConfig, RowOrder};

    let mut rasterizer = headless_with(RasterizerConfig {
        width: 4,
        height: 4,
        row_order: RowOrder::BottomUp,
        ..Default::default()
    });
    two_row_quad().load(&mut rasterizer);
    rasterizer.init().unwrap();
    rasterizer.display().unwrap();

    // Uploaded bottom-up, the red row is the bottom of the image; read back
    // bottom-up, the bottom of the frame comes first.
    let pixels = read_pixels(&mut rasterizer);
    assert_eq!(pixel(&pixels, 4, 0, 0), RED);
    assert_eq!(pixel(&pixels, 4, 0, 3), BLUE);
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_read_bgra_targets_as_rgba() {
    use mesh_raster::RasterizerConfig;

    let mut rasterizer = headless_with(RasterizerConfig {
        width: 4,
        height: 4,
        color_format: wgpu::TextureFormat::Bgra8Unorm,
        ..Default::default()
    });
    upper_right_triangle().load(&mut rasterizer);
    rasterizer.init().unwrap();
    rasterizer.display().unwrap();

    let pixels = read_pixels(&mut rasterizer);
    assert_eq!(pixel(&pixels, 4, 3, 0), RED);
    assert_eq!(pixel(&pixels, 4, 0, 3), BLACK);
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_translate_the_mesh_out_of_view() {
    let mut rasterizer = headless(4, 4);
    upper_right_triangle().load(&mut rasterizer);
    rasterizer.set_translation(cgmath::Vector3::new(3.0, 0.0, 0.0));
    rasterizer.init().unwrap();
    rasterizer.display().unwrap();

    let pixels = read_pixels(&mut rasterizer);
    assert!(pixels.chunks_exact(4).all(|px| px == BLACK));
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_grab_the_frame_as_an_image() {
    let mut rasterizer = headless(8, 4);
    upper_right_triangle().load(&mut rasterizer);
    rasterizer.init().unwrap();
    rasterizer.display().unwrap();

    let image = rasterizer.grab_image().unwrap();
    assert_eq!(image.dimensions(), (8, 4));
    assert_eq!(image.into_raw(), read_pixels(&mut rasterizer));
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_clip_meshes_behind_the_perspective_far_plane() {
    use mesh_raster::Transform;

    let mut rasterizer = headless(4, 4);
    upper_right_triangle().load(&mut rasterizer);
    let mut transform = Transform::perspective();
    transform.translation.z = -20.0;
    rasterizer.set_transform(transform);
    rasterizer.init().unwrap();
    rasterizer.display().unwrap();

    let pixels = read_pixels(&mut rasterizer);
    assert!(pixels.chunks_exact(4).all(|px| px == BLACK));
}
