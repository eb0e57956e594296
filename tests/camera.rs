use glam::{Vec2, Vec4};

use tilegrid::Camera;

fn approx(a: Vec2, b: Vec2) -> bool {
    (a - b).length() < 1e-5
}

#[test]
fn position_maps_to_screen_centre() {
    let camera = Camera::new(Vec2::new(3.0, -2.0), 1.5);
    assert!(approx(camera.world_to_ndc(Vec2::new(3.0, -2.0)), Vec2::ZERO));
}

#[test]
fn visible_extent_follows_scale_and_aspect() {
    let mut camera = Camera::new(Vec2::ZERO, 2.0);
    camera.calc_aspect(1600, 800);
    assert_eq!(camera.aspect, 2.0);
    assert!(approx(camera.world_to_ndc(Vec2::new(4.0, 2.0)), Vec2::ONE));
    assert!(approx(camera.world_to_ndc(Vec2::new(-4.0, -2.0)), -Vec2::ONE));
}

#[test]
fn ndc_round_trips_through_world() {
    let mut camera = Camera::new(Vec2::new(0.5, 0.25), 0.75);
    camera.calc_aspect(1280, 720);
    for ndc in [Vec2::ZERO, Vec2::new(0.3, -0.9), Vec2::new(-1.0, 1.0)] {
        let world = camera.ndc_to_world(ndc);
        assert!(approx(camera.world_to_ndc(world), ndc), "ndc {ndc}");
    }
}

#[test]
fn zoom_and_pan() {
    let mut camera = Camera::default();
    camera.zoom(2.0);
    assert_eq!(camera.scale, 2.0);
    camera.zoom(0.0);
    assert_eq!(camera.scale, Camera::MIN_SCALE);

    camera.pan(Vec2::new(1.0, -1.0));
    assert_eq!(camera.position, Vec2::new(1.0, -1.0));
}

#[test]
fn zero_height_keeps_aspect() {
    let mut camera = Camera::default();
    camera.calc_aspect(800, 0);
    assert_eq!(camera.aspect, 1.0);
}

#[test]
fn uniform_is_column_major_matrix() {
    let camera = Camera::new(Vec2::new(1.0, 0.0), 1.0);
    let uniform = camera.uniform();
    let m = glam::Mat4::from_cols_array_2d(&uniform.view_proj);
    let clip = m * Vec4::new(2.0, 1.0, 0.0, 1.0);
    assert!(approx(Vec2::new(clip.x, clip.y), Vec2::ONE));
}
