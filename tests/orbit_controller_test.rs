use std::f32::consts::PI;

use cgmath::{InnerSpace, MetricSpace, Point3};
use portal_ngin::{
    camera::{Camera, OrbitController, Spherical, clamp_azimuth},
    config::OrbitConfig,
};

const EPSILON: f32 = 1e-3;

fn setup() -> (Camera, OrbitController) {
    (
        Camera::new([15.0, 12.0, 12.0]),
        OrbitController::new(OrbitConfig::default()),
    )
}

fn settle(camera: &mut Camera, controller: &mut OrbitController) {
    for _ in 0..500 {
        controller.update(camera);
    }
}

#[test]
fn should_clamp_azimuth_to_wrapped_limits() {
    // 2π wraps to 0, so the default allows a quarter turn
    let (min, max) = (2.0 * PI, PI / 2.0);
    assert_eq!(clamp_azimuth(-1.0, min, max), 0.0);
    assert_eq!(clamp_azimuth(3.0, min, max), PI / 2.0);
    assert_eq!(clamp_azimuth(0.5, min, max), 0.5);
}

#[test]
fn should_clamp_azimuth_across_the_seam() {
    assert_eq!(clamp_azimuth(3.0, 2.5, -2.5), 3.0);
    assert_eq!(clamp_azimuth(0.1, 2.5, -2.5), 2.5);
    assert_eq!(clamp_azimuth(-0.1, 2.5, -2.5), -2.5);
    assert_eq!(clamp_azimuth(1.0, f32::NEG_INFINITY, f32::INFINITY), 1.0);
}

#[test]
fn should_keep_start_position_without_input() {
    let (mut camera, mut controller) = setup();
    let start = camera.position;
    controller.update(&mut camera);
    assert!(camera.position.distance(start) < EPSILON);
    assert_eq!(camera.target, Point3::new(0.0, 0.0, 0.0));
}

#[test]
fn should_limit_horizontal_rotation() {
    let (mut camera, mut controller) = setup();
    // a long drag to the left turns the camera counter-clockwise
    controller.handle_mouse(-5000.0, 0.0, 600);
    settle(&mut camera, &mut controller);

    let spherical = Spherical::from_offset(camera.position - controller.target);
    assert!((spherical.theta - PI / 2.0).abs() < EPSILON, "theta {}", spherical.theta);

    controller.handle_mouse(10000.0, 0.0, 600);
    settle(&mut camera, &mut controller);
    let spherical = Spherical::from_offset(camera.position - controller.target);
    assert!(spherical.theta.abs() < EPSILON, "theta {}", spherical.theta);
}

#[test]
fn should_never_go_below_the_horizon() {
    let (mut camera, mut controller) = setup();
    controller.handle_mouse(0.0, -5000.0, 600);
    settle(&mut camera, &mut controller);

    let spherical = Spherical::from_offset(camera.position - controller.target);
    assert!(spherical.phi <= PI / 2.0 + EPSILON);
    assert!(camera.position.y >= -EPSILON);
}

#[test]
fn should_not_pass_over_the_top() {
    let (mut camera, mut controller) = setup();
    controller.handle_mouse(0.0, 5000.0, 600);
    settle(&mut camera, &mut controller);

    let spherical = Spherical::from_offset(camera.position - controller.target);
    assert!((spherical.phi - PI / 8.0).abs() < EPSILON, "phi {}", spherical.phi);
}

#[test]
fn should_clamp_zoom_distance() {
    let (mut camera, mut controller) = setup();
    for _ in 0..200 {
        controller.handle_scroll(1.0);
        controller.update(&mut camera);
    }
    let distance = (camera.position - controller.target).magnitude();
    assert!((distance - 5.0).abs() < EPSILON, "distance {}", distance);

    for _ in 0..200 {
        controller.handle_scroll(-1.0);
        controller.update(&mut camera);
    }
    let distance = (camera.position - controller.target).magnitude();
    assert!((distance - 30.0).abs() < EPSILON, "distance {}", distance);
}

#[test]
fn should_come_to_rest_after_a_drag() {
    let (mut camera, mut controller) = setup();
    controller.handle_mouse(-30.0, 10.0, 600);

    controller.update(&mut camera);
    let first_step = camera.position;
    controller.update(&mut camera);
    assert!(camera.position.distance(first_step) > 0.0, "damping stopped at once");

    settle(&mut camera, &mut controller);
    let rest = camera.position;
    controller.update(&mut camera);
    assert!(camera.position.distance(rest) < 1e-4);
}

#[test]
fn should_follow_a_moved_target() {
    let (mut camera, mut controller) = setup();
    controller.target = Point3::new(1.5, 0.5, 1.5);
    controller.update(&mut camera);

    assert_eq!(camera.target, controller.target);
    let distance = (camera.position - controller.target).magnitude();
    assert!((5.0..=30.0).contains(&distance));
}
