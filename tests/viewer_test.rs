use std::time::Duration;

use cgmath::Point3;
use futures::{
    executor::block_on,
    future::{Aborted, abortable, pending},
};
use portal_ngin::{
    ViewerError,
    camera::{Camera, OrbitController},
    config::{PortalConfig, ViewerConfig},
    loading::LoadProgress,
    panel::{ColourTarget, PanelKey},
    pipelines::portal::PortalUniform,
    viewer::{FrameClock, Viewer},
};

use crate::common::test_utils::portal_scene;

mod common;

fn secs(s: f32) -> Duration {
    Duration::from_secs_f32(s)
}

fn setup(config: ViewerConfig) -> (Viewer, Camera, OrbitController) {
    let camera = Camera::new(config.camera.position);
    let controller = OrbitController::new(config.orbit.clone());
    (Viewer::new(config), camera, controller)
}

fn report_all(viewer: &mut Viewer) {
    for (i, url) in ["Model/r&m.jpg", "Model/Rick2.jpg", "Model/r&m.glb"]
        .iter()
        .enumerate()
    {
        viewer.on_progress(&LoadProgress {
            url: url.to_string(),
            items_loaded: i + 1,
            items_total: 3,
        });
    }
}

#[test]
fn should_never_run_the_clock_backwards() {
    let mut clock = FrameClock::new();
    assert_eq!(clock.advance(secs(2.0)), secs(2.0));
    assert_eq!(clock.advance(secs(1.0)), secs(2.0));
    assert_eq!(clock.elapsed(), secs(2.0));

    let first = clock.now();
    let second = clock.now();
    assert!(second >= first);
    assert!(first >= secs(2.0));
}

#[test]
fn should_advance_time_uniform_every_frame() {
    let (mut viewer, mut camera, mut controller) = setup(ViewerConfig::default());
    let mut clock = FrameClock::new();

    let mut last = viewer.uniforms.time;
    for frame in 0..120 {
        let now = clock.advance(secs(frame as f32 / 60.0));
        let update = viewer.tick(now, &mut camera, &mut controller);
        assert_eq!(update.time, now);
        assert!(viewer.uniforms.time >= last);
        last = viewer.uniforms.time;
    }
    assert!(last > 1.9);
}

#[test]
fn should_open_panel_after_the_overlay_timeline() {
    let (mut viewer, mut camera, mut controller) = setup(ViewerConfig::default());
    report_all(&mut viewer);
    assert!(viewer.overlay.indicator_visible());

    let mut model = portal_scene();
    viewer.on_loaded(&mut model, secs(1.0)).expect("assembly failed");
    assert!(viewer.loading.is_complete);
    assert_eq!(viewer.model_center(), Point3::new(1.5, 0.5, 1.5));

    viewer.tick(secs(3.9), &mut camera, &mut controller);
    assert!(viewer.panel.is_none());
    assert!(!viewer.on_key(PanelKey::Increase { coarse: false }));

    let update = viewer.tick(secs(4.0), &mut camera, &mut controller);
    assert!(update.overlay.panel_activated);
    assert!(viewer.panel.is_some());
    assert!(viewer.overlay.is_finished());
    assert!(!update.timed_out);
}

#[test]
fn should_orbit_around_the_model_center() {
    let (mut viewer, mut camera, mut controller) = setup(ViewerConfig::default());
    let mut model = portal_scene();
    viewer.on_loaded(&mut model, Duration::ZERO).expect("assembly failed");

    viewer.tick(secs(0.1), &mut camera, &mut controller);
    assert_eq!(controller.target, viewer.model_center());
    assert_eq!(camera.target, viewer.model_center());
}

#[test]
fn should_forward_keys_once_the_panel_is_active() {
    let (mut viewer, mut camera, mut controller) = setup(ViewerConfig::default());
    let mut model = portal_scene();
    viewer.on_loaded(&mut model, Duration::ZERO).expect("assembly failed");
    viewer.tick(secs(3.0), &mut camera, &mut controller);

    let before = viewer.uniforms.displacement_scale;
    assert!(viewer.on_key(PanelKey::Increase { coarse: true }));
    assert!((viewer.uniforms.displacement_scale - before - 0.1).abs() < 1e-4);
}

#[test]
fn should_keep_overlay_when_a_node_is_missing() {
    let (mut viewer, mut camera, mut controller) = setup(ViewerConfig::default());
    report_all(&mut viewer);
    let mut model = portal_scene();
    model
        .root
        .children
        .retain(|child| child.name.as_deref() != Some("Rick"));

    let result = viewer.on_loaded(&mut model, secs(1.0));
    assert_eq!(
        result,
        Err(ViewerError::MissingNode {
            name: "Rick".to_string()
        })
    );
    assert!(!viewer.loading.is_complete);
    assert!(viewer.loading.failure.is_some());

    for s in [2.0, 5.0, 60.0] {
        let update = viewer.tick(secs(s), &mut camera, &mut controller);
        assert_eq!(update.overlay.alpha, 1.0);
        assert!(!update.timed_out);
    }
    assert!(viewer.panel.is_none());
}

#[test]
fn should_give_up_after_the_load_timeout() {
    let config = ViewerConfig {
        load_timeout_secs: Some(1.0),
        ..Default::default()
    };
    let (mut viewer, mut camera, mut controller) = setup(config);
    let (load, handle) = abortable(pending::<()>());
    viewer.start_loading(handle, Duration::ZERO);

    assert!(!viewer.tick(secs(0.5), &mut camera, &mut controller).timed_out);
    assert!(viewer.tick(secs(1.0), &mut camera, &mut controller).timed_out);
    assert_eq!(block_on(load), Err(Aborted));
    assert!(viewer.loading.failure.is_some());

    // reported once
    assert!(!viewer.tick(secs(2.0), &mut camera, &mut controller).timed_out);

    let mut model = portal_scene();
    let late = viewer.on_loaded(&mut model, secs(3.0));
    assert!(matches!(late, Err(ViewerError::LoadTimedOut(_))));
    assert!(!viewer.loading.is_complete);
    assert_eq!(viewer.tick(secs(10.0), &mut camera, &mut controller).overlay.alpha, 1.0);
}

#[test]
fn should_wait_forever_without_timeout() {
    let config = ViewerConfig {
        load_timeout_secs: None,
        ..Default::default()
    };
    let (mut viewer, mut camera, mut controller) = setup(config);
    let (_load, handle) = abortable(pending::<()>());
    viewer.start_loading(handle.clone(), Duration::ZERO);

    assert!(!viewer.tick(secs(3600.0), &mut camera, &mut controller).timed_out);
    assert!(!handle.is_aborted());
    assert!(viewer.loading.is_pending());
}

#[test]
fn should_fall_back_to_default_colours() {
    let mut config = ViewerConfig::default();
    config.portal = PortalConfig {
        colour_start: "not a colour".to_string(),
        colour_end: "#ff0000".to_string(),
        velocity: 1.0,
        ..Default::default()
    };
    let viewer = Viewer::new(config);

    let expected = PortalUniform::from_config(&PortalConfig {
        colour_end: "#ff0000".to_string(),
        velocity: 1.0,
        ..Default::default()
    })
    .expect("valid colours");
    assert_eq!(viewer.uniforms, expected);
    assert_eq!(viewer.uniforms.velocity, 1.0);
    assert_eq!(viewer.uniforms.colour_end, [1.0, 0.0, 0.0]);
}

#[test]
fn should_open_panel_with_a_repaired_colour() {
    let mut config = ViewerConfig::default();
    config.portal.colour_end = "#12345".to_string();
    let (mut viewer, mut camera, mut controller) = setup(config);
    let mut model = portal_scene();
    viewer.on_loaded(&mut model, Duration::ZERO).expect("assembly failed");
    viewer.tick(secs(3.0), &mut camera, &mut controller);

    let panel = viewer.panel.as_ref().expect("panel did not open");
    assert_eq!(panel.colour_hex(ColourTarget::End), "#c8e14c");
    assert_eq!(panel.colour_hex(ColourTarget::Start), "#3a8f47");
}
