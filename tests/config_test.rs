use std::time::Duration;

use portal_ngin::{
    config::{AssetManifest, OverlayConfig, ViewerConfig},
    context::surface_size,
};

#[test]
fn should_default_to_the_shipped_scene() {
    let config = ViewerConfig::default();
    assert_eq!(config.assets.model, "Model/r&m.glb");
    assert_eq!(config.assets.baked_texture, "Model/r&m.jpg");
    assert_eq!(config.assets.rick_texture, "Model/Rick2.jpg");
    assert_eq!(config.load_timeout(), Some(Duration::from_secs(30)));
    assert_eq!(config.camera.position, [15.0, 12.0, 12.0]);
    assert_eq!(config.portal.colour_start, "#3a8f47");
    assert_eq!(config.clear_colour(), wgpu::Color::BLACK);
}

#[test]
fn should_accept_empty_document() {
    let config = ViewerConfig::from_json_str("{}").expect("valid json");
    assert_eq!(config, ViewerConfig::default());
}

#[test]
fn should_override_only_given_fields() {
    let config = ViewerConfig::from_json_str(
        r#"{
            "assets": { "model": "Model/other.glb" },
            "overlay": { "fade_duration": 3.0 },
            "portal": { "velocity": 2.0 },
            "load_timeout_secs": null
        }"#,
    )
    .expect("valid json");

    assert_eq!(
        config.assets,
        AssetManifest {
            model: "Model/other.glb".to_string(),
            ..Default::default()
        }
    );
    assert_eq!(
        config.overlay,
        OverlayConfig {
            fade_duration: 3.0,
            ..Default::default()
        }
    );
    assert_eq!(config.portal.velocity, 2.0);
    assert_eq!(config.portal.noise_scale, 3.731);
    assert_eq!(config.load_timeout(), None);
    assert_eq!(config.max_pixel_ratio, 2.0);
}

#[test]
fn should_ignore_unusable_timeouts() {
    let config = ViewerConfig {
        load_timeout_secs: Some(-1.0),
        ..Default::default()
    };
    assert_eq!(config.load_timeout(), None);

    let config = ViewerConfig {
        load_timeout_secs: Some(f32::INFINITY),
        ..Default::default()
    };
    assert_eq!(config.load_timeout(), None);
}

#[test]
fn should_reject_malformed_documents() {
    assert!(ViewerConfig::from_json_str("{").is_err());
    assert!(ViewerConfig::from_json_str(r#"{ "max_pixel_ratio": "two" }"#).is_err());
    assert!(ViewerConfig::from_json_str(r#"{ "model_offset": [0.0, 1.0] }"#).is_err());
}

#[test]
fn should_limit_pixel_ratio() {
    assert_eq!(surface_size(800, 600, 1.0, 2.0), (800, 600));
    assert_eq!(surface_size(1600, 1200, 2.0, 2.0), (1600, 1200));
    assert_eq!(surface_size(2400, 1800, 3.0, 2.0), (1600, 1200));
    assert_eq!(surface_size(1001, 501, 1.5, 1.0), (667, 334));
}

#[test]
fn should_never_return_an_empty_surface() {
    assert_eq!(surface_size(0, 0, 1.0, 2.0), (1, 1));
    assert_eq!(surface_size(1, 1, 4.0, 1.0), (1, 1));
    assert_eq!(surface_size(640, 480, 0.0, 2.0), (640, 480));
}

#[test]
fn should_take_clear_colour_from_the_document() {
    let config = ViewerConfig::from_json_str(r#"{ "clear_colour": [0.1, 0.2, 0.3, 1.0] }"#)
        .expect("valid json");
    assert_eq!(
        config.clear_colour(),
        wgpu::Color {
            r: 0.1,
            g: 0.2,
            b: 0.3,
            a: 1.0
        }
    );
    assert_eq!(config.camera, ViewerConfig::default().camera);
}
