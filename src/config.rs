//! Viewer configuration.
//!
//! Every tunable of the viewer lives in [`ViewerConfig`]. The defaults reproduce
//! the shipped scene; an `assets/viewer.json` file may override any subset of the
//! fields. The file is read once at startup.

use std::{f32::consts::PI, time::Duration};

use serde::Deserialize;

use crate::{pipelines::portal::format_hex_colour, resources::load_string};

/// Name of the optional configuration file, resolved like any other asset.
pub const CONFIG_FILE: &str = "viewer.json";

/// sRGB colours of the shipped portal.
pub const DEFAULT_COLOUR_START: [u8; 3] = [0x3a, 0x8f, 0x47];
pub const DEFAULT_COLOUR_END: [u8; 3] = [0xc8, 0xe1, 0x4c];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub assets: AssetManifest,
    pub overlay: OverlayConfig,
    pub camera: CameraConfig,
    pub orbit: OrbitConfig,
    pub portal: PortalConfig,
    /// Seconds to wait for the manifest before giving up. `None` waits forever.
    pub load_timeout_secs: Option<f32>,
    /// Translation applied to the model root before the center is computed.
    pub model_offset: [f32; 3],
    pub clear_colour: [f64; 4],
    /// Upper bound for the device pixel ratio used to size the surface.
    pub max_pixel_ratio: f64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            assets: AssetManifest::default(),
            overlay: OverlayConfig::default(),
            camera: CameraConfig::default(),
            orbit: OrbitConfig::default(),
            portal: PortalConfig::default(),
            load_timeout_secs: Some(30.0),
            model_offset: [0.0, -2.0, 0.0],
            clear_colour: [0.0, 0.0, 0.0, 1.0],
            max_pixel_ratio: 2.0,
        }
    }
}

impl ViewerConfig {
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads [`CONFIG_FILE`] from the asset root, falling back to the defaults.
    pub async fn load() -> Self {
        let json = match load_string(CONFIG_FILE).await {
            Ok(json) => json,
            Err(_) => {
                log::info!("No {} found, using the default configuration", CONFIG_FILE);
                return Self::default();
            }
        };
        match Self::from_json_str(&json) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Ignoring malformed {}: {}", CONFIG_FILE, e);
                Self::default()
            }
        }
    }

    pub fn load_timeout(&self) -> Option<Duration> {
        self.load_timeout_secs
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map(Duration::from_secs_f32)
    }

    pub fn clear_colour(&self) -> wgpu::Color {
        let [r, g, b, a] = self.clear_colour;
        wgpu::Color { r, g, b, a }
    }
}

/// The resources fetched before the scene can be shown.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AssetManifest {
    pub model: String,
    pub baked_texture: String,
    pub rick_texture: String,
    /// Direct child of the model root that receives `rick_texture`.
    pub rick_node: String,
    /// Direct child of the model root that receives the portal shader.
    pub portal_node: String,
}

impl Default for AssetManifest {
    fn default() -> Self {
        Self {
            model: "Model/r&m.glb".to_string(),
            baked_texture: "Model/r&m.jpg".to_string(),
            rick_texture: "Model/Rick2.jpg".to_string(),
            rick_node: "Rick".to_string(),
            portal_node: "Portal".to_string(),
        }
    }
}

/// Delays of the loading overlay, all in seconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// From load completion until the progress bar disappears.
    pub indicator_hide_delay: f32,
    /// From the progress bar disappearing until the fade starts.
    pub fade_delay: f32,
    pub fade_duration: f32,
    /// From the progress bar disappearing until the parameter panel opens.
    pub panel_delay: f32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            indicator_hide_delay: 1.0,
            fade_delay: 0.5,
            fade_duration: 1.5,
            panel_delay: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f32; 3],
    /// Vertical field of view in degrees.
    pub fovy: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [15.0, 12.0, 12.0],
            fovy: 35.0,
            znear: 0.1,
            zfar: 100.0,
        }
    }
}

/// Limits of the orbit controller. Angles are in radians.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OrbitConfig {
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    pub min_azimuth_angle: f32,
    pub max_azimuth_angle: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            min_polar_angle: PI / 8.0,
            max_polar_angle: PI / 2.0,
            min_azimuth_angle: PI / 0.5,
            max_azimuth_angle: PI / 2.0,
            min_distance: 5.0,
            max_distance: 30.0,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
        }
    }
}

/// Start values of the portal shader parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    pub velocity: f32,
    pub displacement_scale: f32,
    pub noise_scale: f32,
    pub step: f32,
    pub colour_start: String,
    pub colour_end: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            velocity: 4.135,
            displacement_scale: 9.107,
            noise_scale: 3.731,
            step: 0.16,
            colour_start: format_hex_colour(DEFAULT_COLOUR_START),
            colour_end: format_hex_colour(DEFAULT_COLOUR_END),
        }
    }
}
