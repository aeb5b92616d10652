//! portal-ngin
//!
//! A cross-platform viewer for a single baked glTF scene. The model's lighting
//! is baked into two textures, one node is drawn with an animated noise
//! "portal" shader, and a black overlay fades out once every asset has loaded.
//! Runs natively and in the browser (WebGL through wgpu).
//!
//! High-level modules
//! - `camera`: camera, projection and the damped orbit controller
//! - `config`: viewer configuration with defaults for the shipped scene
//! - `context`: GPU and window context that owns device/queue/pipelines
//! - `data_structures`: scene graph, meshes, materials and textures
//! - `error`: failures the viewer reports
//! - `flow`: the winit event loop and frame loop
//! - `loading`: asynchronous asset loading with progress reporting
//! - `overlay`: timeline of the loading overlay
//! - `panel`: parameter panel for the portal shader
//! - `pipelines`: render pipelines and WGSL shaders
//! - `render`: render composition and pipeline batching
//! - `resources`: asset I/O and glTF/image decoding
//! - `viewer`: platform-independent viewer state and per-frame update
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod flow;
pub mod loading;
pub mod overlay;
pub mod panel;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod viewer;

pub use error::ViewerError;
pub use flow::run;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Browser entry point, invoked when the wasm module is instantiated.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn run_web() -> Result<(), JsValue> {
    run().map_err(|e| JsValue::from_str(&format!("{:#}", e)))
}
