//! Viewer data structures: meshes, materials, textures and the scene graph.
//!
//! - `instance` holds node transforms and their GPU layout
//! - `model` contains vertex formats, material identities and GPU meshes
//! - `scene` is the CPU scene graph of the loaded model plus scene assembly
//! - `texture` contains GPU texture wrapper and creation utilities

pub mod instance;
pub mod model;
pub mod scene;
pub mod texture;
