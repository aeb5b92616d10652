//! Render pipelines and their shaders.
//!
//! - `baked` draws unlit meshes textured with baked lighting
//! - `portal` draws the animated portal surface
//! - `overlay` draws the full-screen loading overlay

pub mod baked;
pub mod overlay;
pub mod portal;
