//! Render composition and pipeline batching.
//!
//! A frame is described as a [`Render`] tree. [`draw`] flattens the tree into
//! one batch per pipeline and issues the batches in a fixed order: baked meshes,
//! then the portal, then the overlay on top of everything.

use wgpu::RenderPass;

use crate::{
    context::Context,
    data_structures::model::{DrawMesh, GpuMesh},
    pipelines::overlay::OverlayResources,
};

/// Meshes that share one baked texture.
pub struct Textured<'a> {
    pub meshes: Vec<&'a GpuMesh>,
    pub material: &'a wgpu::BindGroup,
}

/// Specifies what to draw this frame.
///
/// - `Baked(Textured)` renders meshes with the unlit baked pipeline
/// - `Portal(Vec<&GpuMesh>)` renders meshes with the animated portal shader
/// - `Overlay(&OverlayResources)` renders the full-screen loading overlay
/// - `Composed(Vec<Render>)` recursively renders a composition of renders
pub enum Render<'a> {
    Baked(Textured<'a>),
    Portal(Vec<&'a GpuMesh>),
    Overlay(&'a OverlayResources),
    Composed(Vec<Render<'a>>),
}

impl<'a> Render<'a> {
    pub(crate) fn set_pipelines(
        self,
        baked: &mut Vec<Textured<'a>>,
        portals: &mut Vec<&'a GpuMesh>,
        overlays: &mut Vec<&'a OverlayResources>,
    ) {
        match self {
            Render::Baked(textured) => baked.push(textured),
            Render::Portal(mut meshes) => portals.append(&mut meshes),
            Render::Overlay(overlay) => overlays.push(overlay),
            Render::Composed(renders) => renders
                .into_iter()
                .for_each(|render| render.set_pipelines(baked, portals, overlays)),
        }
    }
}

pub(crate) fn draw<'a>(ctx: &'a Context, render_pass: &mut RenderPass<'_>, render: Render<'a>) {
    let mut baked: Vec<Textured> = Vec::new();
    let mut portals: Vec<&GpuMesh> = Vec::new();
    let mut overlays: Vec<&OverlayResources> = Vec::new();
    render.set_pipelines(&mut baked, &mut portals, &mut overlays);

    if !baked.is_empty() {
        render_pass.set_pipeline(&ctx.pipelines.baked);
        for textured in baked {
            for mesh in textured.meshes {
                render_pass.draw_mesh(mesh, textured.material, &ctx.camera.bind_group);
            }
        }
    }

    if !portals.is_empty() {
        render_pass.set_pipeline(&ctx.pipelines.portal);
        for mesh in portals {
            render_pass.draw_mesh(mesh, &ctx.portal.bind_group, &ctx.camera.bind_group);
        }
    }

    if !overlays.is_empty() {
        render_pass.set_pipeline(&ctx.pipelines.overlay);
        for overlay in overlays {
            overlay.draw(render_pass);
        }
    }
}
