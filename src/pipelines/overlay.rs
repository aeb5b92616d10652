//! Full-screen loading overlay.
//!
//! A 2×2 plane drawn in clip space after the scene. It is black with the opacity
//! from [`OverlayUniform::alpha`] and shows a progress bar while the loading
//! indicator is visible.

use wgpu::util::DeviceExt;

use crate::{data_structures::model::Vertex, pipelines::baked::{depth_state, mk_render_pipeline}};

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct OverlayVertex {
    pub position: [f32; 2],
}

impl Vertex for OverlayVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<OverlayVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x2,
            }],
        }
    }
}

const PLANE_VERTICES: &[OverlayVertex] = &[
    OverlayVertex { position: [-1.0, -1.0] },
    OverlayVertex { position: [1.0, -1.0] },
    OverlayVertex { position: [1.0, 1.0] },
    OverlayVertex { position: [-1.0, 1.0] },
];

const PLANE_INDICES: &[u16] = &[0, 1, 2, 0, 2, 3];

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct OverlayUniform {
    pub alpha: f32,
    /// Fraction of the manifest loaded, in `[0, 1]`.
    pub progress: f32,
    /// 1.0 while the progress bar is shown.
    pub indicator: f32,
    _padding: f32,
}

impl OverlayUniform {
    pub fn new(alpha: f32, progress: f32, indicator_visible: bool) -> Self {
        Self {
            alpha,
            progress,
            indicator: if indicator_visible { 1.0 } else { 0.0 },
            _padding: 0.0,
        }
    }
}

impl Default for OverlayUniform {
    fn default() -> Self {
        Self::new(1.0, 0.0, false)
    }
}

#[derive(Debug)]
pub struct OverlayResources {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_indices: u32,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl OverlayResources {
    pub fn new(device: &wgpu::Device) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Overlay Vertex Buffer"),
            contents: bytemuck::cast_slice(PLANE_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Overlay Index Buffer"),
            contents: bytemuck::cast_slice(PLANE_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Overlay Buffer"),
            contents: bytemuck::cast_slice(&[OverlayUniform::default()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("overlay_bind_group_layout"),
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("overlay_bind_group"),
        });
        Self {
            vertex_buffer,
            index_buffer,
            num_indices: PLANE_INDICES.len() as u32,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    pub fn write(&self, queue: &wgpu::Queue, uniform: &OverlayUniform) {
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[*uniform]));
    }

    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        render_pass.set_bind_group(0, &self.bind_group, &[]);
        render_pass.draw_indexed(0..self.num_indices, 0, 0..1);
    }
}

pub fn mk_overlay_pipeline(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    overlay_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Overlay Pipeline Layout"),
        bind_group_layouts: &[overlay_bind_group_layout],
        push_constant_ranges: &[],
    });

    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Overlay Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("overlay.wgsl").into()),
    };

    mk_render_pipeline(
        device,
        &render_pipeline_layout,
        config.format,
        Some(wgpu::BlendState::ALPHA_BLENDING),
        Some(depth_state(false, wgpu::CompareFunction::Always)),
        None,
        &[OverlayVertex::desc()],
        shader,
    )
}
