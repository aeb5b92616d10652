//! The animated portal material.
//!
//! [`PortalUniform`] mirrors the uniform block of `portal.wgsl`. The frame loop
//! writes `time`, the parameter panel writes the rest.

use wgpu::util::DeviceExt;

use crate::{
    config::{DEFAULT_COLOUR_END, DEFAULT_COLOUR_START, PortalConfig},
    data_structures::{
        instance::InstanceRaw,
        model::{ModelVertex, Vertex},
    },
    error::ViewerError,
    pipelines::baked::{depth_state, mk_render_pipeline},
};

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PortalUniform {
    pub time: f32,
    pub velocity: f32,
    pub displacement_scale: f32,
    pub noise_scale: f32,
    /// Linear RGB.
    pub colour_start: [f32; 3],
    pub step: f32,
    /// Linear RGB.
    pub colour_end: [f32; 3],
    _padding: f32,
}

impl PortalUniform {
    pub fn from_config(config: &PortalConfig) -> Result<Self, ViewerError> {
        Ok(Self {
            time: 0.0,
            velocity: config.velocity,
            displacement_scale: config.displacement_scale,
            noise_scale: config.noise_scale,
            colour_start: hex_to_linear(&config.colour_start)?,
            step: config.step,
            colour_end: hex_to_linear(&config.colour_end)?,
            _padding: 0.0,
        })
    }

    /// Like [`Self::from_config`], but a colour that does not parse is
    /// replaced in `config` by its default. Every other value is kept.
    pub fn from_config_lenient(config: &mut PortalConfig) -> Self {
        Self {
            time: 0.0,
            velocity: config.velocity,
            displacement_scale: config.displacement_scale,
            noise_scale: config.noise_scale,
            colour_start: linear_or_default(&mut config.colour_start, DEFAULT_COLOUR_START),
            step: config.step,
            colour_end: linear_or_default(&mut config.colour_end, DEFAULT_COLOUR_END),
            _padding: 0.0,
        }
    }
}

fn linear_or_default(value: &mut String, default: [u8; 3]) -> [f32; 3] {
    let rgb = parse_hex_colour(value).unwrap_or_else(|e| {
        log::warn!("{}, using {}", e, format_hex_colour(default));
        *value = format_hex_colour(default);
        default
    });
    rgb.map(srgb_to_linear)
}

/// Parses `#rrggbb` (the leading `#` is optional) into its three channels.
pub fn parse_hex_colour(value: &str) -> Result<[u8; 3], ViewerError> {
    let invalid = || ViewerError::InvalidColour {
        value: value.to_string(),
    };
    let hex = value.strip_prefix('#').unwrap_or(value);
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    let mut rgb = [0u8; 3];
    for (i, channel) in rgb.iter_mut().enumerate() {
        *channel = u8::from_str_radix(&hex[2 * i..2 * i + 2], 16).map_err(|_| invalid())?;
    }
    Ok(rgb)
}

pub fn format_hex_colour(rgb: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}

pub fn srgb_to_linear(channel: u8) -> f32 {
    let c = channel as f32 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

pub fn hex_to_linear(value: &str) -> Result<[f32; 3], ViewerError> {
    Ok(parse_hex_colour(value)?.map(srgb_to_linear))
}

#[derive(Debug)]
pub struct PortalResources {
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl PortalResources {
    pub fn new(device: &wgpu::Device, uniform: &PortalUniform) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Portal Buffer"),
            contents: bytemuck::cast_slice(&[*uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("portal_bind_group_layout"),
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("portal_bind_group"),
        });
        Self {
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    pub fn write(&self, queue: &wgpu::Queue, uniform: &PortalUniform) {
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[*uniform]));
    }
}

pub fn mk_portal_pipeline(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    portal_bind_group_layout: &wgpu::BindGroupLayout,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Portal Pipeline Layout"),
        bind_group_layouts: &[portal_bind_group_layout, camera_bind_group_layout],
        push_constant_ranges: &[],
    });

    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Portal Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("portal.wgsl").into()),
    };

    // The portal is a single plane seen from both sides.
    mk_render_pipeline(
        device,
        &render_pipeline_layout,
        config.format,
        Some(wgpu::BlendState::REPLACE),
        Some(depth_state(true, wgpu::CompareFunction::Less)),
        None,
        &[ModelVertex::desc(), InstanceRaw::desc()],
        shader,
    )
}
