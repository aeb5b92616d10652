use std::sync::Arc;

use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::{
    camera::{self, CameraResources, CameraUniform, OrbitController, Projection},
    config::ViewerConfig,
    data_structures::texture,
    pipelines::{
        baked::mk_baked_pipeline,
        overlay::{OverlayResources, mk_overlay_pipeline},
        portal::{PortalResources, PortalUniform, mk_portal_pipeline},
    },
    resources::texture::baked_texture_layout,
};

/// Scales a physical window size so that the effective device pixel ratio does
/// not exceed `max_pixel_ratio`. Never returns a zero dimension.
pub fn surface_size(width: u32, height: u32, scale_factor: f64, max_pixel_ratio: f64) -> (u32, u32) {
    let scale_factor = if scale_factor > 0.0 { scale_factor } else { 1.0 };
    let ratio = scale_factor.min(max_pixel_ratio.max(f64::MIN_POSITIVE)) / scale_factor;
    let scale = |dim: u32| ((dim as f64 * ratio).round() as u32).max(1);
    (scale(width), scale(height))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseButtonState {
    Left,
    #[default]
    None,
}

#[derive(Debug)]
pub struct Pipelines {
    pub baked: wgpu::RenderPipeline,
    pub portal: wgpu::RenderPipeline,
    pub overlay: wgpu::RenderPipeline,
}

#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub(crate) depth_texture: texture::Texture,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub camera: CameraResources,
    pub projection: Projection,
    pub pipelines: Pipelines,
    pub portal: PortalResources,
    pub overlay: OverlayResources,
    pub texture_layout: wgpu::BindGroupLayout,
    pub clear_colour: wgpu::Color,
    pub max_pixel_ratio: f64,
    pub mouse: MouseButtonState,
}

impl Context {
    pub async fn new(
        window: Arc<Window>,
        viewer_config: &ViewerConfig,
        portal_uniform: &PortalUniform,
    ) -> anyhow::Result<Self> {
        let size = window.inner_size();
        let (width, height) = surface_size(
            size.width,
            size.height,
            window.scale_factor(),
            viewer_config.max_pixel_ratio,
        );

        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;
        log::info!("Using adapter {:?}", adapter.get_info().name);
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                ..Default::default()
            })
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        // Baked textures are sRGB, so render into an sRGB surface when there is one
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| anyhow::anyhow!("the surface supports no texture format"))?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let camera = camera::Camera::new(viewer_config.camera.position);
        let projection = Projection::from_config(config.width, config.height, &viewer_config.camera);
        let controller = OrbitController::new(viewer_config.orbit.clone());

        let mut camera_uniform = CameraUniform::new();
        camera_uniform.update_view_proj(&camera, &projection);

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[camera_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
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
                label: Some("camera_bind_group_layout"),
            });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        let depth_texture = texture::Texture::create_depth_texture(
            &device,
            [config.width, config.height],
            "depth_texture",
        );

        let portal = PortalResources::new(&device, portal_uniform);
        let overlay = OverlayResources::new(&device);
        let texture_layout = baked_texture_layout(&device);
        let pipelines = Pipelines {
            baked: mk_baked_pipeline(&device, &config, &texture_layout, &camera_bind_group_layout),
            portal: mk_portal_pipeline(
                &device,
                &config,
                &portal.bind_group_layout,
                &camera_bind_group_layout,
            ),
            overlay: mk_overlay_pipeline(&device, &config, &overlay.bind_group_layout),
        };

        let camera = CameraResources {
            camera,
            controller,
            uniform: camera_uniform,
            buffer: camera_buffer,
            bind_group: camera_bind_group,
        };

        Ok(Self {
            surface,
            device,
            queue,
            config,
            camera,
            projection,
            pipelines,
            portal,
            overlay,
            texture_layout,
            clear_colour: viewer_config.clear_colour(),
            max_pixel_ratio: viewer_config.max_pixel_ratio,
            mouse: MouseButtonState::default(),
            window,
            depth_texture,
        })
    }

    /// Writes the camera matrix for the current camera position.
    pub fn write_camera(&mut self) {
        self.camera
            .uniform
            .update_view_proj(&self.camera.camera, &self.projection);
        self.queue.write_buffer(
            &self.camera.buffer,
            0,
            bytemuck::cast_slice(&[self.camera.uniform]),
        );
    }
}
