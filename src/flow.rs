//! Application event loop.
//!
//! Startup reads the configuration, creates the GPU [`Context`] and spawns the
//! asset load. The load reports back through the winit event loop proxy, so all
//! viewer state is mutated on the event loop thread only.
//!
//! # Lifecycle
//!
//! Each frame, on `RedrawRequested`:
//! 1. Read the monotonic frame clock
//! 2. [`Viewer::tick`]: orbit damping, retarget to the model center, `time`
//!    uniform, overlay timeline, load timeout
//! 3. Write camera, portal and overlay uniforms
//! 4. Render the scene and the overlay on top, then present
//!
//! Input: left-button drag orbits, the wheel zooms and the keyboard drives the
//! parameter panel once it is active.

use std::{fmt::Debug, iter, sync::Arc};

#[cfg(feature = "integration-tests")]
use instant::Duration;

use futures::future::abortable;
#[cfg(feature = "integration-tests")]
use tokio::runtime::Runtime;
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, ElementState, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    keyboard::{Key, ModifiersState, NamedKey},
    window::Window,
};

use crate::{
    config::ViewerConfig,
    context::{Context, MouseButtonState, surface_size},
    data_structures::{
        model::Material,
        scene::GpuScene,
        texture::{Texture, create_default_sampler},
    },
    error::ViewerError,
    loading::{LoadProgress, LoadedAssets, load_assets},
    panel::PanelKey,
    render::{Render, Textured, draw},
    resources::{load_binary, texture::baked_bind_group},
    viewer::{FrameClock, Viewer},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(feature = "integration-tests")]
pub enum ImageTestResult {
    Passed,
    Waiting,
    Failed,
}

/// Inspects every rendered frame in integration tests. The frame is read back
/// in the surface format.
#[cfg(feature = "integration-tests")]
pub type FrameProbe = Box<
    dyn FnMut(
        &Viewer,
        &image::ImageBuffer<image::Rgba<u8>, wgpu::BufferView>,
    ) -> anyhow::Result<ImageTestResult>,
>;

/// GPU resources of the assembled model.
#[derive(Debug)]
pub struct SceneResources {
    pub meshes: GpuScene,
    pub baked: wgpu::BindGroup,
    pub rick: wgpu::BindGroup,
}

impl SceneResources {
    fn new(ctx: &Context, assets: &LoadedAssets) -> Self {
        let baked = Texture::from_rgba(&ctx.device, &ctx.queue, &assets.baked, Some("baked"));
        let rick = Texture::from_rgba(&ctx.device, &ctx.queue, &assets.rick, Some("baked_rick"));
        let sampler = create_default_sampler(&ctx.device);
        let layout = &ctx.texture_layout;
        Self {
            meshes: GpuScene::upload(&ctx.device, &assets.model),
            baked: baked_bind_group(&ctx.device, layout, &baked, &sampler, "baked_bind_group"),
            rick: baked_bind_group(&ctx.device, layout, &rick, &sampler, "rick_bind_group"),
        }
    }

    fn render(&self) -> Render<'_> {
        Render::Composed(vec![
            Render::Baked(Textured {
                meshes: self.meshes.with_material(Material::Baked).collect(),
                material: &self.baked,
            }),
            Render::Baked(Textured {
                meshes: self.meshes.with_material(Material::BakedRick).collect(),
                material: &self.rick,
            }),
            Render::Portal(self.meshes.with_material(Material::Portal).collect()),
        ])
    }
}

/// Everything that exists once the window and device are up.
#[derive(Debug)]
pub struct AppState {
    pub(crate) ctx: Context,
    pub viewer: Viewer,
    scene: Option<SceneResources>,
    is_surface_configured: bool,
    modifiers: ModifiersState,
}

impl AppState {
    async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let config = ViewerConfig::load().await;
        let viewer = Viewer::new(config);
        let ctx = Context::new(window, viewer.config(), &viewer.uniforms).await?;
        Ok(Self {
            ctx,
            viewer,
            scene: None,
            is_surface_configured: false,
            modifiers: ModifiersState::empty(),
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            let (width, height) = surface_size(
                width,
                height,
                self.ctx.window.scale_factor(),
                self.ctx.max_pixel_ratio,
            );
            self.ctx.config.width = width;
            self.ctx.config.height = height;
            self.is_surface_configured = true;
            self.ctx.projection.resize(width, height);
            self.ctx
                .surface
                .configure(&self.ctx.device, &self.ctx.config);
            self.ctx.depth_texture = Texture::create_depth_texture(
                &self.ctx.device,
                [self.ctx.config.width, self.ctx.config.height],
                "depth_texture",
            );
        }
    }

    fn on_loaded(&mut self, result: Result<LoadedAssets, ViewerError>, clock: &mut FrameClock) {
        match result {
            Ok(mut assets) => {
                if self.viewer.on_loaded(&mut assets.model, clock.now()).is_ok() {
                    self.scene = Some(SceneResources::new(&self.ctx, &assets));
                }
            }
            Err(e) => self.viewer.on_failed(&e),
        }
    }

    /// Advances the viewer and uploads this frame's uniforms.
    fn update(&mut self, clock: &mut FrameClock) {
        let now = clock.now();
        let camera = &mut self.ctx.camera;
        let update = self
            .viewer
            .tick(now, &mut camera.camera, &mut camera.controller);
        if update.overlay.indicator_hidden {
            log::info!("Loading finished after {:.2}s", update.time.as_secs_f32());
        }

        self.ctx.write_camera();
        self.ctx.portal.write(&self.ctx.queue, &self.viewer.uniforms);
        self.ctx
            .overlay
            .write(&self.ctx.queue, &self.viewer.overlay.uniform());
    }

    fn compose(&self) -> Render<'_> {
        let mut renders = Vec::new();
        if let Some(scene) = &self.scene {
            renders.push(scene.render());
        }
        if !self.viewer.overlay.is_finished() {
            renders.push(Render::Overlay(&self.ctx.overlay));
        }
        Render::Composed(renders)
    }

    fn handle_key(&mut self, key: &Key) {
        let coarse = self.modifiers.shift_key();
        let panel_key = match key {
            Key::Named(NamedKey::Tab) => PanelKey::NextControl,
            Key::Named(NamedKey::ArrowUp) => PanelKey::Increase { coarse },
            Key::Named(NamedKey::ArrowDown) => PanelKey::Decrease { coarse },
            Key::Named(NamedKey::ArrowRight) => PanelKey::NextChannel,
            Key::Named(NamedKey::ArrowLeft) => PanelKey::PreviousChannel,
            _ => return,
        };
        self.viewer.on_key(panel_key);
    }

    #[cfg(feature = "integration-tests")]
    fn get_test_texture(&self, extent3d: wgpu::Extent3d) -> wgpu::Texture {
        self.ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Golden Image Test Output Texture"),
            size: extent3d,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.ctx.config.format,
            usage: wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
    }

    #[cfg(feature = "integration-tests")]
    fn get_test_depth_texture(&self, extent3d: wgpu::Extent3d) -> wgpu::Texture {
        self.ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Golden Image Test Depth Texture"),
            size: extent3d,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Texture::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
    }

    /// Read-back rows must be a multiple of 256 bytes, so the test target is
    /// padded up to the next multiple of 64 pixels.
    #[cfg(feature = "integration-tests")]
    fn get_test_3d_extent(&self) -> wgpu::Extent3d {
        let pad = |dim: u32| dim.div_ceil(64).max(1) * 64;
        wgpu::Extent3d {
            width: pad(self.ctx.config.width),
            height: self.ctx.config.height.max(1),
            depth_or_array_layers: 1,
        }
    }

    fn render(
        &mut self,
        #[cfg(feature = "integration-tests")] async_runtime: &Runtime,
        #[cfg(feature = "integration-tests")] probe: &mut Option<FrameProbe>,
        #[cfg(feature = "integration-tests")] proxy: &EventLoopProxy<FlowEvent>,
    ) -> Result<(), wgpu::SurfaceError> {
        // keeps the frame loop going
        self.ctx.window.request_redraw();

        if !self.is_surface_configured {
            return Ok(());
        }

        let output = self.ctx.surface.get_current_texture()?;
        #[cfg(not(feature = "integration-tests"))]
        let (view, depth_view) = (
            output
                .texture
                .create_view(&wgpu::TextureViewDescriptor::default()),
            &self.ctx.depth_texture.view,
        );

        #[cfg(feature = "integration-tests")]
        let (tex, view, test_depth_view) = {
            let extent3d = self.get_test_3d_extent();
            let tex = self.get_test_texture(extent3d);
            let depth = self.get_test_depth_texture(extent3d);
            let view = tex.create_view(&wgpu::TextureViewDescriptor::default());
            let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());
            (tex, view, depth_view)
        };
        #[cfg(feature = "integration-tests")]
        let depth_view = &test_depth_view;

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.ctx.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            draw(&self.ctx, &mut render_pass, self.compose());
        }

        #[cfg(feature = "integration-tests")]
        let output_buffer = {
            let u32_size = std::mem::size_of::<u32>() as u32;
            let extent3d = self.get_test_3d_extent();
            let output_buffer = self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
                size: (u32_size * extent3d.width * extent3d.height) as wgpu::BufferAddress,
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                label: Some("Golden Image Test Output Buffer"),
                mapped_at_creation: false,
            });
            encoder.copy_texture_to_buffer(
                wgpu::TexelCopyTextureInfo {
                    aspect: wgpu::TextureAspect::All,
                    texture: &tex,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                },
                wgpu::TexelCopyBufferInfo {
                    buffer: &output_buffer,
                    layout: wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(u32_size * extent3d.width),
                        rows_per_image: Some(extent3d.height),
                    },
                },
                extent3d,
            );
            output_buffer
        };

        self.ctx.queue.submit(iter::once(encoder.finish()));

        #[cfg(feature = "integration-tests")]
        if let Some(probe) = probe.as_mut() {
            let extent3d = self.get_test_3d_extent();
            let fut_img = read_back(&self.ctx.device, &output_buffer, extent3d);
            let verdict = async_runtime
                .block_on(fut_img)
                .and_then(|img| probe(&self.viewer, &img));
            match verdict {
                Ok(ImageTestResult::Waiting) => (),
                Ok(ImageTestResult::Passed) => {
                    if proxy.send_event(FlowEvent::Exit).is_err() {
                        log::error!("All assertions passed but the event loop is gone");
                    }
                }
                Ok(ImageTestResult::Failed) => panic!("Frame assertion failed"),
                Err(e) => panic!("{}", e),
            }
        }

        output.present();
        Ok(())
    }
}

#[cfg(feature = "integration-tests")]
async fn read_back(
    device: &wgpu::Device,
    output_buffer: &wgpu::Buffer,
    extent3d: wgpu::Extent3d,
) -> anyhow::Result<image::ImageBuffer<image::Rgba<u8>, wgpu::BufferView>> {
    let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
    let buffer_slice = output_buffer.slice(..);
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        tx.send(result).ok();
    });
    device
        .poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: Some(Duration::from_secs(3)),
        })
        .map_err(|e| anyhow::anyhow!("{:?}", e))?;
    rx.receive()
        .await
        .ok_or_else(|| anyhow::anyhow!("read-back channel closed"))??;
    let data = buffer_slice.get_mapped_range();
    image::ImageBuffer::<image::Rgba<u8>, _>::from_raw(extent3d.width, extent3d.height, data)
        .ok_or_else(|| anyhow::anyhow!("read-back buffer too small"))
}

pub(crate) enum FlowEvent {
    // Only sent by the asynchronous web startup
    #[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
    Initialized(Box<AppState>),
    Progress(LoadProgress),
    Loaded(Result<LoadedAssets, ViewerError>),
    #[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
    Failed(String),
    // Only sent once a frame check passes
    #[cfg_attr(not(feature = "integration-tests"), allow(dead_code))]
    Exit,
}

impl Debug for FlowEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized(_) => f.write_str("Initialized"),
            Self::Progress(progress) => f.debug_tuple("Progress").field(progress).finish(),
            Self::Loaded(Ok(_)) => f.write_str("Loaded(Ok)"),
            Self::Loaded(Err(e)) => f.debug_tuple("Loaded").field(e).finish(),
            Self::Failed(e) => f.debug_tuple("Failed").field(e).finish(),
            Self::Exit => f.write_str("Exit"),
        }
    }
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<FlowEvent>,
    state: Option<AppState>,
    clock: FrameClock,
    #[cfg(feature = "integration-tests")]
    probe: Option<FrameProbe>,
}

impl App {
    fn new(event_loop: &EventLoop<FlowEvent>) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime: tokio::runtime::Runtime::new()?,
            proxy,
            state: None,
            clock: FrameClock::new(),
            #[cfg(feature = "integration-tests")]
            probe: None,
        })
    }

    /// Spawns the asset load. Progress and the result come back as events.
    fn start_loading(&mut self) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        let manifest = state.viewer.config().assets.clone();
        let progress_proxy = self.proxy.clone();
        let (task, handle) = abortable(async move {
            load_assets(
                &manifest,
                |url: String| async move { load_binary(&url).await },
                move |progress| {
                    if progress_proxy.send_event(FlowEvent::Progress(progress)).is_err() {
                        log::warn!("Dropping progress event, the event loop is gone");
                    }
                },
            )
            .await
        });
        state.viewer.start_loading(handle, self.clock.now());

        let proxy = self.proxy.clone();
        let load = async move {
            match task.await {
                Ok(result) => {
                    if proxy.send_event(FlowEvent::Loaded(result)).is_err() {
                        log::warn!("Dropping loaded assets, the event loop is gone");
                    }
                }
                Err(_) => log::debug!("Asset load aborted"),
            }
        };

        #[cfg(not(target_arch = "wasm32"))]
        self.async_runtime.spawn(load);

        #[cfg(target_arch = "wasm32")]
        wasm_bindgen_futures::spawn_local(load);
    }

    fn initialized(&mut self, app_state: AppState) {
        self.state = Some(app_state);
        if let Some(state) = self.state.as_mut() {
            let size = state.ctx.window.inner_size();
            state.resize(size.width, size.height);
            state.ctx.window.request_redraw();
        }
        self.start_loading();
    }
}

impl ApplicationHandler<FlowEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("Portal");

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let window = wgpu::web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let canvas = document.get_element_by_id(CANVAS_ID).unwrap_throw();
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Cannot create the window: {}", e);
                event_loop.exit();
                return;
            }
        };

        #[cfg(not(target_arch = "wasm32"))]
        match self.async_runtime.block_on(AppState::new(window)) {
            Ok(app_state) => self.initialized(app_state),
            Err(e) => {
                log::error!("App initialization failed: {:#}", e);
                event_loop.exit();
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let event = match AppState::new(window).await {
                    Ok(app_state) => FlowEvent::Initialized(Box::new(app_state)),
                    Err(e) => FlowEvent::Failed(format!("{:#}", e)),
                };
                if proxy.send_event(event).is_err() {
                    log::error!("The event loop closed during initialization");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: FlowEvent) {
        match event {
            FlowEvent::Initialized(app_state) => self.initialized(*app_state),
            FlowEvent::Progress(progress) => {
                if let Some(state) = &mut self.state {
                    state.viewer.on_progress(&progress);
                }
            }
            FlowEvent::Loaded(result) => {
                if let Some(state) = &mut self.state {
                    state.on_loaded(result, &mut self.clock);
                }
            }
            FlowEvent::Failed(e) => {
                log::error!("App initialization failed: {}", e);
                event_loop.exit();
            }
            FlowEvent::Exit => event_loop.exit(),
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            if let MouseButtonState::Left = state.ctx.mouse {
                state
                    .ctx
                    .camera
                    .controller
                    .handle_mouse(dx, dy, state.ctx.config.height);
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        state.ctx.camera.controller.handle_window_events(&event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                state.update(&mut self.clock);
                match state.render(
                    #[cfg(feature = "integration-tests")]
                    &self.async_runtime,
                    #[cfg(feature = "integration-tests")]
                    &mut self.probe,
                    #[cfg(feature = "integration-tests")]
                    &self.proxy,
                ) {
                    Ok(_) => {}
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = state.ctx.window.inner_size();
                        state.resize(size.width, size.height);
                    }
                    Err(e) => {
                        log::error!("Unable to render {}", e);
                    }
                }
            }
            WindowEvent::ModifiersChanged(modifiers) => state.modifiers = modifiers.state(),
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed {
                    state.handle_key(&event.logical_key);
                }
            }
            WindowEvent::MouseInput {
                state: button_state,
                button,
                ..
            } => match (button, button_state.is_pressed()) {
                (MouseButton::Left, true) => state.ctx.mouse = MouseButtonState::Left,
                (MouseButton::Left, false) => state.ctx.mouse = MouseButtonState::None,
                _ => (),
            },
            _ => {}
        }
    }
}

fn init_logger() {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::warn_1(&format!("Could not initialize logger: {}", e).into());
        }
    }
}

fn build_event_loop() -> anyhow::Result<EventLoop<FlowEvent>> {
    #[cfg(all(feature = "integration-tests", target_os = "linux"))]
    let event_loop = {
        use winit::platform::wayland::EventLoopBuilderExtWayland;

        EventLoop::with_user_event().with_any_thread(true).build()?
    };

    #[cfg(all(feature = "integration-tests", target_os = "windows"))]
    let event_loop = {
        use winit::platform::windows::EventLoopBuilderExtWindows;

        EventLoop::with_user_event().with_any_thread(true).build()?
    };

    #[cfg(not(all(
        feature = "integration-tests",
        any(target_os = "linux", target_os = "windows")
    )))]
    let event_loop = EventLoop::with_user_event().build()?;

    Ok(event_loop)
}

/// Opens the viewer and runs until the window is closed.
pub fn run() -> anyhow::Result<()> {
    init_logger();
    let event_loop = build_event_loop()?;
    let mut app = App::new(&event_loop)?;
    event_loop.run_app(&mut app)?;
    Ok(())
}

/// Like [`run`], but hands every rendered frame to `probe` and exits once it
/// returns [`ImageTestResult::Passed`].
#[cfg(feature = "integration-tests")]
pub fn run_with_probe(probe: FrameProbe) -> anyhow::Result<()> {
    init_logger();
    let event_loop = build_event_loop()?;
    let mut app = App::new(&event_loop)?;
    app.probe = Some(probe);
    event_loop.run_app(&mut app)?;
    Ok(())
}
