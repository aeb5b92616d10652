//! Platform-independent state of the viewer and the per-frame update.
//!
//! [`Viewer`] owns everything that is not a GPU handle: loading state, overlay
//! timeline, parameter panel and the portal uniform values. The event loop in
//! [`crate::flow`] feeds it events and calls [`Viewer::tick`] once per frame.

use std::time::Duration;

use cgmath::{EuclideanSpace, Point3, Vector3};
use futures::future::AbortHandle;
use instant::Instant;

use crate::{
    camera::{Camera, OrbitController},
    config::{PortalConfig, ViewerConfig},
    data_structures::scene::SceneModel,
    error::ViewerError,
    loading::{LoadProgress, LoadingState},
    overlay::{OverlayController, OverlayUpdate},
    panel::{PanelKey, ParameterPanel},
    pipelines::portal::PortalUniform,
};

/// Monotonic time since program start.
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    start: Instant,
    last: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            last: Duration::ZERO,
        }
    }

    /// Reads the clock. Never returns less than the previous reading.
    pub fn now(&mut self) -> Duration {
        let elapsed = self.start.elapsed();
        self.advance(elapsed)
    }

    pub fn advance(&mut self, elapsed: Duration) -> Duration {
        self.last = self.last.max(elapsed);
        self.last
    }

    pub fn elapsed(&self) -> Duration {
        self.last
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUpdate {
    pub time: Duration,
    pub overlay: OverlayUpdate,
    /// Set on the frame the load was given up on.
    pub timed_out: bool,
}

#[derive(Debug)]
pub struct Viewer {
    config: ViewerConfig,
    portal_config: PortalConfig,
    pub loading: LoadingState,
    pub overlay: OverlayController,
    pub panel: Option<ParameterPanel>,
    pub uniforms: PortalUniform,
    model_center: Point3<f32>,
    load_handle: Option<AbortHandle>,
    load_started_at: Duration,
}

impl Viewer {
    pub fn new(config: ViewerConfig) -> Self {
        let mut portal_config = config.portal.clone();
        let uniforms = PortalUniform::from_config_lenient(&mut portal_config);
        Self {
            overlay: OverlayController::new(config.overlay.clone()),
            config,
            portal_config,
            loading: LoadingState::default(),
            panel: None,
            uniforms,
            model_center: Point3::origin(),
            load_handle: None,
            load_started_at: Duration::ZERO,
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn model_center(&self) -> Point3<f32> {
        self.model_center
    }

    /// Registers the running load so it can be given up on after the timeout.
    pub fn start_loading(&mut self, handle: AbortHandle, now: Duration) {
        self.load_handle = Some(handle);
        self.load_started_at = now;
    }

    pub fn on_progress(&mut self, progress: &LoadProgress) {
        log::info!(
            "Loaded {} ({}/{})",
            progress.url,
            progress.items_loaded,
            progress.items_total
        );
        self.loading.record_progress(progress);
        self.overlay.on_progress(progress);
    }

    /// Assembles the loaded model and starts the overlay timeline.
    ///
    /// A missing named node is reported as a failed load; the overlay then stays
    /// up and the model must not be drawn.
    pub fn on_loaded(&mut self, model: &mut SceneModel, now: Duration) -> Result<(), ViewerError> {
        self.load_handle = None;
        if !self.loading.is_pending() {
            log::warn!("Ignoring assets that arrived after the load was given up on");
            return Err(ViewerError::LoadTimedOut(now.saturating_sub(self.load_started_at)));
        }
        let offset = Vector3::from(self.config.model_offset);
        match model.assemble(&self.config.assets, offset) {
            Ok(center) => {
                log::info!("Model assembled, {} nodes, center {:?}", model.node_count(), center);
                self.model_center = center;
                self.loading.complete();
                self.overlay.on_load_complete(now);
                Ok(())
            }
            Err(e) => {
                self.on_failed(&e);
                Err(e)
            }
        }
    }

    pub fn on_failed(&mut self, error: &ViewerError) {
        log::error!("Loading failed: {}", error);
        self.load_handle = None;
        self.loading.fail(error);
    }

    /// Forwards a key to the panel. Keys before activation are dropped.
    pub fn on_key(&mut self, key: PanelKey) -> bool {
        match self.panel.as_mut() {
            Some(panel) => panel.handle_key(key, &mut self.uniforms),
            None => false,
        }
    }

    pub fn tick(&mut self, now: Duration, camera: &mut Camera, controller: &mut OrbitController) -> FrameUpdate {
        controller.update(camera);
        controller.target = self.model_center;
        controller.update(camera);

        self.uniforms.time = now.as_secs_f32();

        let overlay = self.overlay.update(now);
        if overlay.panel_activated {
            match ParameterPanel::new(&self.portal_config) {
                Ok(panel) => {
                    log::info!("Parameter panel active");
                    self.panel = Some(panel);
                }
                Err(e) => log::error!("Parameter panel unavailable: {}", e),
            }
        }

        FrameUpdate {
            time: now,
            overlay,
            timed_out: self.check_timeout(now),
        }
    }

    fn check_timeout(&mut self, now: Duration) -> bool {
        let Some(timeout) = self.config.load_timeout() else {
            return false;
        };
        if !self.loading.is_pending() || now.saturating_sub(self.load_started_at) < timeout {
            return false;
        }
        if let Some(handle) = self.load_handle.take() {
            handle.abort();
        }
        self.on_failed(&ViewerError::LoadTimedOut(timeout));
        true
    }
}
