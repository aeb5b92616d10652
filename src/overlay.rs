//! Timeline of the loading overlay.
//!
//! The overlay starts opaque. Progress events show the loading indicator. Once
//! loading completes the timeline runs off the frame clock:
//!
//! ```text
//! completion ── indicator_hide_delay ──> indicator hidden
//!                                        ├── fade_delay ──> fade over fade_duration
//!                                        └── panel_delay ─> parameter panel active
//! ```

use std::time::Duration;

use crate::{config::OverlayConfig, loading::LoadProgress, pipelines::overlay::OverlayUniform};

/// The `power1.out` curve: fast start, slow finish.
pub fn ease_out_quad(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t) * (1.0 - t)
}

/// Result of advancing the overlay by one frame. The two flags are edges: each
/// is `true` on exactly one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayUpdate {
    pub alpha: f32,
    pub indicator_hidden: bool,
    pub panel_activated: bool,
}

#[derive(Debug, Clone)]
pub struct OverlayController {
    config: OverlayConfig,
    completed_at: Option<Duration>,
    alpha: f32,
    progress: f32,
    indicator_visible: bool,
    indicator_hidden: bool,
    panel_activated: bool,
}

impl OverlayController {
    pub fn new(config: OverlayConfig) -> Self {
        Self {
            config,
            completed_at: None,
            alpha: 1.0,
            progress: 0.0,
            indicator_visible: false,
            indicator_hidden: false,
            panel_activated: false,
        }
    }

    pub fn on_progress(&mut self, progress: &LoadProgress) {
        if self.indicator_hidden || progress.items_total == 0 {
            return;
        }
        self.indicator_visible = true;
        self.progress = progress.items_loaded as f32 / progress.items_total as f32;
    }

    /// Starts the timeline. Later calls are ignored.
    pub fn on_load_complete(&mut self, now: Duration) {
        if self.completed_at.is_none() {
            self.completed_at = Some(now);
        }
    }

    pub fn update(&mut self, now: Duration) -> OverlayUpdate {
        let mut update = OverlayUpdate {
            alpha: self.alpha,
            indicator_hidden: false,
            panel_activated: false,
        };
        let Some(completed_at) = self.completed_at else {
            return update;
        };
        let since = now.saturating_sub(completed_at).as_secs_f32();
        let hide_at = self.config.indicator_hide_delay;

        if !self.indicator_hidden && since >= hide_at {
            self.indicator_hidden = true;
            self.indicator_visible = false;
            update.indicator_hidden = true;
            log::debug!("Loading indicator hidden");
        }
        if !self.indicator_hidden {
            return update;
        }

        let fade_start = hide_at + self.config.fade_delay;
        let t = if self.config.fade_duration > 0.0 {
            (since - fade_start) / self.config.fade_duration
        } else if since >= fade_start {
            1.0
        } else {
            0.0
        };
        // min keeps the opacity from ever rising again
        self.alpha = self.alpha.min(1.0 - ease_out_quad(t));
        update.alpha = self.alpha;

        if !self.panel_activated && since >= hide_at + self.config.panel_delay {
            self.panel_activated = true;
            update.panel_activated = true;
        }
        update
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn indicator_visible(&self) -> bool {
        self.indicator_visible
    }

    pub fn panel_activated(&self) -> bool {
        self.panel_activated
    }

    /// True once nothing of the overlay is left on screen.
    pub fn is_finished(&self) -> bool {
        self.indicator_hidden && self.alpha <= 0.0
    }

    pub fn uniform(&self) -> OverlayUniform {
        OverlayUniform::new(self.alpha, self.progress, self.indicator_visible)
    }
}
