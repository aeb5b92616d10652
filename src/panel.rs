//! The parameter panel.
//!
//! Four sliders and two colour pickers bound to fields of [`PortalUniform`].
//! Without a widget toolkit the panel is driven from the keyboard:
//!
//! | key            | slider                  | colour picker              |
//! |----------------|-------------------------|----------------------------|
//! | Tab            | next control            | next control               |
//! | Up / Down      | one step (×100 w/ Shift)| selected channel ± 1/255   |
//! | Left / Right   |                         | previous / next channel    |

use crate::{
    config::PortalConfig,
    error::ViewerError,
    pipelines::portal::{PortalUniform, format_hex_colour, parse_hex_colour, srgb_to_linear},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliderTarget {
    DisplacementScale,
    NoiseScale,
    Step,
    Velocity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColourTarget {
    Start,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slider {
    pub name: &'static str,
    pub min: f32,
    pub max: f32,
    pub step: f32,
    pub target: SliderTarget,
}

impl Slider {
    /// Snaps `value` to the step grid, then clamps it into range.
    pub fn constrain(&self, value: f32) -> f32 {
        let snapped = if self.step > 0.0 {
            (value / self.step).round() * self.step
        } else {
            value
        };
        snapped.max(self.min).min(self.max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Control {
    Slider(SliderTarget),
    ColourPicker {
        name: &'static str,
        target: ColourTarget,
    },
}

impl Control {
    pub fn name(&self) -> &'static str {
        match self {
            Control::Slider(target) => ParameterPanel::slider(*target).name,
            Control::ColourPicker { name, .. } => name,
        }
    }
}

/// Indexed by `SliderTarget as usize`.
pub static SLIDERS: [Slider; 4] = [
    Slider {
        name: "Displacement Scale",
        min: 0.0,
        max: 20.0,
        step: 0.001,
        target: SliderTarget::DisplacementScale,
    },
    Slider {
        name: "Noise Scale",
        min: 0.0,
        max: 20.0,
        step: 0.001,
        target: SliderTarget::NoiseScale,
    },
    Slider {
        name: "Step",
        min: 0.0,
        max: 1.0,
        step: 0.001,
        target: SliderTarget::Step,
    },
    Slider {
        name: "Velocity",
        min: 0.5,
        max: 10.0,
        step: 0.001,
        target: SliderTarget::Velocity,
    },
];

pub static CONTROLS: [Control; 6] = [
    Control::Slider(SliderTarget::DisplacementScale),
    Control::Slider(SliderTarget::NoiseScale),
    Control::Slider(SliderTarget::Step),
    Control::Slider(SliderTarget::Velocity),
    Control::ColourPicker {
        name: "Color Start",
        target: ColourTarget::Start,
    },
    Control::ColourPicker {
        name: "Color End",
        target: ColourTarget::End,
    },
];

/// Keyboard input the panel understands, already decoded from window events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelKey {
    NextControl,
    Increase { coarse: bool },
    Decrease { coarse: bool },
    NextChannel,
    PreviousChannel,
}

#[derive(Debug, Clone)]
pub struct ParameterPanel {
    selected: usize,
    channel: usize,
    /// sRGB bytes of the start and end colour, as the pickers show them.
    colours: [[u8; 3]; 2],
}

impl ParameterPanel {
    pub fn new(config: &PortalConfig) -> Result<Self, ViewerError> {
        Ok(Self {
            selected: 0,
            channel: 0,
            colours: [
                parse_hex_colour(&config.colour_start)?,
                parse_hex_colour(&config.colour_end)?,
            ],
        })
    }

    pub fn controls(&self) -> &'static [Control] {
        &CONTROLS
    }

    pub fn selected(&self) -> &'static Control {
        &CONTROLS[self.selected]
    }

    pub fn slider(target: SliderTarget) -> &'static Slider {
        &SLIDERS[target as usize]
    }

    pub fn value(target: SliderTarget, uniform: &PortalUniform) -> f32 {
        match target {
            SliderTarget::DisplacementScale => uniform.displacement_scale,
            SliderTarget::NoiseScale => uniform.noise_scale,
            SliderTarget::Step => uniform.step,
            SliderTarget::Velocity => uniform.velocity,
        }
    }

    /// Writes `value`, constrained to the slider's range and step, and returns
    /// what was written.
    pub fn set_slider(&self, target: SliderTarget, value: f32, uniform: &mut PortalUniform) -> f32 {
        let value = Self::slider(target).constrain(value);
        let field = match target {
            SliderTarget::DisplacementScale => &mut uniform.displacement_scale,
            SliderTarget::NoiseScale => &mut uniform.noise_scale,
            SliderTarget::Step => &mut uniform.step,
            SliderTarget::Velocity => &mut uniform.velocity,
        };
        *field = value;
        value
    }

    pub fn colour_hex(&self, target: ColourTarget) -> String {
        format_hex_colour(self.colours[target as usize])
    }

    pub fn set_colour(
        &mut self,
        target: ColourTarget,
        hex: &str,
        uniform: &mut PortalUniform,
    ) -> Result<(), ViewerError> {
        self.colours[target as usize] = parse_hex_colour(hex)?;
        self.write_colour(target, uniform);
        Ok(())
    }

    fn write_colour(&self, target: ColourTarget, uniform: &mut PortalUniform) {
        let linear = self.colours[target as usize].map(srgb_to_linear);
        match target {
            ColourTarget::Start => uniform.colour_start = linear,
            ColourTarget::End => uniform.colour_end = linear,
        }
    }

    /// Applies one key press. Returns whether a uniform changed.
    pub fn handle_key(&mut self, key: PanelKey, uniform: &mut PortalUniform) -> bool {
        match (key, *self.selected()) {
            (PanelKey::NextControl, _) => {
                self.selected = (self.selected + 1) % CONTROLS.len();
                self.channel = 0;
                log::info!("Selected {}", self.selected().name());
                false
            }
            (PanelKey::Increase { coarse } | PanelKey::Decrease { coarse }, Control::Slider(target)) => {
                let slider = Self::slider(target);
                let sign = if matches!(key, PanelKey::Increase { .. }) { 1.0 } else { -1.0 };
                let amount = if coarse { slider.step * 100.0 } else { slider.step };
                let old = Self::value(slider.target, uniform);
                let new = self.set_slider(slider.target, old + sign * amount, uniform);
                log::info!("{} = {:.3}", slider.name, new);
                new != old
            }
            (PanelKey::Increase { .. } | PanelKey::Decrease { .. }, Control::ColourPicker { name, target }) => {
                let channel = &mut self.colours[target as usize][self.channel];
                let old = *channel;
                *channel = if matches!(key, PanelKey::Increase { .. }) {
                    old.saturating_add(1)
                } else {
                    old.saturating_sub(1)
                };
                if *channel == old {
                    return false;
                }
                self.write_colour(target, uniform);
                log::info!("{} = {}", name, self.colour_hex(target));
                true
            }
            (PanelKey::NextChannel, Control::ColourPicker { .. }) => {
                self.channel = (self.channel + 1) % 3;
                false
            }
            (PanelKey::PreviousChannel, Control::ColourPicker { .. }) => {
                self.channel = (self.channel + 2) % 3;
                false
            }
            (PanelKey::NextChannel | PanelKey::PreviousChannel, Control::Slider(_)) => false,
        }
    }
}
