//! Runtime settings for the input pipeline.
//!
//! Settings load from a TOML file; every field has a default so a partial
//! or missing file is never fatal. Loaders log and fall back rather than
//! abort, since bad input configuration should not take the frontend down.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::binds::BindId;
use crate::error::{AxonError, Result};

/// How the turbo modulator interprets the turbo-enable bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurboMode {
    /// Buttons held together with turbo-enable become turbo buttons.
    Classic,
    /// Turbo-enable tags the configured default bind; tagging toggles.
    SingleButton,
    /// Like `SingleButton`, but firing only while turbo-enable is held.
    SingleButtonHold,
}

/// How an analog stick may stand in for the digital d-pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalogDpadMode {
    /// Sticks never drive the d-pad.
    None,
    /// Left stick drives the d-pad unless the core reads it as analog.
    LeftStick,
    /// Right stick drives the d-pad unless the core reads it as analog.
    RightStick,
    /// Left stick always drives the d-pad.
    LeftStickForced,
    /// Right stick always drives the d-pad.
    RightStickForced,
}

impl AnalogDpadMode {
    /// Stick index feeding the d-pad, if any.
    pub fn stick(self) -> Option<u32> {
        match self {
            AnalogDpadMode::None => None,
            AnalogDpadMode::LeftStick | AnalogDpadMode::LeftStickForced => Some(0),
            AnalogDpadMode::RightStick | AnalogDpadMode::RightStickForced => Some(1),
        }
    }

    /// Whether the mapping stays active even while the core reads the stick.
    pub fn forced(self) -> bool {
        matches!(
            self,
            AnalogDpadMode::LeftStickForced | AnalogDpadMode::RightStickForced
        )
    }
}

/// Turbo modulator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TurboSettings {
    /// Pulse period in frames.
    pub period: u32,
    /// Frames of the period spent pressed.
    pub duty_cycle: u32,
    pub mode: TurboMode,
    /// Bind tagged by the single-button modes.
    pub default_bind: Option<BindId>,
}

impl Default for TurboSettings {
    fn default() -> Self {
        Self {
            period: 6,
            duty_cycle: 3,
            mode: TurboMode::Classic,
            default_bind: Some(BindId::B),
        }
    }
}

/// Overlay touch processor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlaySettings {
    /// Eight-way diagonal width for dpad areas, in percent. 100 gives equal
    /// sectors; 0 degenerates to four-way.
    pub dpad_diagonal_sensitivity: u32,
    /// Eight-way diagonal width for face-button areas, in percent.
    pub abxy_diagonal_sensitivity: u32,
    /// Multiplier applied to an element's reach while it stays held.
    pub range_mod: f32,
    /// Scale factor overlays are rendered and hit-tested at.
    pub scale: f32,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            dpad_diagonal_sensitivity: 100,
            abxy_diagonal_sensitivity: 100,
            range_mod: 1.5,
            scale: 1.0,
        }
    }
}

/// Movie record/replay configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MovieSettings {
    /// Seconds between automatic checkpoints while recording. 0 disables.
    pub checkpoint_interval_secs: u32,
    /// Frames of position history kept for rewind. Must be a power of two.
    pub frame_window: usize,
}

impl Default for MovieSettings {
    fn default() -> Self {
        Self { checkpoint_interval_secs: 0, frame_window: 1024 }
    }
}

/// Top-level input settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSettings {
    /// Analog deadzone as a fraction of full scale, `0.0..=1.0`.
    pub axis_deadzone: f32,
    /// Analog sensitivity multiplier applied after deadzone scaling.
    pub axis_sensitivity: f32,
    /// Fraction of full scale past which an axis counts as a digital press.
    pub axis_threshold: f32,
    /// Number of logical ports examined per frame.
    pub max_users: usize,
    /// Frames a device keeps blocking the other device's binds after its
    /// hotkey-enable is released.
    pub hotkey_block_delay: u8,
    pub turbo: TurboSettings,
    pub overlay: OverlaySettings,
    pub movie: MovieSettings,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            axis_deadzone: 0.0,
            axis_sensitivity: 1.0,
            axis_threshold: 0.5,
            max_users: crate::MAX_PORTS,
            hotkey_block_delay: 5,
            turbo: TurboSettings::default(),
            overlay: OverlaySettings::default(),
            movie: MovieSettings::default(),
        }
    }
}

impl InputSettings {
    /// Parse settings from TOML text.
    pub fn from_toml(text: &str) -> Result<InputSettings> {
        toml::from_str(text).map_err(|e| AxonError::Config(format!("input settings: {e}")))
    }

    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> Result<InputSettings> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Load settings, logging and falling back to defaults on any failure.
    pub fn load_or_default(path: &Path) -> InputSettings {
        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("input settings {}: {e}, using defaults", path.display());
                InputSettings::default()
            }
        }
    }

    /// Serialize to TOML text.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| AxonError::Config(format!("input settings: {e}")))
    }
}
