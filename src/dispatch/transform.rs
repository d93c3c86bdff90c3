//! Value transforms applied between a matched event and its effector call

use serde::{Deserialize, Serialize};

use super::binding::ActionKind;
use super::normalize::MAX_VALUE;

/// Multipliers at or below this are treated as silence in decibel mode
pub const SILENCE_EPSILON: f32 = 1e-4;

/// Decibel value sent for silence (OBS's fader floor)
pub const SILENCE_DB: f32 = -100.0;

/// How OBS volume values are expressed on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeMode {
    #[default]
    Multiplier,
    Decibel,
}

/// A source volume in the representation the streaming tool expects
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SourceVolume {
    /// Linear amplitude, 0.0-1.0
    Multiplier(f32),
    /// Gain in dB, [`SILENCE_DB`]-0.0
    Decibel(f32),
}

/// Transformed value handed to an effector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActionValue {
    /// Linear 0.0-1.0
    Fraction(f32),
    Volume(SourceVolume),
    /// Fire once
    Trigger,
}

/// `value / 127`, clamped to [0, 1]
pub fn linear_fraction(value: u8) -> f32 {
    (value as f32 / MAX_VALUE as f32).clamp(0.0, 1.0)
}

/// Perceptual fader curve: `fraction^3`
pub fn cubic_taper(fraction: f32) -> f32 {
    let f = fraction.clamp(0.0, 1.0);
    f * f * f
}

/// `20·log10(multiplier)`, with silence mapped to [`SILENCE_DB`] and the
/// result capped at 0 dB
pub fn multiplier_to_db(multiplier: f32) -> f32 {
    if multiplier <= SILENCE_EPSILON {
        return SILENCE_DB;
    }
    (20.0 * multiplier.log10()).min(0.0)
}

/// Press detection for discrete actions; releases (value 0) are inert
pub fn is_triggered(value: u8) -> bool {
    value > 0
}

/// OBS volume for a 7-bit fader value
pub fn source_volume(value: u8, mode: VolumeMode) -> SourceVolume {
    let multiplier = cubic_taper(linear_fraction(value));
    match mode {
        VolumeMode::Multiplier => SourceVolume::Multiplier(multiplier),
        VolumeMode::Decibel => SourceVolume::Decibel(multiplier_to_db(multiplier)),
    }
}

impl ActionKind {
    /// Value transform for this kind; `None` means the event is inert
    pub fn transform(self, value: u8, mode: VolumeMode) -> Option<ActionValue> {
        match self {
            ActionKind::SystemVolume => Some(ActionValue::Fraction(linear_fraction(value))),
            ActionKind::ObsVolume => Some(ActionValue::Volume(source_volume(value, mode))),
            _ if is_triggered(value) => Some(ActionValue::Trigger),
            _ => None,
        }
    }
}
