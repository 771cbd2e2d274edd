// Copyright (c) 2024 Mike Tsao

//! Structs that hold configuration information about various parts of the
//! system. Intended to be serialized.

use crate::{automation::InterpolationMode, traits::HasSettings, types::Caps};
use derivative::Derivative;
use serde::{Deserialize, Serialize};

/// Knobs that affect how every machine builds its auxiliary elements and
/// automates its parameters.
#[derive(Clone, Debug, Derivative, Serialize, Deserialize)]
#[derivative(Default, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct MachineSettings {
    /// How often level meters report, in milliseconds.
    #[derivative(Default(value = "100"))]
    level_interval_ms: u32,
    /// How long a level meter holds a peak before letting it fall.
    #[derivative(Default(value = "200"))]
    peak_ttl_ms: u32,
    /// How fast a held peak falls, in dB per second.
    #[derivative(Default(value = "50.0"))]
    peak_falloff: f64,

    /// The format adders mix in.
    #[derivative(Default(value = "Caps::canonical_mixer()"))]
    mixer_caps: Caps,
    /// Whether non-sink adders skip dithering when converting to the mixer
    /// format.
    #[derivative(Default(value = "true"))]
    disable_dithering: bool,

    /// How automated state parameters move between points.
    state_interpolation: InterpolationMode,

    #[serde(skip)]
    #[derivative(PartialEq = "ignore")]
    has_been_saved: bool,
}
impl HasSettings for MachineSettings {
    fn has_been_saved(&self) -> bool {
        self.has_been_saved
    }

    fn needs_save(&mut self) {
        self.has_been_saved = false;
    }

    fn mark_clean(&mut self) {
        self.has_been_saved = true;
    }
}
#[allow(missing_docs)]
impl MachineSettings {
    pub fn level_interval_ms(&self) -> u32 {
        self.level_interval_ms
    }

    pub fn peak_ttl_ms(&self) -> u32 {
        self.peak_ttl_ms
    }

    pub fn peak_falloff(&self) -> f64 {
        self.peak_falloff
    }

    pub fn mixer_caps(&self) -> &Caps {
        &self.mixer_caps
    }

    pub fn should_disable_dithering(&self) -> bool {
        self.disable_dithering
    }

    pub fn state_interpolation(&self) -> InterpolationMode {
        self.state_interpolation
    }

    /// Updates the field and marks the struct eligible to save.
    pub fn set_level_meter_timing(&mut self, interval_ms: u32, peak_ttl_ms: u32, falloff: f64) {
        if (interval_ms, peak_ttl_ms) != (self.level_interval_ms, self.peak_ttl_ms)
            || falloff != self.peak_falloff
        {
            self.level_interval_ms = interval_ms;
            self.peak_ttl_ms = peak_ttl_ms;
            self.peak_falloff = falloff;
            self.needs_save();
        }
    }

    /// Updates the field and marks the struct eligible to save.
    pub fn set_mixer_caps(&mut self, caps: Caps) {
        if caps != self.mixer_caps {
            self.mixer_caps = caps;
            self.needs_save();
        }
    }

    /// Updates the field and marks the struct eligible to save.
    pub fn set_disable_dithering(&mut self, disable: bool) {
        if disable != self.disable_dithering {
            self.disable_dithering = disable;
            self.needs_save();
        }
    }

    /// Updates the field and marks the struct eligible to save.
    pub fn set_state_interpolation(&mut self, mode: InterpolationMode) {
        if mode != self.state_interpolation {
            self.state_interpolation = mode;
            self.needs_save();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_dirty_tracking() {
        let mut s = MachineSettings::default();
        assert_eq!(s.level_interval_ms(), 100);
        assert_eq!(s.peak_ttl_ms(), 200);
        assert!(s.should_disable_dithering());
        assert_eq!(s.state_interpolation(), InterpolationMode::None);
        assert_eq!(s.mixer_caps(), &Caps::canonical_mixer());

        s.mark_clean();
        s.set_state_interpolation(InterpolationMode::None);
        assert!(s.has_been_saved(), "setting the same value isn't a change");
        s.set_state_interpolation(InterpolationMode::Linear);
        assert!(!s.has_been_saved());
    }

    #[test]
    fn missing_fields_take_defaults() {
        let s: MachineSettings = serde_json::from_str(r#"{"peak-ttl-ms": 350}"#).unwrap();
        assert_eq!(s.peak_ttl_ms(), 350);
        assert_eq!(s.level_interval_ms(), 100);
        assert!(s.should_disable_dithering());
    }
}
