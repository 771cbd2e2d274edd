// Copyright (c) 2024 Mike Tsao

use super::Parameter;
use crate::unit::{Parameterized, Unit};
use rustc_hash::FxHashSet;

/// Classifies every controllable property of one voice.
pub fn discover_voice_parameters(voice: &dyn Parameterized) -> Vec<Parameter> {
    voice
        .param_specs()
        .iter()
        .filter(|spec| spec.controllable)
        .filter_map(Parameter::new_from_spec)
        .collect()
}

/// Classifies every controllable property of the unit itself. A property that
/// the unit's voices also declare is left out; the per-voice copy is the one
/// that gets automated.
pub fn discover_global_parameters(unit: &dyn Unit) -> Vec<Parameter> {
    let voice_names: FxHashSet<String> = if let Some(polyphonic) = unit.as_polyphonic() {
        if let Some(voice) = polyphonic.voice(0) {
            voice
                .param_specs()
                .iter()
                .filter(|spec| spec.controllable)
                .map(|spec| spec.name.clone())
                .collect()
        } else {
            log::warn!("polyphonic unit has no voices to inspect");
            Default::default()
        }
    } else {
        Default::default()
    };

    unit.param_specs()
        .iter()
        .filter(|spec| spec.controllable && !voice_names.contains(&spec.name))
        .filter_map(Parameter::new_from_spec)
        .collect()
}

/// Discovers voice parameters from the first voice of a polyphonic unit.
/// Units that aren't polyphonic, or have no voices yet, have none.
pub fn discover_unit_voice_parameters(unit: &dyn Unit) -> Vec<Parameter> {
    unit.as_polyphonic()
        .and_then(|polyphonic| polyphonic.voice(0))
        .map(discover_voice_parameters)
        .unwrap_or_default()
}
