// Copyright (c) 2024 Mike Tsao

use super::{Machine, ParamControl};
use crate::{
    orchestration::{GraphHost, MachineEvent},
    params::{discover_global_parameters, discover_unit_voice_parameters, ParamScope},
};

impl Machine {
    /// Grows or shrinks the number of voices. Removed voices lose their
    /// automation and interaction bindings; new voices start out with
    /// neither. Every pattern referring to this machine is resized too.
    pub fn set_voice_count(&mut self, host: &mut dyn GraphHost, count: usize) {
        let Some(polyphonic) = self.unit.as_polyphonic_mut() else {
            log::warn!("{}: not polyphonic; can't set voices to {count}", self.id);
            return;
        };
        if count == self.voices {
            return;
        }
        polyphonic.set_voice_count(count);
        let count = polyphonic.voice_count();
        let old_count = self.voices;

        if count < old_count {
            for controls in self.voice_controls.drain(count..) {
                for uid in controls.into_iter().filter_map(|c| c.curve) {
                    self.automator.remove_curve(uid);
                }
            }
            self.bindings
                .retain(|(scope, _), _| !matches!(scope, ParamScope::Voice(v) if *v >= count));
        } else {
            if self.voice_params.is_empty() {
                self.voice_params = discover_unit_voice_parameters(self.unit.as_ref());
                log::debug!(
                    "{}: discovered {} voice parameters",
                    self.id,
                    self.voice_params.len()
                );
                self.rediscover_global_params();
            }
            let fresh = vec![ParamControl::default(); self.voice_params.len()];
            self.voice_controls.resize(count, fresh);
        }
        self.voices = count;
        log::debug!("{}: voices {old_count} -> {count}", self.id);

        for pattern in self.patterns.iter() {
            host.resize_pattern_voices(pattern.uid, count);
        }
        host.mark_unsaved();
        host.notify(MachineEvent::VoicesChanged {
            machine: self.id.clone(),
            voices: count,
        });
    }

    /// Rebuilds the global parameter list once voices exist to shadow it.
    /// Globals that a voice parameter now shadows lose their automation and
    /// bindings; the rest keep theirs under their new index.
    fn rediscover_global_params(&mut self) {
        let global_params = discover_global_parameters(self.unit.as_ref());
        let global_controls = global_params
            .iter()
            .map(|p| {
                self.global_params
                    .iter()
                    .position(|old| old.name() == p.name())
                    .and_then(|index| self.global_controls.get(index).copied())
                    .unwrap_or_default()
            })
            .collect();
        for (old, control) in self.global_params.iter().zip(self.global_controls.iter()) {
            if global_params.iter().any(|p| p.name() == old.name()) {
                continue;
            }
            log::debug!("{}: '{}' is now a voice parameter", self.id, old.name());
            if let Some(uid) = control.curve {
                self.automator.remove_curve(uid);
            }
        }
        self.global_params = global_params;
        self.global_controls = global_controls;
        self.retarget_global_bindings();
    }
}
