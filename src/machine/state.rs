// Copyright (c) 2024 Mike Tsao

use super::{Machine, MachineKind, StateError};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

/// A machine's playback state.
#[derive(
    Clone, Copy, Debug, Default, Display, EnumIter, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum MachineState {
    /// Plays normally.
    #[default]
    Normal,
    /// Plays silently.
    Mute,
    /// The only source that is heard.
    Solo,
    /// Passes its input through untouched.
    Bypass,
}

impl Machine {
    #[allow(missing_docs)]
    pub fn state(&self) -> MachineState {
        self.state
    }

    /// Records a state without applying any of its effects. The song graph
    /// calls this after it has done the muting, unmuting, and passthrough
    /// work that the transition needs.
    pub(crate) fn record_state(&mut self, state: MachineState) {
        self.state = state;
    }

    /// Whether the machine's kind permits the state. Bypass needs both an
    /// input and an output; soloing a sink makes no sense.
    pub fn check_state_allowed(&self, state: MachineState) -> Result<(), StateError> {
        let allowed = match state {
            MachineState::Normal | MachineState::Mute => true,
            MachineState::Solo => self.kind != MachineKind::Sink,
            MachineState::Bypass => self.kind == MachineKind::Processor,
        };
        if allowed {
            Ok(())
        } else {
            Err(StateError::NotAllowed {
                id: self.id.clone(),
                kind: self.kind,
                state,
            })
        }
    }

    /// Engages or releases the unit's passthrough. Units without it keep
    /// processing normally.
    pub fn set_bypass(&mut self, is_bypassed: bool) {
        match self.unit.as_passthrough_mut() {
            Some(passthrough) => passthrough.set_passthrough(is_bypassed),
            None => {
                if is_bypassed {
                    log::info!("{}: unit has no passthrough; bypass has no effect", self.id);
                }
            }
        }
    }

    /// Whether the unit is passing its input through.
    pub fn is_bypassed(&self) -> bool {
        self.unit
            .as_passthrough()
            .is_some_and(|p| p.is_passthrough())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_machine, TestEffect, TestHost, TestSink, TestSynth};

    #[test]
    fn state_rules_follow_machine_kind() {
        let mut host = TestHost::default();
        let source = test_machine(&mut host, "s", TestSynth::UNIT_KEY, MachineKind::Source, 1);
        let effect = test_machine(&mut host, "e", TestEffect::UNIT_KEY, MachineKind::Processor, 0);
        let sink = test_machine(&mut host, "m", TestSink::UNIT_KEY, MachineKind::Sink, 0);

        assert!(source.check_state_allowed(MachineState::Solo).is_ok());
        assert!(source.check_state_allowed(MachineState::Bypass).is_err());
        assert!(effect.check_state_allowed(MachineState::Bypass).is_ok());
        assert!(effect.check_state_allowed(MachineState::Solo).is_ok());
        assert_eq!(
            sink.check_state_allowed(MachineState::Solo),
            Err(StateError::NotAllowed {
                id: sink.id().clone(),
                kind: MachineKind::Sink,
                state: MachineState::Solo
            })
        );
        assert!(sink.check_state_allowed(MachineState::Mute).is_ok());
        assert_eq!(source.state(), MachineState::Normal);
    }

    #[test]
    fn bypass_uses_passthrough_when_available() {
        let mut host = TestHost::default();
        let mut effect =
            test_machine(&mut host, "e", TestEffect::UNIT_KEY, MachineKind::Processor, 0);
        effect.set_bypass(true);
        assert!(effect.is_bypassed());
        effect.set_bypass(false);
        assert!(!effect.is_bypassed());

        let mut picky = test_machine(
            &mut host,
            "p",
            TestEffect::INT_UNIT_KEY,
            MachineKind::Processor,
            0,
        );
        picky.set_bypass(true);
        assert!(!picky.is_bypassed(), "no passthrough means no bypass");
    }

    #[test]
    fn capability_queries_need_only_shared_access() {
        let mut host = TestHost::default();
        let mut effect =
            test_machine(&mut host, "e", TestEffect::UNIT_KEY, MachineKind::Processor, 0);
        effect.set_bypass(true);
        let synth = test_machine(&mut host, "s", TestSynth::UNIT_KEY, MachineKind::Source, 1);

        let (effect, synth): (&Machine, &Machine) = (&effect, &synth);
        assert!(effect.is_bypassed());
        assert!(!effect.is_tempo_aware());
        assert!(synth.is_tempo_aware());
        assert!(!synth.is_bypassed());
    }
}
