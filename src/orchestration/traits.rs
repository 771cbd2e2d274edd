// Copyright (c) 2024 Mike Tsao

use crate::{
    machine::MachineState,
    types::{MachineId, PadId, PatternUid},
    unit::Pipeline,
};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Which end of a machine a wire attaches to.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum WireEnd {
    /// The wire feeds the machine.
    Input,
    /// The machine feeds the wire.
    Output,
}

/// Things that happened to a machine that the rest of the song might care
/// about.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MachineEvent {
    #[allow(missing_docs)]
    PatternAdded {
        machine: MachineId,
        pattern: PatternUid,
    },
    #[allow(missing_docs)]
    PatternRemoved {
        machine: MachineId,
        pattern: PatternUid,
    },
    #[allow(missing_docs)]
    StateChanged {
        machine: MachineId,
        state: MachineState,
    },
    #[allow(missing_docs)]
    VoicesChanged { machine: MachineId, voices: usize },
}

/// What a machine needs from the song graph that owns it.
///
/// Machines never hold on to the graph. Each operation that reaches outside
/// the machine gets the host passed in for the duration of the call.
pub trait GraphHost {
    /// The media runtime.
    fn pipeline(&self) -> &dyn Pipeline;

    #[allow(missing_docs)]
    fn pipeline_mut(&mut self) -> &mut dyn Pipeline;

    /// Asks the wire that was linked to `peer` on the given end of `machine`
    /// to link to `pad` instead. The caller has already unlinked the old
    /// connection.
    fn reconnect_wire(
        &mut self,
        machine: &MachineId,
        end: WireEnd,
        peer: PadId,
        pad: PadId,
    ) -> anyhow::Result<()>;

    /// Tells the owner of a pattern that it needs storage for this many
    /// voices.
    fn resize_pattern_voices(&mut self, pattern: PatternUid, voices: usize);

    /// Delivers an event to whoever listens to the song.
    fn notify(&mut self, event: MachineEvent);

    /// Records that the song has changed since it was last saved.
    fn mark_unsaved(&mut self);
}
