// Copyright (c) 2024 Mike Tsao

use super::{MachineKind, MachineState, Slot};
use crate::{
    params::ParamScope,
    types::{MachineId, ValueType},
    unit::{PadCounts, PipelineError},
};
use thiserror::Error;

/// Why a machine couldn't be built. A machine that fails construction doesn't
/// exist; nothing of it is left in the pipeline.
#[derive(Debug, Error)]
pub enum ConstructionError {
    #[allow(missing_docs)]
    #[error("no unit named '{0}' is registered")]
    UnknownUnit(String),
    #[allow(missing_docs)]
    #[error("a {kind} machine can't hold unit '{plugin_name}' ({} src, {} sink pads)", .pads.src, .pads.sink)]
    TypeMismatch {
        kind: MachineKind,
        plugin_name: String,
        pads: PadCounts,
    },
    #[allow(missing_docs)]
    #[error("a machine named '{0}' already exists")]
    DuplicateId(MachineId),
    #[allow(missing_docs)]
    #[error("pipeline refused the unit: {0}")]
    Pipeline(#[from] PipelineError),
}

/// Why the internal chain couldn't be changed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TopologyError {
    /// Input slots make no sense on sources, nor output slots on sinks.
    #[error("slot {slot} doesn't apply to a {kind} machine")]
    NotApplicable {
        #[allow(missing_docs)]
        slot: Slot,
        #[allow(missing_docs)]
        kind: MachineKind,
    },
    /// The pipeline couldn't create the slot's element.
    #[error("couldn't create element for slot {slot}: {source}")]
    ElementCreation {
        #[allow(missing_docs)]
        slot: Slot,
        #[allow(missing_docs)]
        source: PipelineError,
    },
    /// A link failed. The previous chain was restored.
    #[error("couldn't splice slot {slot}: {reason}")]
    LinkFailed {
        #[allow(missing_docs)]
        slot: Slot,
        #[allow(missing_docs)]
        reason: String,
    },
    /// The slot had no present neighbor to splice against. The machine has
    /// lost its unit, which can't happen to a machine built by
    /// [Machine::new()](super::Machine::new()).
    #[error("slot {slot} has no neighbors to splice against")]
    BrokenChain {
        #[allow(missing_docs)]
        slot: Slot,
    },
    /// A link failed and restoring the previous chain failed as well. The
    /// machine's chain is now broken.
    #[error("chain left inconsistent while splicing slot {slot}: {reason}")]
    Inconsistent {
        #[allow(missing_docs)]
        slot: Slot,
        #[allow(missing_docs)]
        reason: String,
    },
}
impl TopologyError {
    /// Whether the chain may now violate the single-path rule.
    pub fn is_inconsistent(&self) -> bool {
        matches!(self, TopologyError::Inconsistent { .. })
    }
}

/// A reference to a parameter that doesn't hold up.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParamError {
    #[allow(missing_docs)]
    #[error("no parameter named '{name}' in {scope:?} scope")]
    UnknownName { scope: ParamScope, name: String },
    #[allow(missing_docs)]
    #[error("parameter index {index} is out of range (have {count})")]
    IndexOutOfRange { index: usize, count: usize },
    #[allow(missing_docs)]
    #[error("voice {voice} is out of range (have {voices})")]
    VoiceOutOfRange { voice: usize, voices: usize },
    #[allow(missing_docs)]
    #[error("parameter '{name}' expects {expected}, got {actual}")]
    TypeMismatch {
        name: String,
        expected: ValueType,
        actual: ValueType,
    },
    #[allow(missing_docs)]
    #[error("unit refused value for '{name}': {reason}")]
    Rejected { name: String, reason: String },
}

/// A playback-state change that was refused or only partly carried out.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StateError {
    #[allow(missing_docs)]
    #[error("{state} isn't allowed for {kind} machine {id}")]
    NotAllowed {
        id: MachineId,
        kind: MachineKind,
        state: MachineState,
    },
    /// The state was recorded, but muting or unmuting something failed along
    /// the way.
    #[error("machine {id} entered {state}, but some muting failed")]
    Incomplete {
        #[allow(missing_docs)]
        id: MachineId,
        #[allow(missing_docs)]
        state: MachineState,
    },
}

/// Everything a machine operation can report.
#[derive(Debug, Error)]
pub enum MachineError {
    #[allow(missing_docs)]
    #[error(transparent)]
    Construction(#[from] ConstructionError),
    #[allow(missing_docs)]
    #[error(transparent)]
    Topology(#[from] TopologyError),
    #[allow(missing_docs)]
    #[error(transparent)]
    Param(#[from] ParamError),
    #[allow(missing_docs)]
    #[error(transparent)]
    State(#[from] StateError),
}
