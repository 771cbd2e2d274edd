// Copyright (c) 2024 Mike Tsao

//! A [Machine] is one node of the song graph: a wrapped [Unit](crate::unit::Unit)
//! plus everything the sequencer needs to drive it.
//!
//! - The unit's parameters, split into global and per-voice sets.
//! - A chain of auxiliary [Slot]s (mixer, level meters, gain, fan-out) that
//!   are created only when first needed.
//! - Automation curves for any parameter, with a synthetic start-of-song value
//!   so that playback from the top is reproducible.
//! - Bindings from external controllers to parameters.
//! - A playback [MachineState].

/// The most commonly used imports.
pub mod prelude {
    pub use super::{
        BindingInfo, Machine, MachineData, MachineError, MachineKind, MachineParams,
        MachineParamsBuilder, MachineState, PatternInfo, Slot,
    };
}

pub use errors::{ConstructionError, MachineError, ParamError, StateError, TopologyError};
pub use interaction::{BindingInfo, InteractionControl, InteractionRegistry};
pub use node::{Machine, MachineKind, MachineParams, MachineParamsBuilder, ParamDetails};
pub use patterns::PatternInfo;
pub use persistence::{GlobalValue, MachineData, VoiceValue};
pub use state::MachineState;
pub use topology::Slot;

pub(crate) use node::ParamControl;
pub(crate) use topology::SlotElement;

mod controls;
mod errors;
mod interaction;
mod node;
mod patterns;
mod persistence;
mod state;
mod topology;
mod voices;
