// Copyright (c) 2024 Mike Tsao

//! Common data types used throughout the system.

/// The most commonly used imports.
pub mod prelude {
    pub use super::{
        Caps, ControlUid, ElementId, MachineId, PadId, ParamValue, PatternUid, SampleFormat,
        SongTempo, Timestamp, UidFactory, ValueType, WireUid,
    };
}

pub use {
    caps::{Caps, SampleFormat},
    time::{SongTempo, Timestamp},
    uid::{
        ControlUid, ControlUidFactory, ElementId, IsUid, MachineId, PadId, PatternUid,
        UidFactory, WireUid,
    },
    values::{ParamValue, ValueType},
};

mod caps;
mod time;
mod uid;
mod values;
