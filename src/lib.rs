// Copyright (c) 2024 Mike Tsao

#![deny(missing_docs, unused_imports, unused_variables)]
#![allow(rustdoc::private_intra_doc_links)]

//! Ensnare Machines models the nodes of a tracker-style sequencer's song
//! graph.
//!
//! A [Machine] wraps a signal-processing [Unit](unit::Unit) and takes care of
//! everything around it.
//!
//! * *Parameters*: the unit's properties become global and per-voice
//!   [Parameter](params::Parameter)s, each a trigger or a state value.
//! * *Topology*: auxiliary elements (mixers, meters, gain, fan-out) are
//!   spliced into the machine's chain the first time they're needed, and a
//!   failed splice rolls back.
//! * *Automation*: any parameter can follow a
//!   [ControlCurve](automation::ControlCurve), which always has a value at
//!   time zero so that playback from the top is reproducible.
//! * *Interaction*: knobs and faders on external controllers can be bound to
//!   parameters.
//! * *State*: machines can be muted, soloed, or bypassed.
//!
//! [Setup] ties machines together into a song, wiring them through a
//! [Pipeline](unit::Pipeline) that you provide.

/// A collection of imports that are useful to users of this crate. `use
/// ensnare_machines::prelude::*;` for easier onboarding.
pub mod prelude {
    pub use super::{
        automation::prelude::*, machine::prelude::*, orchestration::prelude::*,
        params::prelude::*, traits::prelude::*, types::prelude::*, unit::prelude::*,
        util::prelude::*,
    };
}

// Fundamental structures that are important enough to re-export at top level.
pub use {machine::Machine, orchestration::Setup};

pub mod automation;
pub mod machine;
pub mod orchestration;
pub mod params;
pub mod testing;
pub mod traits;
pub mod types;
pub mod unit;
pub mod util;
