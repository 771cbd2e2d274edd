// Copyright (c) 2024 Mike Tsao

//! The song graph that machines live in. [Setup] owns the machines, the
//! [Wire]s between them, and the [Pipeline](crate::unit::Pipeline) that
//! carries their audio. Machines reach back into it only through
//! [GraphHost].

/// The most commonly used imports.
pub mod prelude {
    pub use super::{GraphHost, MachineEvent, Setup, Wire, WireEnd};
}

pub use {
    setup::{Setup, SetupHost},
    traits::{GraphHost, MachineEvent, WireEnd},
    wires::{Wire, WireRepository},
};

mod setup;
mod traits;
mod wires;
