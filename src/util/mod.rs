// Copyright (c) 2024 Mike Tsao

//! System utilities.

/// Commonly used imports.
pub mod prelude {
    pub use super::{MachineSettings, Rng};
}

pub use rng::Rng;
pub use settings::MachineSettings;

mod rng;
mod settings;
