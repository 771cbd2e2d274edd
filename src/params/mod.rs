// Copyright (c) 2024 Mike Tsao

//! The parameter registry. Turns a unit's declared properties into
//! [Parameter]s, each classified as a trigger or as state, with bounds and a
//! no-value.

/// The most commonly used imports.
pub mod prelude {
    pub use super::{ParamFlags, ParamRef, ParamScope, Parameter};
}

pub use parameter::{ParamFlags, ParamRef, ParamScope, Parameter};
pub use registry::{
    discover_global_parameters, discover_unit_voice_parameters, discover_voice_parameters,
};

mod parameter;
mod registry;
