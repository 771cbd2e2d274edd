// Copyright (c) 2024 Mike Tsao

//! Support for changing parameters over time in a reproducible way.
//!
//! Each automated parameter gets a [ControlCurve]: a set of time-stamped
//! values plus a rule for what happens between them. Triggers, such as a
//! note-on, use [InterpolationMode::Trigger], so they fire only at their
//! points. State parameters hold their value (or ramp, if configured) until
//! the next point.
//!
//! A machine's [Automator] owns all its curves. The machine keeps only the
//! [ControlUid](crate::types::ControlUid) handle for each automated
//! parameter.

/// The most commonly used imports.
pub mod prelude {
    pub use super::{Automator, ControlCurve, ControlCurveBuilder, InterpolationMode};
}

pub use automator::Automator;
pub use curve::{ControlCurve, ControlCurveBuilder, InterpolationMode};

mod automator;
mod curve;
