// Copyright (c) 2024 Mike Tsao

//! Units are the signal processors that machines wrap: synthesizers, effects,
//! and sinks. This crate never looks inside them. It sees only the
//! capabilities described here.
//!
//! Every unit is [Parameterized]. Beyond that, a unit may or may not be
//! [Polyphonic], [TempoAware], capable of [Passthrough], or able to describe
//! its values in words ([DescribesValues]). Callers ask with the `as_*()`
//! methods and must handle the answer being None.

/// The most commonly used imports.
pub mod prelude {
    pub use super::{
        DescribesValues, EnumValue, PadCounts, PadDirection, ParamKind, ParamSpec,
        ParamSpecBuilder, Parameterized, Passthrough, Pipeline, PipelineError, Polyphonic,
        PropertyMeta, TempoAware, Unit, UnitFactory, UnitKey,
    };
}

pub use factory::{UnitFactory, UnitFactoryFn, UnitKey};
pub use param_spec::{EnumValue, ParamKind, ParamSpec, ParamSpecBuilder, PropertyMeta};
pub use pipeline::{factories, PadCounts, PadDirection, Pipeline, PipelineError};

mod factory;
mod param_spec;
mod pipeline;

use crate::types::{Caps, ParamValue, SongTempo};
use core::fmt::Debug;

/// Something with named, typed properties.
pub trait Parameterized: Debug {
    /// Declares every property.
    fn param_specs(&self) -> &[ParamSpec];

    /// Reads a property. Returns None if there is no such property or it can't
    /// be read.
    fn property(&self, name: &str) -> Option<ParamValue>;

    /// Writes a property.
    fn set_property(&mut self, name: &str, value: ParamValue) -> anyhow::Result<()>;

    /// Looks up a property's declaration by name.
    fn param_spec(&self, name: &str) -> Option<&ParamSpec> {
        self.param_specs().iter().find(|s| s.name == name)
    }
}

/// A signal processor that a machine wraps.
pub trait Unit: Parameterized {
    /// How many static pads the unit has. This decides which kinds of machine
    /// can hold it.
    fn pad_counts(&self) -> PadCounts;

    /// The formats the unit accepts on its sink pad, if it has one.
    fn sink_caps(&self) -> Option<Caps> {
        None
    }

    #[allow(missing_docs)]
    fn as_polyphonic(&self) -> Option<&dyn Polyphonic> {
        None
    }
    #[allow(missing_docs)]
    fn as_polyphonic_mut(&mut self) -> Option<&mut dyn Polyphonic> {
        None
    }
    #[allow(missing_docs)]
    fn as_tempo_aware(&self) -> Option<&dyn TempoAware> {
        None
    }
    #[allow(missing_docs)]
    fn as_tempo_aware_mut(&mut self) -> Option<&mut dyn TempoAware> {
        None
    }
    #[allow(missing_docs)]
    fn as_passthrough(&self) -> Option<&dyn Passthrough> {
        None
    }
    #[allow(missing_docs)]
    fn as_passthrough_mut(&mut self) -> Option<&mut dyn Passthrough> {
        None
    }
    #[allow(missing_docs)]
    fn as_describes_values(&self) -> Option<&dyn DescribesValues> {
        None
    }
}

/// A unit with an indexed set of voices, each carrying its own copy of the
/// per-voice properties.
pub trait Polyphonic {
    /// How many voices currently exist.
    fn voice_count(&self) -> usize;

    /// Creates or destroys voices so that exactly `count` exist.
    fn set_voice_count(&mut self, count: usize);

    /// Borrows one voice.
    fn voice(&self, index: usize) -> Option<&dyn Parameterized>;

    /// Borrows one voice mutably.
    fn voice_mut(&mut self, index: usize) -> Option<&mut dyn Parameterized>;
}

/// A unit that wants to know when the song tempo changes.
pub trait TempoAware {
    #[allow(missing_docs)]
    fn update_tempo(&mut self, tempo: SongTempo);
}

/// A unit that can pass its input through untouched.
pub trait Passthrough {
    #[allow(missing_docs)]
    fn set_passthrough(&mut self, is_passthrough: bool);
    #[allow(missing_docs)]
    fn is_passthrough(&self) -> bool;
}

/// A unit that can render parameter values for display, like "C-4" for a
/// note or "-6 dB" for a gain.
pub trait DescribesValues {
    /// Returns None if the unit has nothing better to say than the raw value.
    fn describe_value(&self, name: &str, value: &ParamValue) -> Option<String>;
}
