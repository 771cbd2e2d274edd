// Copyright (c) 2024 Mike Tsao

use crate::{
    types::{ParamValue, ValueType},
    unit::{ParamKind, ParamSpec},
};
use serde::{Deserialize, Serialize};

/// How a [Parameter] behaves over time, plus a few hints for editors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ParamFlags {
    /// Continuously sampled and persistent. Parameters without this flag are
    /// triggers: write-only, firing once at the moment they're set.
    pub is_state: bool,
    /// Selects an entry in the song's wave table.
    pub is_wave: bool,
}

/// A classified, automatable parameter of a unit or of one of its voices.
#[derive(Clone, Debug, PartialEq)]
pub struct Parameter {
    spec: ParamSpec,
    value_type: ValueType,
    flags: ParamFlags,
    min: Option<ParamValue>,
    max: Option<ParamValue>,
    no_value: Option<ParamValue>,
}
impl Parameter {
    /// Classifies a property. Returns None, after logging, if the property's
    /// type is one the machine layer doesn't handle.
    pub fn new_from_spec(spec: &ParamSpec) -> Option<Self> {
        let Some(value_type) = spec.kind.value_type() else {
            if let ParamKind::Other { type_name } = &spec.kind {
                log::warn!(
                    "parameter '{}' has unhandled type '{type_name}'; skipping",
                    spec.name
                );
            }
            return None;
        };

        let (flags, min, max, no_value) = if let Some(meta) = spec.meta.as_ref() {
            (
                ParamFlags {
                    is_state: meta.is_state,
                    is_wave: meta.is_wave,
                },
                meta.min.clone().or_else(|| spec.kind.min_value()),
                meta.max.clone().or_else(|| spec.kind.max_value()),
                meta.no_value.clone(),
            )
        } else {
            (
                ParamFlags {
                    is_state: spec.readable,
                    is_wave: false,
                },
                spec.kind.min_value(),
                spec.kind.max_value(),
                None,
            )
        };

        // A trigger always needs something meaning "silent"; its declared
        // default serves when nothing else was given.
        let no_value = if flags.is_state {
            no_value
        } else {
            no_value.or_else(|| spec.kind.default_value())
        };

        Some(Self {
            spec: spec.clone(),
            value_type,
            flags,
            min,
            max,
            no_value,
        })
    }

    #[allow(missing_docs)]
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    #[allow(missing_docs)]
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    #[allow(missing_docs)]
    pub fn flags(&self) -> ParamFlags {
        self.flags
    }

    /// Write-only and one-shot, like a note-on.
    pub fn is_trigger(&self) -> bool {
        !self.flags.is_state
    }

    #[allow(missing_docs)]
    pub fn is_state(&self) -> bool {
        self.flags.is_state
    }

    #[allow(missing_docs)]
    pub fn is_wave(&self) -> bool {
        self.flags.is_wave
    }

    /// The lower bound, from the unit's metadata if it gave one, otherwise
    /// from the declared type.
    pub fn min(&self) -> Option<&ParamValue> {
        self.min.as_ref()
    }

    /// The upper bound. See [Parameter::min()].
    pub fn max(&self) -> Option<&ParamValue> {
        self.max.as_ref()
    }

    /// The value meaning "not set at this instant".
    pub fn no_value(&self) -> Option<&ParamValue> {
        self.no_value.as_ref()
    }

    /// Exact comparison against the no-value.
    pub fn is_no_value(&self, value: &ParamValue) -> bool {
        self.no_value.as_ref() == Some(value)
    }

    /// The declared default.
    pub fn default_value(&self) -> Option<ParamValue> {
        self.spec.kind.default_value()
    }

    /// The declaration this parameter was classified from.
    pub fn spec(&self) -> &ParamSpec {
        &self.spec
    }

    /// Whether a value is of the right type for this parameter. Enum codes
    /// must also be among the declared values.
    pub fn accepts(&self, value: &ParamValue) -> bool {
        if value.value_type() != self.value_type {
            return false;
        }
        match value {
            ParamValue::Enum(code) => self.spec.kind.is_valid_enum_code(*code),
            _ => true,
        }
    }
}

/// Which set of parameters a name or binding refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParamScope {
    /// The machine-wide parameters.
    Global,
    /// The parameters of one voice.
    Voice(usize),
}

/// Addresses one parameter instance by index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamRef {
    /// A machine-wide parameter.
    Global(usize),
    /// One voice's copy of a per-voice parameter.
    Voice {
        #[allow(missing_docs)]
        voice: usize,
        #[allow(missing_docs)]
        index: usize,
    },
}
impl ParamRef {
    /// The scope this reference lives in.
    pub fn scope(&self) -> ParamScope {
        match self {
            ParamRef::Global(_) => ParamScope::Global,
            ParamRef::Voice { voice, .. } => ParamScope::Voice(*voice),
        }
    }

    /// The parameter index within its scope.
    pub fn index(&self) -> usize {
        match self {
            ParamRef::Global(index) => *index,
            ParamRef::Voice { index, .. } => *index,
        }
    }
}
