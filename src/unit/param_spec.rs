// Copyright (c) 2024 Mike Tsao

use crate::types::{ParamValue, ValueType};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// One legal value of an enum-typed parameter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EnumValue {
    /// The numeric code.
    pub value: i32,
    /// A short name for the value.
    pub nick: String,
}
impl EnumValue {
    #[allow(missing_docs)]
    pub fn new_with(value: i32, nick: &str) -> Self {
        Self {
            value,
            nick: nick.to_string(),
        }
    }
}

/// The declared type of a unit property, along with its bounds and default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[allow(missing_docs)]
pub enum ParamKind {
    Boolean {
        default: bool,
    },
    Int {
        min: i32,
        max: i32,
        default: i32,
    },
    UInt {
        min: u32,
        max: u32,
        default: u32,
    },
    Float {
        min: f32,
        max: f32,
        default: f32,
    },
    Double {
        min: f64,
        max: f64,
        default: f64,
    },
    /// The codes need not be contiguous.
    Enum {
        values: Vec<EnumValue>,
        default: i32,
    },
    String {
        default: String,
    },
    /// Anything the machine layer doesn't know how to handle. Parameters of
    /// this kind are reported and skipped.
    Other {
        type_name: String,
    },
}
impl ParamKind {
    /// Returns the [ValueType], or None for [ParamKind::Other].
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            ParamKind::Boolean { .. } => Some(ValueType::Boolean),
            ParamKind::Int { .. } => Some(ValueType::Int),
            ParamKind::UInt { .. } => Some(ValueType::UInt),
            ParamKind::Float { .. } => Some(ValueType::Float),
            ParamKind::Double { .. } => Some(ValueType::Double),
            ParamKind::Enum { .. } => Some(ValueType::Enum),
            ParamKind::String { .. } => Some(ValueType::String),
            ParamKind::Other { .. } => None,
        }
    }

    /// The declared default.
    pub fn default_value(&self) -> Option<ParamValue> {
        match self {
            ParamKind::Boolean { default } => Some(ParamValue::Boolean(*default)),
            ParamKind::Int { default, .. } => Some(ParamValue::Int(*default)),
            ParamKind::UInt { default, .. } => Some(ParamValue::UInt(*default)),
            ParamKind::Float { default, .. } => Some(ParamValue::Float(*default)),
            ParamKind::Double { default, .. } => Some(ParamValue::Double(*default)),
            ParamKind::Enum { default, .. } => Some(ParamValue::Enum(*default)),
            ParamKind::String { default } => Some(ParamValue::String(default.clone())),
            ParamKind::Other { .. } => None,
        }
    }

    /// The declared lower bound. Booleans run from false to true, enums from
    /// their smallest code to their largest, and strings have no bounds.
    pub fn min_value(&self) -> Option<ParamValue> {
        match self {
            ParamKind::Boolean { .. } => Some(ParamValue::Boolean(false)),
            ParamKind::Int { min, .. } => Some(ParamValue::Int(*min)),
            ParamKind::UInt { min, .. } => Some(ParamValue::UInt(*min)),
            ParamKind::Float { min, .. } => Some(ParamValue::Float(*min)),
            ParamKind::Double { min, .. } => Some(ParamValue::Double(*min)),
            ParamKind::Enum { values, .. } => {
                values.iter().map(|v| v.value).min().map(ParamValue::Enum)
            }
            ParamKind::String { .. } | ParamKind::Other { .. } => None,
        }
    }

    /// The declared upper bound. See [ParamKind::min_value()].
    pub fn max_value(&self) -> Option<ParamValue> {
        match self {
            ParamKind::Boolean { .. } => Some(ParamValue::Boolean(true)),
            ParamKind::Int { max, .. } => Some(ParamValue::Int(*max)),
            ParamKind::UInt { max, .. } => Some(ParamValue::UInt(*max)),
            ParamKind::Float { max, .. } => Some(ParamValue::Float(*max)),
            ParamKind::Double { max, .. } => Some(ParamValue::Double(*max)),
            ParamKind::Enum { values, .. } => {
                values.iter().map(|v| v.value).max().map(ParamValue::Enum)
            }
            ParamKind::String { .. } | ParamKind::Other { .. } => None,
        }
    }

    /// Whether the given enum code is one of the declared values. Always false
    /// for non-enum kinds.
    pub fn is_valid_enum_code(&self, code: i32) -> bool {
        match self {
            ParamKind::Enum { values, .. } => values.iter().any(|v| v.value == code),
            _ => false,
        }
    }
}

/// Metadata a unit may attach to a property beyond what its type declares.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PropertyMeta {
    /// The property holds a persistent value rather than firing once.
    pub is_state: bool,
    /// The property selects a wave table entry.
    pub is_wave: bool,
    /// Overrides the declared lower bound.
    pub min: Option<ParamValue>,
    /// Overrides the declared upper bound.
    pub max: Option<ParamValue>,
    /// The value that means "nothing happens here".
    pub no_value: Option<ParamValue>,
}

/// Describes one property of a unit or of one of its voices.
#[derive(Builder, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[builder(setter(into))]
#[serde(rename_all = "kebab-case")]
pub struct ParamSpec {
    /// Unique within the unit (or within a voice).
    pub name: String,
    /// Type, bounds, and default.
    pub kind: ParamKind,
    /// Whether the current value can be read back. Properties that can't are
    /// triggers.
    #[builder(default = "true")]
    pub readable: bool,
    /// Whether the property can be automated.
    #[builder(default = "true")]
    pub controllable: bool,
    /// Extra metadata, if the unit provides it.
    #[builder(default, setter(into, strip_option))]
    pub meta: Option<PropertyMeta>,
}
impl ParamSpec {
    /// A shorthand for specs that need nothing but a name and a kind.
    pub fn new_with(name: &str, kind: ParamKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            readable: true,
            controllable: true,
            meta: None,
        }
    }
}
