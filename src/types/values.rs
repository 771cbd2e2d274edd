// Copyright (c) 2024 Mike Tsao

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// The value types a unit parameter can have.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ValueType {
    #[allow(missing_docs)]
    Boolean,
    #[allow(missing_docs)]
    Int,
    #[allow(missing_docs)]
    UInt,
    #[allow(missing_docs)]
    Float,
    #[allow(missing_docs)]
    Double,
    /// An integer code drawn from a declared, possibly sparse, set.
    Enum,
    #[allow(missing_docs)]
    String,
}
impl ValueType {
    /// Whether values of this type sit on a number line that can be
    /// interpolated and rescaled.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ValueType::Int | ValueType::UInt | ValueType::Float | ValueType::Double
        )
    }
}

/// A typed parameter value. Equality is exact; no tolerance is applied to
/// floating-point variants.
#[derive(Clone, Debug, Display, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParamValue {
    #[allow(missing_docs)]
    #[display(fmt = "{}", _0)]
    Boolean(bool),
    #[allow(missing_docs)]
    #[display(fmt = "{}", _0)]
    Int(i32),
    #[allow(missing_docs)]
    #[display(fmt = "{}", _0)]
    UInt(u32),
    #[allow(missing_docs)]
    #[display(fmt = "{}", _0)]
    Float(f32),
    #[allow(missing_docs)]
    #[display(fmt = "{}", _0)]
    Double(f64),
    #[allow(missing_docs)]
    #[display(fmt = "{}", _0)]
    Enum(i32),
    #[allow(missing_docs)]
    #[display(fmt = "{}", _0)]
    String(String),
}
impl ParamValue {
    /// Returns the [ValueType] of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            ParamValue::Boolean(_) => ValueType::Boolean,
            ParamValue::Int(_) => ValueType::Int,
            ParamValue::UInt(_) => ValueType::UInt,
            ParamValue::Float(_) => ValueType::Float,
            ParamValue::Double(_) => ValueType::Double,
            ParamValue::Enum(_) => ValueType::Enum,
            ParamValue::String(_) => ValueType::String,
        }
    }

    /// Returns the value as an f64 if it lives on a number line. Booleans and
    /// enum codes count; strings don't.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Boolean(v) => Some(if *v { 1.0 } else { 0.0 }),
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::UInt(v) => Some(*v as f64),
            ParamValue::Float(v) => Some(*v as f64),
            ParamValue::Double(v) => Some(*v),
            ParamValue::Enum(v) => Some(*v as f64),
            ParamValue::String(_) => None,
        }
    }

    /// Builds a value of the given type from an f64, rounding for the integer
    /// types and saturating at their limits. Returns None for strings.
    pub fn from_f64(value_type: ValueType, value: f64) -> Option<Self> {
        match value_type {
            ValueType::Boolean => Some(ParamValue::Boolean(value != 0.0)),
            ValueType::Int => Some(ParamValue::Int(value.round() as i32)),
            ValueType::UInt => Some(ParamValue::UInt(value.round().max(0.0) as u32)),
            ValueType::Float => Some(ParamValue::Float(value as f32)),
            ValueType::Double => Some(ParamValue::Double(value)),
            ValueType::Enum => Some(ParamValue::Enum(value.round() as i32)),
            ValueType::String => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_know_their_types() {
        assert_eq!(ParamValue::Boolean(true).value_type(), ValueType::Boolean);
        assert_eq!(ParamValue::Enum(3).value_type(), ValueType::Enum);
        assert_eq!(
            ParamValue::String("saw".to_string()).value_type(),
            ValueType::String
        );
        assert!(ValueType::Double.is_numeric());
        assert!(!ValueType::Enum.is_numeric());
    }

    #[test]
    fn numeric_conversions() {
        assert_eq!(ParamValue::UInt(7).as_f64(), Some(7.0));
        assert_eq!(ParamValue::String("x".to_string()).as_f64(), None);
        assert_eq!(
            ParamValue::from_f64(ValueType::Int, 2.6),
            Some(ParamValue::Int(3)),
            "integers should round to nearest"
        );
        assert_eq!(
            ParamValue::from_f64(ValueType::UInt, -4.0),
            Some(ParamValue::UInt(0)),
            "unsigned values should saturate at zero"
        );
        assert_eq!(ParamValue::from_f64(ValueType::String, 1.0), None);
    }

    #[test]
    fn equality_is_exact() {
        assert_ne!(ParamValue::Double(0.1 + 0.2), ParamValue::Double(0.3));
        assert_ne!(
            ParamValue::Int(1),
            ParamValue::UInt(1),
            "values of different types are never equal"
        );
    }
}
