// Copyright (c) 2024 Mike Tsao

use crate::types::{ParamValue, Timestamp};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::Display;

/// How a [ControlCurve] fills the time between its points.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum InterpolationMode {
    /// Each point's value holds until the next point.
    #[default]
    None,
    /// Values exist only at the points themselves. Used for triggers.
    Trigger,
    /// Numeric values ramp in a straight line from point to point.
    Linear,
}

/// A series of (time, value) points for one parameter. At most one point per
/// timestamp.
#[derive(Clone, Debug, Default, PartialEq, Builder, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ControlCurve {
    /// How values are filled in between points.
    #[builder(default)]
    mode: InterpolationMode,
    /// The (time, value) points, keyed by time.
    #[builder(default, setter(each(name = "point")))]
    points: BTreeMap<Timestamp, ParamValue>,
}
impl ControlCurve {
    #[allow(missing_docs)]
    pub fn new_with(mode: InterpolationMode) -> Self {
        Self {
            mode,
            points: Default::default(),
        }
    }

    #[allow(missing_docs)]
    pub fn mode(&self) -> InterpolationMode {
        self.mode
    }

    /// Adds or replaces the point at `when`. Returns the value it replaced.
    pub fn set_point(&mut self, when: Timestamp, value: ParamValue) -> Option<ParamValue> {
        self.points.insert(when, value)
    }

    /// Removes the point at `when`. Returns its value.
    pub fn remove_point(&mut self, when: Timestamp) -> Option<ParamValue> {
        self.points.remove(&when)
    }

    /// The value of the point exactly at `when`.
    pub fn point(&self, when: Timestamp) -> Option<&ParamValue> {
        self.points.get(&when)
    }

    /// All points in time order.
    pub fn points(&self) -> impl Iterator<Item = (&Timestamp, &ParamValue)> {
        self.points.iter()
    }

    #[allow(missing_docs)]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Samples the curve. Returns None when the curve has nothing to say at
    /// this time: before the first point, or between points of a trigger
    /// curve.
    pub fn value_at(&self, when: Timestamp) -> Option<ParamValue> {
        match self.mode {
            InterpolationMode::Trigger => self.points.get(&when).cloned(),
            InterpolationMode::None => self
                .points
                .range(..=when)
                .next_back()
                .map(|(_, v)| v.clone()),
            InterpolationMode::Linear => {
                let (left_when, left) = self.points.range(..=when).next_back()?;
                if *left_when == when {
                    return Some(left.clone());
                }
                let Some((right_when, right)) = self.points.range(when..).next() else {
                    return Some(left.clone());
                };
                let value_type = left.value_type();
                if !value_type.is_numeric() || right.value_type() != value_type {
                    return Some(left.clone());
                }
                let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) else {
                    return Some(left.clone());
                };
                let span = (right_when.0 - left_when.0) as f64;
                let percent = (when.0 - left_when.0) as f64 / span;
                ParamValue::from_f64(value_type, a + (b - a) * percent)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(mode: InterpolationMode) -> ControlCurve {
        ControlCurveBuilder::default()
            .mode(mode)
            .point((Timestamp(0), ParamValue::Double(0.0)))
            .point((Timestamp(100), ParamValue::Double(10.0)))
            .build()
            .unwrap()
    }

    #[test]
    fn hold_mode_keeps_last_value() {
        let c = curve(InterpolationMode::None);
        assert_eq!(c.value_at(Timestamp(0)), Some(ParamValue::Double(0.0)));
        assert_eq!(c.value_at(Timestamp(50)), Some(ParamValue::Double(0.0)));
        assert_eq!(c.value_at(Timestamp(100)), Some(ParamValue::Double(10.0)));
        assert_eq!(c.value_at(Timestamp(9999)), Some(ParamValue::Double(10.0)));
    }

    #[test]
    fn trigger_mode_fires_only_on_points() {
        let c = curve(InterpolationMode::Trigger);
        assert_eq!(c.value_at(Timestamp(100)), Some(ParamValue::Double(10.0)));
        assert_eq!(c.value_at(Timestamp(50)), None);
        assert_eq!(c.value_at(Timestamp(101)), None);
    }

    #[test]
    fn linear_mode_ramps_numbers() {
        let c = curve(InterpolationMode::Linear);
        assert_eq!(c.value_at(Timestamp(25)), Some(ParamValue::Double(2.5)));
        assert_eq!(c.value_at(Timestamp(200)), Some(ParamValue::Double(10.0)));

        let mut c = ControlCurve::new_with(InterpolationMode::Linear);
        c.set_point(Timestamp(0), ParamValue::String("a".to_string()));
        c.set_point(Timestamp(10), ParamValue::String("b".to_string()));
        assert_eq!(
            c.value_at(Timestamp(5)),
            Some(ParamValue::String("a".to_string())),
            "non-numeric values hold even in linear mode"
        );
    }

    #[test]
    fn one_point_per_timestamp() {
        let mut c = ControlCurve::default();
        assert!(c.set_point(Timestamp(5), ParamValue::Int(1)).is_none());
        assert_eq!(
            c.set_point(Timestamp(5), ParamValue::Int(2)),
            Some(ParamValue::Int(1))
        );
        assert_eq!(c.len(), 1);
        assert_eq!(c.remove_point(Timestamp(5)), Some(ParamValue::Int(2)));
        assert!(c.is_empty());
        assert_eq!(c.value_at(Timestamp(5)), None, "empty curves say nothing");
    }
}
