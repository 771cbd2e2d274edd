// Copyright (c) 2024 Mike Tsao

use super::{Machine, ParamControl, ParamError};
use crate::{
    automation::{ControlCurve, InterpolationMode},
    params::ParamRef,
    types::{ControlUid, ParamValue, Timestamp, ValueType},
    util::Rng,
};

impl Machine {
    fn control(&self, param: ParamRef) -> ParamControl {
        match param {
            ParamRef::Global(index) => self.global_controls.get(index).copied(),
            ParamRef::Voice { voice, index } => self
                .voice_controls
                .get(voice)
                .and_then(|controls| controls.get(index))
                .copied(),
        }
        .unwrap_or_default()
    }

    fn control_mut(&mut self, param: ParamRef) -> Option<&mut ParamControl> {
        match param {
            ParamRef::Global(index) => self.global_controls.get_mut(index),
            ParamRef::Voice { voice, index } => self
                .voice_controls
                .get_mut(voice)
                .and_then(|controls| controls.get_mut(index)),
        }
    }

    /// What time zero should hold when nobody has put a value there: silence
    /// for triggers, the live value for everything else.
    fn shadow_default(&self, param: ParamRef) -> Option<ParamValue> {
        let parameter = self.param(param).ok()?;
        if parameter.is_trigger() {
            parameter.no_value().cloned()
        } else {
            self.param_value(param)
                .ok()
                .flatten()
                .or_else(|| parameter.default_value())
        }
    }

    fn curve_for(&self, param: ParamRef) -> Option<&ControlCurve> {
        self.control(param)
            .curve
            .and_then(|uid| self.automator.curve(uid))
    }

    fn ensure_curve(&mut self, param: ParamRef) -> Result<ControlUid, ParamError> {
        if let Some(uid) = self.control(param).curve {
            return Ok(uid);
        }
        let mode = if self.param(param)?.is_trigger() {
            InterpolationMode::Trigger
        } else {
            self.settings.state_interpolation()
        };
        let uid = self.automator.add_curve(ControlCurve::new_with(mode));
        if let Some(control) = self.control_mut(param) {
            control.curve = Some(uid);
        }
        log::trace!("{}: automating {param:?} with {mode:?}", self.id);
        Ok(uid)
    }

    fn detach(&mut self, param: ParamRef) {
        if let Some(control) = self.control_mut(param) {
            let uid = control.curve.take();
            control.default_is_synthetic = false;
            if let Some(uid) = uid {
                self.automator.remove_curve(uid);
            }
        }
    }

    /// Sets or unsets the value a parameter takes at a point in time.
    ///
    /// Unsetting at time zero refreshes the synthetic start value from the
    /// live value, unless a real value is already there. The first point
    /// after time zero also puts a synthetic start value at time zero.
    /// Removing the last real point stops automating the parameter.
    pub fn set_control_point(
        &mut self,
        param: ParamRef,
        when: Timestamp,
        value: Option<ParamValue>,
    ) -> Result<(), ParamError> {
        let parameter = self.param(param)?;
        if let Some(value) = value.as_ref() {
            if !parameter.accepts(value) {
                return Err(ParamError::TypeMismatch {
                    name: parameter.name().to_string(),
                    expected: parameter.value_type(),
                    actual: value.value_type(),
                });
            }
        }
        let control = self.control(param);

        match (when.is_zero(), value) {
            (true, None) => {
                let has_real_start = !control.default_is_synthetic
                    && self
                        .curve_for(param)
                        .is_some_and(|c| c.point(Timestamp::ZERO).is_some());
                if has_real_start {
                    log::trace!("{}: keeping real start value of {param:?}", self.id);
                    return Ok(());
                }
                let shadow = self.shadow_default(param);
                if let Some(control) = self.control_mut(param) {
                    control.default_is_synthetic = true;
                }
                if let (Some(uid), Some(shadow)) = (control.curve, shadow) {
                    if let Some(curve) = self.automator.curve_mut(uid) {
                        curve.set_point(Timestamp::ZERO, shadow);
                    }
                }
            }
            (true, Some(value)) => {
                let uid = self.ensure_curve(param)?;
                if let Some(control) = self.control_mut(param) {
                    control.default_is_synthetic = false;
                }
                if let Some(curve) = self.automator.curve_mut(uid) {
                    curve.set_point(Timestamp::ZERO, value);
                }
            }
            (false, Some(value)) => {
                let is_new = self.curve_for(param).map_or(true, |c| c.is_empty());
                let shadow = if is_new {
                    self.shadow_default(param)
                } else {
                    None
                };
                let uid = self.ensure_curve(param)?;
                if is_new {
                    if let Some(control) = self.control_mut(param) {
                        control.default_is_synthetic = true;
                    }
                }
                if let Some(curve) = self.automator.curve_mut(uid) {
                    if let Some(shadow) = shadow {
                        curve.set_point(Timestamp::ZERO, shadow);
                    }
                    curve.set_point(when, value);
                }
            }
            (false, None) => {
                let Some(uid) = control.curve else {
                    return Ok(());
                };
                let Some(curve) = self.automator.curve_mut(uid) else {
                    return Ok(());
                };
                curve.remove_point(when);
                let synthetic = usize::from(
                    control.default_is_synthetic && curve.point(Timestamp::ZERO).is_some(),
                );
                if curve.len() <= synthetic {
                    log::trace!("{}: {param:?} has no points left; detaching", self.id);
                    self.detach(param);
                }
            }
        }
        Ok(())
    }

    /// Whether the parameter currently has automation.
    pub fn is_controlled(&self, param: ParamRef) -> Result<bool, ParamError> {
        self.param(param)?;
        Ok(self.curve_for(param).is_some())
    }

    /// The parameter's control points in time order.
    pub fn control_points(&self, param: ParamRef) -> Result<Vec<(Timestamp, ParamValue)>, ParamError> {
        self.param(param)?;
        Ok(self
            .curve_for(param)
            .map(|c| c.points().map(|(t, v)| (*t, v.clone())).collect())
            .unwrap_or_default())
    }

    /// Stops automating the parameter, dropping every point, including a real
    /// one at time zero.
    pub fn clear_automation(&mut self, param: ParamRef) -> Result<(), ParamError> {
        self.param(param)?;
        self.detach(param);
        Ok(())
    }

    /// Refreshes the synthetic start value of one parameter.
    pub fn set_param_default(&mut self, param: ParamRef) -> Result<(), ParamError> {
        self.set_control_point(param, Timestamp::ZERO, None)
    }

    fn all_param_refs(&self) -> Vec<ParamRef> {
        let globals = (0..self.global_params.len()).map(ParamRef::Global);
        let voice_params = self.voice_params.len();
        let voices = (0..self.voices)
            .flat_map(move |voice| (0..voice_params).map(move |index| ParamRef::Voice { voice, index }));
        globals.chain(voices).collect()
    }

    /// Refreshes the synthetic start value of every parameter, globals first,
    /// then each voice in turn.
    pub fn set_param_defaults(&mut self) {
        for param in self.all_param_refs() {
            if let Err(e) = self.set_param_default(param) {
                log::warn!("{}: couldn't refresh default of {param:?}: {e}", self.id);
            }
        }
    }

    /// Puts every state parameter back to its declared default.
    pub fn reset_parameters(&mut self) {
        for param in self.all_param_refs() {
            let Ok(parameter) = self.param(param) else {
                continue;
            };
            if parameter.is_trigger() {
                continue;
            }
            let Some(default) = parameter.default_value() else {
                continue;
            };
            if let Err(e) = self.set_param_value(param, default) {
                log::warn!("{}: couldn't reset {param:?}: {e}", self.id);
            }
        }
    }

    /// Gives every state parameter a random value within its bounds, then
    /// refreshes the start values to match.
    pub fn randomize_parameters(&mut self, rng: &mut Rng) {
        for param in self.all_param_refs() {
            let Ok(parameter) = self.param(param) else {
                continue;
            };
            if parameter.is_trigger() {
                continue;
            }
            let value = match parameter.value_type() {
                ValueType::Boolean => Some(ParamValue::Boolean(rng.rand_range(0..2) != 0)),
                ValueType::Int | ValueType::UInt | ValueType::Float | ValueType::Double => {
                    match (
                        parameter.min().and_then(|v| v.as_f64()),
                        parameter.max().and_then(|v| v.as_f64()),
                    ) {
                        (Some(min), Some(max)) => ParamValue::from_f64(
                            parameter.value_type(),
                            min + (max - min) * rng.rand_float(),
                        ),
                        _ => None,
                    }
                }
                ValueType::Enum => match (parameter.min(), parameter.max()) {
                    (Some(ParamValue::Enum(min)), Some(ParamValue::Enum(max))) => {
                        let (min, max) = (*min, *max);
                        let span = (max as f64 - min as f64) + 1.0;
                        let mut code = (min + (span * rng.rand_float()) as i32).min(max);
                        // Codes may be sparse, so settle on the nearest valid
                        // one below.
                        while code > min && !parameter.spec().kind.is_valid_enum_code(code) {
                            code -= 1;
                        }
                        Some(ParamValue::Enum(code))
                    }
                    _ => None,
                },
                ValueType::String => None,
            };
            match value {
                Some(value) => {
                    if let Err(e) = self.set_param_value(param, value) {
                        log::warn!("{}: couldn't randomize {param:?}: {e}", self.id);
                    }
                }
                None => {
                    log::warn!(
                        "{}: can't randomize {param:?} of type {}",
                        self.id,
                        parameter.value_type()
                    );
                }
            }
        }
        self.set_param_defaults();
    }

    /// Writes every automated parameter's value at `when` into the unit.
    /// Triggers fire only exactly at their points, and the no-value is never
    /// written.
    pub fn sync_values(&mut self, when: Timestamp) {
        for param in self.all_param_refs() {
            let Some(value) = self.curve_for(param).and_then(|c| c.value_at(when)) else {
                continue;
            };
            let Ok(parameter) = self.param(param) else {
                continue;
            };
            if parameter.is_no_value(&value) {
                continue;
            }
            if let Err(e) = self.set_param_value(param, value) {
                log::warn!("{}: couldn't apply automation of {param:?}: {e}", self.id);
            }
        }
    }
}
