// Copyright (c) 2024 Mike Tsao

use super::{Machine, ParamError};
use crate::{
    params::{ParamRef, ParamScope, Parameter},
    types::{ParamValue, ValueType},
};
use core::fmt::Debug;
use crossbeam::channel::Receiver;
use serde::{Deserialize, Serialize};

/// One knob, fader, or key of an external controller.
pub trait InteractionControl: Debug {
    /// The control's name on its device.
    fn name(&self) -> &str;

    /// The name of the device the control belongs to.
    fn device_name(&self) -> &str;

    /// The raw values the control reports, inclusive.
    fn range(&self) -> (i64, i64);

    /// Starts the device delivering events. Called once per binding.
    fn start_device(&mut self);

    /// Stops the device. Called when the binding goes away.
    fn stop_device(&mut self);

    /// A channel that receives every raw value the control reports.
    fn subscribe(&mut self) -> Receiver<i64>;
}

/// Finds controls by device and control name, for restoring saved bindings.
pub trait InteractionRegistry {
    #[allow(missing_docs)]
    fn find_control(&mut self, device: &str, control: &str)
        -> Option<Box<dyn InteractionControl>>;
}

/// How raw control values become parameter values.
#[derive(Clone, Debug, PartialEq)]
enum ValueMapping {
    /// Zero is false, anything else true.
    Direct,
    /// Stretches the control's range onto the parameter's, then clamps.
    Rescale {
        control_min: f64,
        control_max: f64,
        min: f64,
        max: f64,
        value_type: ValueType,
    },
    /// The parameter's type can't be driven by a control. The binding exists
    /// but never writes anything.
    Inert,
}
impl ValueMapping {
    fn new_for(parameter: &Parameter, control: &dyn InteractionControl) -> Self {
        let value_type = parameter.value_type();
        match value_type {
            ValueType::Boolean => ValueMapping::Direct,
            ValueType::Int | ValueType::UInt | ValueType::Float | ValueType::Double => {
                let (control_min, control_max) = control.range();
                match (
                    parameter.min().and_then(|v| v.as_f64()),
                    parameter.max().and_then(|v| v.as_f64()),
                ) {
                    (Some(min), Some(max)) => ValueMapping::Rescale {
                        control_min: control_min as f64,
                        control_max: control_max as f64,
                        min,
                        max,
                        value_type,
                    },
                    _ => ValueMapping::Inert,
                }
            }
            _ => {
                log::warn!(
                    "parameter '{}' of type {value_type} can't be bound to a control",
                    parameter.name()
                );
                ValueMapping::Inert
            }
        }
    }

    fn map(&self, raw: i64) -> Option<ParamValue> {
        match self {
            ValueMapping::Direct => Some(ParamValue::Boolean(raw != 0)),
            ValueMapping::Rescale {
                control_min,
                control_max,
                min,
                max,
                value_type,
            } => {
                let span = control_max - control_min;
                let value = if span == 0.0 {
                    *min
                } else {
                    min + (raw as f64 - control_min) * ((max - min) / span)
                };
                ParamValue::from_f64(*value_type, value.clamp(min.min(*max), max.max(*min)))
            }
            ValueMapping::Inert => None,
        }
    }
}

/// A live connection from a control to a parameter. Dropping it stops the
/// device and disconnects the channel.
#[derive(Debug)]
pub(crate) struct Binding {
    control: Box<dyn InteractionControl>,
    events: Receiver<i64>,
    mapping: ValueMapping,
    param: ParamRef,
}
impl Drop for Binding {
    fn drop(&mut self) {
        self.control.stop_device();
    }
}

/// A binding as it's saved and shown to the user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BindingInfo {
    #[allow(missing_docs)]
    pub scope: ParamScope,
    #[allow(missing_docs)]
    pub parameter: String,
    #[allow(missing_docs)]
    pub device: String,
    #[allow(missing_docs)]
    pub control: String,
}

impl Machine {
    /// Connects a control to a parameter. Any control already bound to that
    /// parameter is stopped and released first.
    pub fn bind_parameter(
        &mut self,
        scope: ParamScope,
        name: &str,
        mut control: Box<dyn InteractionControl>,
    ) -> Result<(), ParamError> {
        let param = self.param_ref(scope, name)?;
        let key = (scope, name.to_string());
        self.bindings.remove(&key);

        let mapping = ValueMapping::new_for(self.param(param)?, control.as_ref());
        let events = control.subscribe();
        control.start_device();
        log::debug!(
            "{}: bound {}/{} to {name}",
            self.id,
            control.device_name(),
            control.name()
        );
        self.bindings.insert(
            key,
            Binding {
                control,
                events,
                mapping,
                param,
            },
        );
        Ok(())
    }

    /// Disconnects whatever control is bound to the parameter. Returns false
    /// if there was none.
    pub fn unbind_parameter(&mut self, scope: ParamScope, name: &str) -> bool {
        self.bindings.remove(&(scope, name.to_string())).is_some()
    }

    /// Disconnects every control.
    pub fn unbind_all(&mut self) {
        self.bindings.clear();
    }

    /// Applies every value that bound controls have reported since the last
    /// call, in the order they arrived per control. Returns how many values
    /// were written.
    pub fn dispatch_interaction_events(&mut self) -> usize {
        let mut writes = Vec::default();
        for binding in self.bindings.values() {
            for raw in binding.events.try_iter() {
                if let Some(value) = binding.mapping.map(raw) {
                    writes.push((binding.param, value));
                }
            }
        }
        let mut written = 0;
        for (param, value) in writes {
            match self.set_param_value(param, value) {
                Ok(_) => written += 1,
                Err(e) => log::warn!("{}: control value for {param:?} refused: {e}", self.id),
            }
        }
        written
    }

    /// Points global bindings at their parameter's current index, dropping
    /// any whose parameter is no longer global.
    pub(super) fn retarget_global_bindings(&mut self) {
        let global_params = &self.global_params;
        self.bindings.retain(|(scope, name), binding| {
            if *scope != ParamScope::Global {
                return true;
            }
            match global_params.iter().position(|p| p.name() == name) {
                Some(index) => {
                    binding.param = ParamRef::Global(index);
                    true
                }
                None => false,
            }
        });
    }

    /// Describes every binding, ordered by scope then parameter name.
    pub fn interaction_bindings(&self) -> Vec<BindingInfo> {
        self.bindings
            .iter()
            .map(|((scope, parameter), binding)| BindingInfo {
                scope: *scope,
                parameter: parameter.clone(),
                device: binding.control.device_name().to_string(),
                control: binding.control.name().to_string(),
            })
            .collect()
    }
}
