// Copyright (c) 2024 Mike Tsao

use super::{BindingInfo, InteractionRegistry, Machine, MachineKind};
use crate::{
    orchestration::GraphHost,
    params::{ParamRef, ParamScope},
    types::{MachineId, ParamValue},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A saved global parameter value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GlobalValue {
    #[allow(missing_docs)]
    pub name: String,
    #[allow(missing_docs)]
    pub value: ParamValue,
}

/// A saved per-voice parameter value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct VoiceValue {
    #[allow(missing_docs)]
    pub voice: usize,
    #[allow(missing_docs)]
    pub name: String,
    #[allow(missing_docs)]
    pub value: ParamValue,
}

/// Everything about a machine that goes into a saved song. Triggers have no
/// lasting value, so they're never saved.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MachineData {
    #[allow(missing_docs)]
    pub id: MachineId,
    #[allow(missing_docs)]
    pub plugin_name: String,
    #[allow(missing_docs)]
    pub kind: MachineKind,
    #[allow(missing_docs)]
    pub voices: usize,
    #[allow(missing_docs)]
    #[serde(default)]
    pub global_data: Vec<GlobalValue>,
    #[allow(missing_docs)]
    #[serde(default)]
    pub voice_data: Vec<VoiceValue>,
    #[allow(missing_docs)]
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    /// Names of the user's patterns. The patterns themselves are saved by
    /// the song.
    #[serde(default)]
    pub patterns: Vec<String>,
    #[allow(missing_docs)]
    #[serde(default)]
    pub interaction_controllers: Vec<BindingInfo>,
}

impl Machine {
    /// Captures the machine's saveable state.
    pub fn persist(&self) -> MachineData {
        let global_data = self
            .global_params
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.is_trigger())
            .filter_map(|(index, p)| {
                self.param_value(ParamRef::Global(index))
                    .ok()
                    .flatten()
                    .map(|value| GlobalValue {
                        name: p.name().to_string(),
                        value,
                    })
            })
            .collect();
        let mut voice_data = Vec::default();
        for voice in 0..self.voices {
            for (index, p) in self.voice_params.iter().enumerate() {
                if p.is_trigger() {
                    continue;
                }
                if let Ok(Some(value)) = self.param_value(ParamRef::Voice { voice, index }) {
                    voice_data.push(VoiceValue {
                        voice,
                        name: p.name().to_string(),
                        value,
                    });
                }
            }
        }
        MachineData {
            id: self.id.clone(),
            plugin_name: self.plugin_name.clone(),
            kind: self.kind,
            voices: self.voices,
            global_data,
            voice_data,
            properties: self.properties.clone(),
            patterns: self
                .patterns
                .iter()
                .filter(|p| !p.is_internal)
                .map(|p| p.name.clone())
                .collect(),
            interaction_controllers: self.interaction_bindings(),
        }
    }

    /// Applies saved state to a freshly built machine. Values the machine
    /// doesn't recognize are logged and skipped. Saved bindings are resolved
    /// through `controls`; without it, or if a device is missing, they're
    /// skipped too.
    pub fn restore(
        &mut self,
        host: &mut dyn GraphHost,
        data: &MachineData,
        controls: Option<&mut dyn InteractionRegistry>,
    ) {
        if self.is_polyphonic() && data.voices != self.voices {
            self.set_voice_count(host, data.voices);
        }
        let values = data
            .global_data
            .iter()
            .map(|g| (ParamScope::Global, &g.name, &g.value))
            .chain(
                data.voice_data
                    .iter()
                    .map(|v| (ParamScope::Voice(v.voice), &v.name, &v.value)),
            );
        for (scope, name, value) in values {
            let param = match self.param_ref(scope, name) {
                Ok(param) => param,
                Err(e) => {
                    log::warn!("{}: skipping saved value: {e}", self.id);
                    continue;
                }
            };
            if let Err(e) = self.set_param_value(param, value.clone()) {
                log::warn!("{}: skipping saved value: {e}", self.id);
                continue;
            }
            if let Err(e) = self.set_param_default(param) {
                log::warn!("{}: couldn't refresh default of '{name}': {e}", self.id);
            }
        }

        for (key, value) in data.properties.iter() {
            self.properties.insert(key.clone(), value.clone());
        }

        if data.interaction_controllers.is_empty() {
            return;
        }
        let Some(controls) = controls else {
            log::warn!(
                "{}: no control registry; dropping {} saved bindings",
                self.id,
                data.interaction_controllers.len()
            );
            return;
        };
        for info in data.interaction_controllers.iter() {
            let Some(control) = controls.find_control(&info.device, &info.control) else {
                log::warn!(
                    "{}: control {}/{} not found; '{}' stays unbound",
                    self.id,
                    info.device,
                    info.control,
                    info.parameter
                );
                continue;
            };
            if let Err(e) = self.bind_parameter(info.scope, &info.parameter, control) {
                log::warn!("{}: couldn't restore binding: {e}", self.id);
            }
        }
    }
}
