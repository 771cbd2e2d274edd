// Copyright (c) 2024 Mike Tsao

use super::{
    interaction::Binding, ConstructionError, MachineState, ParamError, PatternInfo, Slot,
    SlotElement,
};
use crate::{
    automation::Automator,
    orchestration::GraphHost,
    params::{
        discover_global_parameters, discover_unit_voice_parameters, ParamRef, ParamScope,
        Parameter,
    },
    types::{ControlUid, MachineId, ParamValue, SongTempo},
    unit::{PadCounts, PadDirection, Pipeline, Unit, UnitFactory, UnitKey},
    util::MachineSettings,
};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::EnumCount;
use strum_macros::{Display, EnumIter};

/// The role a machine plays in the graph, which decides the pads its unit must
/// have and the operations that make sense for it.
#[derive(
    Clone, Copy, Debug, Display, EnumIter, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum MachineKind {
    /// Generates audio, like a synthesizer. Has outputs only.
    Source,
    /// Transforms audio, like an echo. Has one input and one output.
    Processor,
    /// Consumes audio, like the master output. Has inputs only.
    Sink,
}
impl MachineKind {
    /// Whether a unit with these pads can be this kind of machine.
    pub fn accepts(&self, pads: PadCounts) -> bool {
        match self {
            MachineKind::Source => pads.src >= 1 && pads.sink == 0,
            MachineKind::Processor => pads.src == 1 && pads.sink == 1,
            MachineKind::Sink => pads.sink >= 1 && pads.src == 0,
        }
    }
}

/// Everything needed to build a [Machine].
#[derive(Builder, Clone, Debug, PartialEq)]
#[builder(setter(into))]
pub struct MachineParams {
    /// Unique within the song.
    pub id: MachineId,
    /// The [UnitKey] of the unit to wrap.
    pub plugin_name: String,
    #[allow(missing_docs)]
    pub kind: MachineKind,
    /// How many voices a polyphonic unit should start with. Ignored for
    /// monophonic units.
    #[builder(default)]
    pub voices: usize,
}

/// Automation bookkeeping for one parameter instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct ParamControl {
    /// The curve in the machine's [Automator], while the parameter is
    /// automated.
    pub(crate) curve: Option<ControlUid>,
    /// Whether the time-zero point was put there by us rather than by the
    /// user.
    pub(crate) default_is_synthetic: bool,
}

/// Bounds and default of a parameter, as typed values.
#[derive(Clone, Debug, PartialEq)]
pub struct ParamDetails {
    #[allow(missing_docs)]
    pub min: Option<ParamValue>,
    #[allow(missing_docs)]
    pub max: Option<ParamValue>,
    #[allow(missing_docs)]
    pub default: Option<ParamValue>,
}

/// A node in the song graph. Wraps a [Unit] and manages the auxiliary
/// elements around it, the automation of its parameters, its interaction
/// bindings, and its playback state.
#[derive(Debug)]
pub struct Machine {
    pub(super) id: MachineId,
    pub(super) plugin_name: String,
    pub(super) kind: MachineKind,
    pub(super) state: MachineState,
    pub(super) settings: MachineSettings,

    pub(super) unit: Box<dyn Unit>,
    pub(super) slots: [Option<SlotElement>; Slot::COUNT],

    pub(super) voices: usize,
    pub(super) global_params: Vec<Parameter>,
    pub(super) voice_params: Vec<Parameter>,
    pub(super) global_controls: Vec<ParamControl>,
    pub(super) voice_controls: Vec<Vec<ParamControl>>,
    pub(super) automator: Automator,

    pub(super) bindings: BTreeMap<(ParamScope, String), Binding>,

    pub(super) patterns: Vec<PatternInfo>,
    pub(super) private_pattern_count: usize,
    pub(super) properties: BTreeMap<String, String>,
}
impl Machine {
    /// Instantiates the unit, registers it with the pipeline, and discovers
    /// its parameters.
    pub fn new(
        host: &mut dyn GraphHost,
        factory: &UnitFactory,
        settings: &MachineSettings,
        params: MachineParams,
    ) -> Result<Self, ConstructionError> {
        let Some(mut unit) = factory.new_unit(&UnitKey::from(params.plugin_name.as_str())) else {
            return Err(ConstructionError::UnknownUnit(params.plugin_name));
        };
        let pads = unit.pad_counts();
        if !params.kind.accepts(pads) {
            return Err(ConstructionError::TypeMismatch {
                kind: params.kind,
                plugin_name: params.plugin_name,
                pads,
            });
        }

        let voices = if let Some(polyphonic) = unit.as_polyphonic_mut() {
            if params.voices > 0 {
                polyphonic.set_voice_count(params.voices);
            } else {
                log::warn!(
                    "machine {} wraps a polyphonic unit but asked for no voices",
                    params.id
                );
            }
            polyphonic.voice_count()
        } else {
            0
        };

        let pipeline = host.pipeline_mut();
        let element = pipeline.add_unit(&params.id.0, pads)?;
        let mut slots = [None; Slot::COUNT];
        slots[Slot::Unit as usize] = Some(SlotElement {
            element,
            src: pipeline.static_pad(element, PadDirection::Src),
            sink: pipeline.static_pad(element, PadDirection::Sink),
            is_active: true,
        });

        let global_params = discover_global_parameters(unit.as_ref());
        let voice_params = discover_unit_voice_parameters(unit.as_ref());
        log::debug!(
            "machine {} has {} global and {} voice parameters, {voices} voices",
            params.id,
            global_params.len(),
            voice_params.len()
        );

        let r = Self {
            global_controls: vec![ParamControl::default(); global_params.len()],
            voice_controls: vec![vec![ParamControl::default(); voice_params.len()]; voices],
            id: params.id,
            plugin_name: params.plugin_name,
            kind: params.kind,
            state: Default::default(),
            settings: settings.clone(),
            unit,
            slots,
            voices,
            global_params,
            voice_params,
            automator: Default::default(),
            bindings: Default::default(),
            patterns: Default::default(),
            private_pattern_count: Default::default(),
            properties: Default::default(),
        };
        log::debug!("{} {}", r.id, r.describe_slots());
        Ok(r)
    }

    /// Releases everything the machine holds: interaction devices, curves,
    /// and every element it ever created in the pipeline.
    pub fn dispose(mut self, pipeline: &mut dyn Pipeline) {
        self.unbind_all();
        self.automator.clear();
        for slot in self.slots.iter_mut() {
            if let Some(slot_element) = slot.take() {
                pipeline.remove_element(slot_element.element);
            }
        }
    }

    #[allow(missing_docs)]
    pub fn id(&self) -> &MachineId {
        &self.id
    }

    /// The key of the wrapped unit.
    pub fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    #[allow(missing_docs)]
    pub fn kind(&self) -> MachineKind {
        self.kind
    }

    #[allow(missing_docs)]
    pub fn unit(&self) -> &dyn Unit {
        self.unit.as_ref()
    }

    #[allow(missing_docs)]
    pub fn unit_mut(&mut self) -> &mut dyn Unit {
        self.unit.as_mut()
    }

    /// Whether the unit has voices that can be added and removed.
    pub fn is_polyphonic(&self) -> bool {
        self.unit.as_polyphonic().is_some()
    }

    /// Whether the unit wants tempo updates.
    pub fn is_tempo_aware(&self) -> bool {
        self.unit.as_tempo_aware().is_some()
    }

    /// Passes a tempo change to the unit, if it cares.
    pub fn update_tempo(&mut self, tempo: SongTempo) {
        if let Some(tempo_aware) = self.unit.as_tempo_aware_mut() {
            tempo_aware.update_tempo(tempo);
        }
    }

    /// The UI metadata bag.
    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// Sets one UI metadata entry. The song is dirtied only if the value
    /// actually changed.
    pub fn set_property(&mut self, host: &mut dyn GraphHost, key: &str, value: &str) {
        if self.properties.get(key).map(|v| v.as_str()) != Some(value) {
            self.properties.insert(key.to_string(), value.to_string());
            host.mark_unsaved();
        }
    }

    #[allow(missing_docs)]
    pub fn global_params(&self) -> &[Parameter] {
        &self.global_params
    }

    #[allow(missing_docs)]
    pub fn voice_params(&self) -> &[Parameter] {
        &self.voice_params
    }

    /// Finds a global parameter by name.
    pub fn global_param_index(&self, name: &str) -> Result<usize, ParamError> {
        self.global_params
            .iter()
            .position(|p| p.name() == name)
            .ok_or_else(|| ParamError::UnknownName {
                scope: ParamScope::Global,
                name: name.to_string(),
            })
    }

    /// Finds a per-voice parameter by name.
    pub fn voice_param_index(&self, name: &str) -> Result<usize, ParamError> {
        self.voice_params
            .iter()
            .position(|p| p.name() == name)
            .ok_or_else(|| ParamError::UnknownName {
                scope: ParamScope::Voice(0),
                name: name.to_string(),
            })
    }

    /// Resolves a name within a scope into a [ParamRef], checking the voice
    /// index.
    pub fn param_ref(&self, scope: ParamScope, name: &str) -> Result<ParamRef, ParamError> {
        match scope {
            ParamScope::Global => Ok(ParamRef::Global(self.global_param_index(name)?)),
            ParamScope::Voice(voice) => {
                if voice >= self.voices {
                    return Err(ParamError::VoiceOutOfRange {
                        voice,
                        voices: self.voices,
                    });
                }
                let index = self.voice_param_index(name).map_err(|_| ParamError::UnknownName {
                    scope,
                    name: name.to_string(),
                })?;
                Ok(ParamRef::Voice { voice, index })
            }
        }
    }

    /// Returns the [Parameter] a reference points to, rejecting anything out
    /// of range.
    pub fn param(&self, param: ParamRef) -> Result<&Parameter, ParamError> {
        match param {
            ParamRef::Global(index) => {
                self.global_params
                    .get(index)
                    .ok_or(ParamError::IndexOutOfRange {
                        index,
                        count: self.global_params.len(),
                    })
            }
            ParamRef::Voice { voice, index } => {
                if voice >= self.voices {
                    return Err(ParamError::VoiceOutOfRange {
                        voice,
                        voices: self.voices,
                    });
                }
                self.voice_params
                    .get(index)
                    .ok_or(ParamError::IndexOutOfRange {
                        index,
                        count: self.voice_params.len(),
                    })
            }
        }
    }

    /// Reads a parameter's live value. Triggers have none.
    pub fn param_value(&self, param: ParamRef) -> Result<Option<ParamValue>, ParamError> {
        let name = self.param(param)?.name();
        Ok(match param {
            ParamRef::Global(_) => self.unit.property(name),
            ParamRef::Voice { voice, .. } => self
                .unit
                .as_polyphonic()
                .and_then(|p| p.voice(voice))
                .and_then(|v| v.property(name)),
        })
    }

    /// Writes a parameter's live value.
    pub fn set_param_value(&mut self, param: ParamRef, value: ParamValue) -> Result<(), ParamError> {
        let parameter = self.param(param)?;
        if value.value_type() != parameter.value_type() {
            return Err(ParamError::TypeMismatch {
                name: parameter.name().to_string(),
                expected: parameter.value_type(),
                actual: value.value_type(),
            });
        }
        let name = parameter.name().to_string();
        let result = match param {
            ParamRef::Global(_) => self.unit.set_property(&name, value),
            ParamRef::Voice { voice, .. } => {
                match self
                    .unit
                    .as_polyphonic_mut()
                    .and_then(|p| p.voice_mut(voice))
                {
                    Some(v) => v.set_property(&name, value),
                    None => {
                        return Err(ParamError::VoiceOutOfRange {
                            voice,
                            voices: self.voices,
                        })
                    }
                }
            }
        };
        result.map_err(|e| ParamError::Rejected {
            name,
            reason: e.to_string(),
        })
    }

    /// The first global parameter that selects a wave table entry.
    pub fn global_wave_param_index(&self) -> Option<usize> {
        self.global_params.iter().position(|p| p.is_wave())
    }

    /// The first per-voice parameter that selects a wave table entry.
    pub fn voice_wave_param_index(&self) -> Option<usize> {
        self.voice_params.iter().position(|p| p.is_wave())
    }

    /// Renders a value the way the unit would like it shown. Returns None if
    /// the unit has no opinion.
    pub fn describe_param_value(
        &self,
        param: ParamRef,
        value: &ParamValue,
    ) -> Result<Option<String>, ParamError> {
        let name = self.param(param)?.name();
        Ok(self
            .unit
            .as_describes_values()
            .and_then(|d| d.describe_value(name, value)))
    }

    /// Bounds and default of a parameter.
    pub fn param_details(&self, param: ParamRef) -> Result<ParamDetails, ParamError> {
        let parameter = self.param(param)?;
        Ok(ParamDetails {
            min: parameter.min().cloned(),
            max: parameter.max().cloned(),
            default: parameter.default_value(),
        })
    }

    /// How many voices the machine currently has. Zero for monophonic
    /// machines.
    pub fn voice_count(&self) -> usize {
        self.voices
    }
}
