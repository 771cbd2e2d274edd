// Copyright (c) 2024 Mike Tsao

use crate::{
    types::{Caps, ParamValue, SampleFormat, SongTempo},
    unit::{
        DescribesValues, EnumValue, PadCounts, ParamKind, ParamSpec, Parameterized, Passthrough,
        Polyphonic, PropertyMeta, TempoAware, Unit,
    },
};
use anyhow::{anyhow, Result};
use rustc_hash::FxHashMap;

/// Declared properties plus their current values, all starting at their
/// declared defaults.
#[derive(Debug)]
struct PropertyBag {
    specs: Vec<ParamSpec>,
    values: FxHashMap<String, ParamValue>,
}
impl PropertyBag {
    fn new_with(specs: Vec<ParamSpec>) -> Self {
        let values = specs
            .iter()
            .filter_map(|s| s.kind.default_value().map(|v| (s.name.clone(), v)))
            .collect();
        Self { specs, values }
    }

    fn get(&self, name: &str) -> Option<ParamValue> {
        let spec = self.specs.iter().find(|s| s.name == name)?;
        if !spec.readable {
            return None;
        }
        self.values.get(name).cloned()
    }

    fn set(&mut self, name: &str, value: ParamValue) -> Result<()> {
        let spec = self
            .specs
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| anyhow!("no property named '{name}'"))?;
        if spec.kind.value_type() != Some(value.value_type()) {
            return Err(anyhow!("'{name}' can't hold {value}"));
        }
        if let ParamValue::Enum(code) = value {
            if !spec.kind.is_valid_enum_code(code) {
                return Err(anyhow!("{code} isn't a valid code for '{name}'"));
            }
        }
        self.values.insert(name.to_string(), value);
        Ok(())
    }
}

fn double(name: &str, min: f64, max: f64, default: f64) -> ParamSpec {
    ParamSpec::new_with(name, ParamKind::Double { min, max, default })
}

fn read_only_counter(name: &str) -> ParamSpec {
    ParamSpec {
        controllable: false,
        ..ParamSpec::new_with(
            name,
            ParamKind::UInt {
                min: 0,
                max: u32::MAX,
                default: 0,
            },
        )
    }
}

/// One voice of a [TestSynth].
#[derive(Debug)]
pub struct TestVoice {
    properties: PropertyBag,
}
impl Default for TestVoice {
    fn default() -> Self {
        Self {
            properties: PropertyBag::new_with(vec![
                double("cutoff", 20.0, 20000.0, 1000.0),
                double("volume", 0.0, 1.0, 0.8),
            ]),
        }
    }
}
impl Parameterized for TestVoice {
    fn param_specs(&self) -> &[ParamSpec] {
        &self.properties.specs
    }

    fn property(&self, name: &str) -> Option<ParamValue> {
        self.properties.get(name)
    }

    fn set_property(&mut self, name: &str, value: ParamValue) -> Result<()> {
        self.properties.set(name, value)
    }
}

/// A polyphonic source whose properties cover every kind the machine layer
/// distinguishes: a trigger (`note`), state values of several types, a wave
/// selector, a non-controllable string, an unhandled type, and a `volume`
/// that its voices shadow. Every fired note is counted in the read-only
/// `note-count` and `last-note` properties, and the last tempo it was told
/// about shows up in `bpm`.
#[derive(Debug)]
pub struct TestSynth {
    properties: PropertyBag,
    voices: Vec<TestVoice>,
    note_count: u32,
    last_note: u32,
    tempo: Option<SongTempo>,
}
impl Default for TestSynth {
    fn default() -> Self {
        let mut specs = vec![
            ParamSpec {
                readable: false,
                ..ParamSpec::new_with(
                    "note",
                    ParamKind::UInt {
                        min: 0,
                        max: 127,
                        default: 0,
                    },
                )
            },
            ParamSpec {
                meta: Some(PropertyMeta {
                    is_state: true,
                    is_wave: true,
                    min: Some(ParamValue::UInt(1)),
                    max: Some(ParamValue::UInt(200)),
                    no_value: Some(ParamValue::UInt(0)),
                }),
                ..ParamSpec::new_with(
                    "wave",
                    ParamKind::UInt {
                        min: 0,
                        max: 200,
                        default: 0,
                    },
                )
            },
            ParamSpec {
                controllable: false,
                ..ParamSpec::new_with(
                    "label",
                    ParamKind::String {
                        default: "synth".to_string(),
                    },
                )
            },
        ];
        specs.extend([
            double("volume", 0.0, 1.0, 0.8),
            ParamSpec::new_with(
                "shape",
                ParamKind::Enum {
                    values: vec![
                        EnumValue::new_with(0, "sine"),
                        EnumValue::new_with(1, "saw"),
                        EnumValue::new_with(4, "square"),
                        EnumValue::new_with(8, "noise"),
                    ],
                    default: 0,
                },
            ),
            ParamSpec::new_with(
                "routing",
                ParamKind::Other {
                    type_name: "Structure".to_string(),
                },
            ),
            read_only_counter("note-count"),
            read_only_counter("last-note"),
            read_only_counter("bpm"),
        ]);
        Self {
            properties: PropertyBag::new_with(specs),
            voices: vec![TestVoice::default()],
            note_count: 0,
            last_note: 0,
            tempo: None,
        }
    }
}
impl TestSynth {
    #[allow(missing_docs)]
    pub const UNIT_KEY: &'static str = "test-synth";
    /// Key of the variant that starts out with no voices at all.
    pub const NO_VOICES_UNIT_KEY: &'static str = "test-synth-no-voices";

    /// The variant registered as [TestSynth::NO_VOICES_UNIT_KEY].
    pub fn new_without_voices() -> Self {
        Self {
            voices: Vec::default(),
            ..Default::default()
        }
    }
}
impl Parameterized for TestSynth {
    fn param_specs(&self) -> &[ParamSpec] {
        &self.properties.specs
    }

    fn property(&self, name: &str) -> Option<ParamValue> {
        match name {
            "note-count" => Some(ParamValue::UInt(self.note_count)),
            "last-note" => Some(ParamValue::UInt(self.last_note)),
            "bpm" => self.tempo.map(|t| ParamValue::UInt(t.bpm)),
            _ => self.properties.get(name),
        }
    }

    fn set_property(&mut self, name: &str, value: ParamValue) -> Result<()> {
        match name {
            "note" => {
                let ParamValue::UInt(note) = value else {
                    return Err(anyhow!("'note' can't hold {value}"));
                };
                self.note_count += 1;
                self.last_note = note;
                Ok(())
            }
            "note-count" | "last-note" | "bpm" => Err(anyhow!("'{name}' is read-only")),
            _ => self.properties.set(name, value),
        }
    }
}
impl Unit for TestSynth {
    fn pad_counts(&self) -> PadCounts {
        PadCounts { src: 1, sink: 0 }
    }

    fn as_polyphonic(&self) -> Option<&dyn Polyphonic> {
        Some(self)
    }

    fn as_polyphonic_mut(&mut self) -> Option<&mut dyn Polyphonic> {
        Some(self)
    }

    fn as_tempo_aware(&self) -> Option<&dyn TempoAware> {
        Some(self)
    }

    fn as_tempo_aware_mut(&mut self) -> Option<&mut dyn TempoAware> {
        Some(self)
    }

    fn as_describes_values(&self) -> Option<&dyn DescribesValues> {
        Some(self)
    }
}
impl Polyphonic for TestSynth {
    fn voice_count(&self) -> usize {
        self.voices.len()
    }

    fn set_voice_count(&mut self, count: usize) {
        self.voices.truncate(count);
        self.voices.resize_with(count, TestVoice::default);
    }

    fn voice(&self, index: usize) -> Option<&dyn Parameterized> {
        self.voices.get(index).map(|v| v as &dyn Parameterized)
    }

    fn voice_mut(&mut self, index: usize) -> Option<&mut dyn Parameterized> {
        self.voices
            .get_mut(index)
            .map(|v| v as &mut dyn Parameterized)
    }
}
impl TempoAware for TestSynth {
    fn update_tempo(&mut self, tempo: SongTempo) {
        self.tempo = Some(tempo);
    }
}
impl DescribesValues for TestSynth {
    fn describe_value(&self, name: &str, value: &ParamValue) -> Option<String> {
        match (name, value) {
            ("note", ParamValue::UInt(note)) => Some(format!("note {note}")),
            _ => None,
        }
    }
}

/// A one-in, one-out processor with a float, a boolean, an enum, and an int
/// parameter.
#[derive(Debug)]
pub struct TestEffect {
    properties: PropertyBag,
    sink_caps: Caps,
    has_passthrough: bool,
    is_passthrough: bool,
}
impl Default for TestEffect {
    fn default() -> Self {
        Self {
            properties: PropertyBag::new_with(vec![
                ParamSpec::new_with(
                    "mix",
                    ParamKind::Float {
                        min: 0.0,
                        max: 1.0,
                        default: 0.5,
                    },
                ),
                ParamSpec::new_with("enabled", ParamKind::Boolean { default: true }),
                ParamSpec::new_with(
                    "mode",
                    ParamKind::Enum {
                        values: vec![
                            EnumValue::new_with(0, "clean"),
                            EnumValue::new_with(1, "warm"),
                        ],
                        default: 0,
                    },
                ),
                ParamSpec::new_with(
                    "gain",
                    ParamKind::Int {
                        min: -24,
                        max: 24,
                        default: 0,
                    },
                ),
            ]),
            sink_caps: Caps::canonical_mixer(),
            has_passthrough: true,
            is_passthrough: false,
        }
    }
}
impl TestEffect {
    #[allow(missing_docs)]
    pub const UNIT_KEY: &'static str = "test-effect";
    /// Key of the variant that accepts only 16-bit integer input and can't
    /// pass its input through.
    pub const INT_UNIT_KEY: &'static str = "test-effect-int";

    /// The variant registered as [TestEffect::INT_UNIT_KEY].
    pub fn new_with_int_input() -> Self {
        Self {
            sink_caps: Caps {
                formats: vec![SampleFormat::S16],
                ..Caps::any()
            },
            has_passthrough: false,
            ..Default::default()
        }
    }
}
impl Parameterized for TestEffect {
    fn param_specs(&self) -> &[ParamSpec] {
        &self.properties.specs
    }

    fn property(&self, name: &str) -> Option<ParamValue> {
        self.properties.get(name)
    }

    fn set_property(&mut self, name: &str, value: ParamValue) -> Result<()> {
        self.properties.set(name, value)
    }
}
impl Unit for TestEffect {
    fn pad_counts(&self) -> PadCounts {
        PadCounts { src: 1, sink: 1 }
    }

    fn sink_caps(&self) -> Option<Caps> {
        Some(self.sink_caps.clone())
    }

    fn as_passthrough(&self) -> Option<&dyn Passthrough> {
        if self.has_passthrough {
            Some(self)
        } else {
            None
        }
    }

    fn as_passthrough_mut(&mut self) -> Option<&mut dyn Passthrough> {
        if self.has_passthrough {
            Some(self)
        } else {
            None
        }
    }
}
impl Passthrough for TestEffect {
    fn set_passthrough(&mut self, is_passthrough: bool) {
        self.is_passthrough = is_passthrough;
    }

    fn is_passthrough(&self) -> bool {
        self.is_passthrough
    }
}

/// Consumes audio and does nothing with it, like a master output.
#[derive(Debug)]
pub struct TestSink {
    properties: PropertyBag,
}
impl Default for TestSink {
    fn default() -> Self {
        Self {
            properties: PropertyBag::new_with(vec![double("volume", 0.0, 1.0, 1.0)]),
        }
    }
}
impl TestSink {
    #[allow(missing_docs)]
    pub const UNIT_KEY: &'static str = "test-sink";
}
impl Parameterized for TestSink {
    fn param_specs(&self) -> &[ParamSpec] {
        &self.properties.specs
    }

    fn property(&self, name: &str) -> Option<ParamValue> {
        self.properties.get(name)
    }

    fn set_property(&mut self, name: &str, value: ParamValue) -> Result<()> {
        self.properties.set(name, value)
    }
}
impl Unit for TestSink {
    fn pad_counts(&self) -> PadCounts {
        PadCounts { src: 0, sink: 1 }
    }

    fn sink_caps(&self) -> Option<Caps> {
        Some(Caps::any())
    }
}
