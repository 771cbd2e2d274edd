// Copyright (c) 2024 Mike Tsao

use super::{TestEffect, TestHost, TestSink, TestSynth};
use crate::{
    machine::{Machine, MachineKind, MachineParams},
    unit::UnitFactory,
    util::MachineSettings,
};

/// Registers every test unit with the factory.
pub fn register_test_units(factory: &mut UnitFactory) -> anyhow::Result<()> {
    factory.register_unit_with_str_key(TestSynth::UNIT_KEY, || Box::new(TestSynth::default()))?;
    factory.register_unit_with_str_key(TestSynth::NO_VOICES_UNIT_KEY, || {
        Box::new(TestSynth::new_without_voices())
    })?;
    factory.register_unit_with_str_key(TestEffect::UNIT_KEY, || Box::new(TestEffect::default()))?;
    factory.register_unit_with_str_key(TestEffect::INT_UNIT_KEY, || {
        Box::new(TestEffect::new_with_int_input())
    })?;
    factory.register_unit_with_str_key(TestSink::UNIT_KEY, || Box::new(TestSink::default()))?;
    Ok(())
}

/// A finalized factory that knows every test unit.
pub fn test_factory() -> UnitFactory {
    let mut factory = UnitFactory::default();
    if let Err(e) = register_test_units(&mut factory) {
        log::error!("couldn't register test units: {e}");
    }
    factory.finalize()
}

/// Builds a machine around a test unit with default settings. Panics if the
/// unit and kind don't fit together.
pub fn test_machine(
    host: &mut TestHost,
    id: &str,
    key: &str,
    kind: MachineKind,
    voices: usize,
) -> Machine {
    test_machine_with_settings(host, id, key, kind, voices, &MachineSettings::default())
}

/// Like [test_machine()], with the given settings.
pub fn test_machine_with_settings(
    host: &mut TestHost,
    id: &str,
    key: &str,
    kind: MachineKind,
    voices: usize,
    settings: &MachineSettings,
) -> Machine {
    let params = MachineParams {
        id: id.into(),
        plugin_name: key.to_string(),
        kind,
        voices,
    };
    match Machine::new(host, &test_factory(), settings, params) {
        Ok(machine) => machine,
        Err(e) => panic!("test machine {id} ({key}) couldn't be built: {e}"),
    }
}
