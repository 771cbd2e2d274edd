// Copyright (c) 2024 Mike Tsao

use ensnare_machines::{
    prelude::*,
    testing::{test_factory, TestEffect, TestPipeline, TestSink, TestSynth},
};
use float_cmp::approx_eq;

fn new_setup() -> Setup<TestPipeline> {
    let _ = env_logger::builder().is_test(true).try_init();
    Setup::new_with(
        TestPipeline::default(),
        test_factory(),
        MachineSettings::default(),
    )
}

fn add(setup: &mut Setup<TestPipeline>, id: &str, key: &str, kind: MachineKind) -> MachineId {
    setup
        .add_machine(
            MachineParamsBuilder::default()
                .id(id)
                .plugin_name(key)
                .kind(kind)
                .voices(1usize)
                .build()
                .unwrap(),
        )
        .unwrap()
}

fn global(setup: &Setup<TestPipeline>, id: &MachineId, name: &str) -> Option<ParamValue> {
    let machine = setup.machine(id).unwrap();
    let param = machine.param_ref(ParamScope::Global, name).unwrap();
    machine.param_value(param).unwrap()
}

#[test]
fn tempo_reaches_every_tempo_aware_machine() {
    let mut setup = new_setup();
    let early = add(&mut setup, "early", TestSynth::UNIT_KEY, MachineKind::Source);
    add(&mut setup, "fx", TestEffect::UNIT_KEY, MachineKind::Processor);

    setup.update_tempo(SongTempo { bpm: 140, tpb: 4 });
    assert_eq!(
        setup.machine(&early).unwrap().unit().property("bpm"),
        Some(ParamValue::UInt(140))
    );

    let late = add(&mut setup, "late", TestSynth::UNIT_KEY, MachineKind::Source);
    assert_eq!(
        setup.machine(&late).unwrap().unit().property("bpm"),
        Some(ParamValue::UInt(140)),
        "machines added later should start at the current tempo"
    );
    assert_eq!(setup.tempo().bpm, 140);
}

#[test]
fn patterns_follow_voice_count() {
    let mut setup = new_setup();
    let synth = add(&mut setup, "synth", TestSynth::UNIT_KEY, MachineKind::Source);
    setup.take_events();

    let pattern = setup.add_pattern(&synth, "intro", false).unwrap();
    assert_eq!(setup.pattern_voices(pattern), Some(1));
    assert!(setup.add_pattern(&synth, "intro", false).is_err());

    let (machine, host) = setup.machine_and_host_mut(&synth).unwrap();
    machine.set_voice_count(host, 3);
    assert_eq!(setup.pattern_voices(pattern), Some(3));
    let events = setup.take_events();
    assert_eq!(
        events,
        vec![
            MachineEvent::PatternAdded {
                machine: synth.clone(),
                pattern
            },
            MachineEvent::VoicesChanged {
                machine: synth.clone(),
                voices: 3
            },
        ]
    );

    setup.remove_pattern(&synth, pattern).unwrap();
    assert_eq!(setup.pattern_voices(pattern), None);
    assert!(setup.remove_pattern(&synth, pattern).is_err());
}

#[test]
fn saved_machines_come_back_the_same() {
    let mut setup = new_setup();
    let synth = add(&mut setup, "synth", TestSynth::UNIT_KEY, MachineKind::Source);
    let master = add(&mut setup, "master", TestSink::UNIT_KEY, MachineKind::Sink);
    setup.connect(&synth, &master).unwrap();
    setup.add_pattern(&synth, "verse", false).unwrap();
    setup.add_pattern(&synth, "scratch", true).unwrap();
    {
        let (machine, host) = setup.machine_and_host_mut(&synth).unwrap();
        machine.set_voice_count(host, 2);
        machine.set_property(host, "color", "teal");
        let shape = machine.param_ref(ParamScope::Global, "shape").unwrap();
        machine.set_param_value(shape, ParamValue::Enum(4)).unwrap();
        let cutoff = machine.param_ref(ParamScope::Voice(1), "cutoff").unwrap();
        machine
            .set_param_value(cutoff, ParamValue::Double(440.0))
            .unwrap();
    }

    let saved = setup.machine_data();
    assert_eq!(saved.len(), 2);
    let json = serde_json::to_string(&saved).unwrap();
    let loaded: Vec<MachineData> = serde_json::from_str(&json).unwrap();
    assert_eq!(loaded, saved);

    let data = &loaded[0];
    assert_eq!(data.patterns, vec!["verse".to_string()], "internal patterns stay out");
    assert!(
        data.global_data.iter().all(|g| g.name != "note"),
        "triggers aren't saved"
    );

    let mut restored = new_setup();
    for data in loaded.iter() {
        let id = restored
            .add_machine(
                MachineParamsBuilder::default()
                    .id(data.id.clone())
                    .plugin_name(data.plugin_name.clone())
                    .kind(data.kind)
                    .build()
                    .unwrap(),
            )
            .unwrap();
        let (machine, host) = restored.machine_and_host_mut(&id).unwrap();
        machine.restore(host, data, None);
    }

    let machine = restored.machine(&synth).unwrap();
    assert_eq!(machine.voice_count(), 2);
    assert_eq!(machine.properties().get("color").map(String::as_str), Some("teal"));
    assert_eq!(global(&restored, &synth, "shape"), Some(ParamValue::Enum(4)));
    let cutoff = machine.param_ref(ParamScope::Voice(1), "cutoff").unwrap();
    assert_eq!(
        machine.param_value(cutoff).unwrap(),
        Some(ParamValue::Double(440.0))
    );
    assert_eq!(restored.machine_data(), saved);
}

#[test]
fn automation_replays_from_the_top() {
    let mut setup = new_setup();
    let synth = add(&mut setup, "synth", TestSynth::UNIT_KEY, MachineKind::Source);
    let machine = setup.machine_mut(&synth).unwrap();
    let cutoff = machine.param_ref(ParamScope::Voice(0), "cutoff").unwrap();

    machine
        .set_control_point(cutoff, Timestamp(96), Some(ParamValue::Double(5000.0)))
        .unwrap();
    let points = machine.control_points(cutoff).unwrap();
    assert_eq!(points.len(), 2);
    assert_eq!(points[0], (Timestamp::ZERO, ParamValue::Double(1000.0)));

    machine.sync_values(Timestamp(96));
    let Some(ParamValue::Double(v)) = machine.param_value(cutoff).unwrap() else {
        panic!("cutoff should be a double");
    };
    assert!(approx_eq!(f64, v, 5000.0));

    machine.sync_values(Timestamp::ZERO);
    let Some(ParamValue::Double(v)) = machine.param_value(cutoff).unwrap() else {
        panic!("cutoff should be a double");
    };
    assert!(
        approx_eq!(f64, v, 1000.0),
        "playing from the top should restore the value from before automation, got {v}"
    );

    machine
        .set_control_point(cutoff, Timestamp(96), None)
        .unwrap();
    assert!(!machine.is_controlled(cutoff).unwrap());
}
