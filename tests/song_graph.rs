// Copyright (c) 2024 Mike Tsao

use ensnare_machines::{
    machine::ConstructionError,
    prelude::*,
    testing::{test_factory, TestEffect, TestPipeline, TestSink, TestSynth},
};

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

// Two sources feed one effect, which feeds the master. The second wire into
// the effect should turn on its adder without disturbing the first.
#[test]
fn fan_in_activates_adder() {
    let mut setup = new_setup();
    let s1 = add(&mut setup, "s1", TestSynth::UNIT_KEY, MachineKind::Source);
    let s2 = add(&mut setup, "s2", TestSynth::UNIT_KEY, MachineKind::Source);
    let fx = add(&mut setup, "fx", TestEffect::UNIT_KEY, MachineKind::Processor);
    let master = add(&mut setup, "master", TestSink::UNIT_KEY, MachineKind::Sink);

    let w1 = setup.connect(&s1, &fx).unwrap();
    assert!(!setup.machine(&fx).unwrap().has_active_adder());
    let w2 = setup.connect(&s2, &fx).unwrap();
    setup.connect(&fx, &master).unwrap();

    let effect = setup.machine(&fx).unwrap();
    assert!(effect.has_active_adder());
    assert!(effect.verify_chain(setup.pipeline()));
    let adder = effect.slot_element(Slot::Adder).unwrap();
    assert_eq!(setup.pipeline().request_pad_count(adder), 2);
    for uid in [w1, w2] {
        let wire = setup.wire(uid).unwrap();
        assert_eq!(
            setup.pipeline().element_of_pad(wire.dst_machine_pad),
            Some(adder),
            "every incoming wire should land on the adder"
        );
        assert_eq!(setup.pipeline().peer(wire.src_pad), Some(wire.dst_machine_pad));
    }

    setup.disconnect(w2).unwrap();
    assert_eq!(setup.pipeline().request_pad_count(adder), 1);
    assert!(
        setup.machine(&fx).unwrap().has_active_adder(),
        "the adder stays once it's been needed"
    );
    assert_eq!(setup.wire_by_dst_machine(&s1, &fx), Some(w1));
    assert!(setup.wire_by_dst_machine(&s2, &fx).is_none());
}

#[test]
fn fan_out_activates_spreader() {
    let mut setup = new_setup();
    let synth = add(&mut setup, "synth", TestSynth::UNIT_KEY, MachineKind::Source);
    let fx = add(&mut setup, "fx", TestEffect::UNIT_KEY, MachineKind::Processor);
    let master = add(&mut setup, "master", TestSink::UNIT_KEY, MachineKind::Sink);

    let first = setup.connect(&synth, &fx).unwrap();
    setup.connect(&synth, &master).unwrap();

    let m = setup.machine(&synth).unwrap();
    assert!(m.has_active_spreader());
    assert!(m.verify_chain(setup.pipeline()));
    let spreader = m.slot_element(Slot::Spreader).unwrap();
    assert_eq!(setup.pipeline().request_pad_count(spreader), 2);
    let wire = setup.wire(first).unwrap();
    assert_eq!(
        setup.pipeline().element_of_pad(wire.src_machine_pad),
        Some(spreader),
        "the existing wire should have moved onto the spreader"
    );
}

#[test]
fn bad_connections_are_refused() {
    let mut setup = new_setup();
    let synth = add(&mut setup, "synth", TestSynth::UNIT_KEY, MachineKind::Source);
    let fx = add(&mut setup, "fx", TestEffect::UNIT_KEY, MachineKind::Processor);
    let master = add(&mut setup, "master", TestSink::UNIT_KEY, MachineKind::Sink);

    assert!(setup.connect(&master, &fx).is_err(), "sinks have no output");
    assert!(setup.connect(&fx, &synth).is_err(), "sources have no input");
    assert!(setup.connect(&fx, &fx).is_err());
    assert!(setup.connect(&synth, &MachineId::from("nobody")).is_err());
    assert!(setup.connect(&synth, &fx).is_ok());
    assert!(setup.connect(&synth, &fx).is_err(), "one wire per pair");

    assert!(matches!(
        setup.add_machine(
            MachineParamsBuilder::default()
                .id("synth")
                .plugin_name(TestSynth::UNIT_KEY)
                .kind(MachineKind::Source)
                .build()
                .unwrap()
        ),
        Err(ConstructionError::DuplicateId(_))
    ));
}

#[test]
fn removing_a_machine_removes_its_wires() {
    let mut setup = new_setup();
    let synth = add(&mut setup, "synth", TestSynth::UNIT_KEY, MachineKind::Source);
    let fx = add(&mut setup, "fx", TestEffect::UNIT_KEY, MachineKind::Processor);
    let master = add(&mut setup, "master", TestSink::UNIT_KEY, MachineKind::Sink);
    setup.connect(&synth, &fx).unwrap();
    setup.connect(&fx, &master).unwrap();
    setup.mark_clean();

    setup.remove_machine(&fx).unwrap();
    assert!(setup.is_unsaved());
    assert!(setup.machine(&fx).is_none());
    assert!(setup.wire_by_dst_machine(&synth, &fx).is_none());
    assert!(setup.wire_by_dst_machine(&fx, &master).is_none());
    assert_eq!(
        setup.pipeline().element_count(),
        2,
        "only the two remaining units should be left"
    );
    assert!(setup.pipeline().links().is_empty());
    assert_eq!(setup.machine_ids(), &[synth, master]);

    assert!(setup.remove_machine(&fx).is_err());
}

#[test]
fn a_failed_wire_leaves_nothing_behind() {
    let mut setup = new_setup();
    let synth = add(&mut setup, "synth", TestSynth::UNIT_KEY, MachineKind::Source);
    let master = add(&mut setup, "master", TestSink::UNIT_KEY, MachineKind::Sink);
    let elements = setup.pipeline().element_count();
    let links = setup.pipeline().links();

    // The queue's first link goes through; its second is refused.
    setup.pipeline_mut().fail_nth_link(1);
    assert!(setup.connect(&synth, &master).is_err());
    assert_eq!(setup.pipeline().element_count(), elements);
    assert_eq!(setup.pipeline().links(), links);
    assert!(setup.wire_by_dst_machine(&synth, &master).is_none());

    assert!(setup.connect(&synth, &master).is_ok());
}

// Gain slots spliced in at the ends of a chain take over the wire's
// attachment, and the wire's record has to follow.
#[test]
fn wires_follow_splices_at_machine_edges() {
    let mut setup = new_setup();
    let synth = add(&mut setup, "synth", TestSynth::UNIT_KEY, MachineKind::Source);
    let master = add(&mut setup, "master", TestSink::UNIT_KEY, MachineKind::Sink);
    let uid = setup.connect(&synth, &master).unwrap();

    {
        let (machine, host) = setup.machine_and_host_mut(&synth).unwrap();
        machine.enable_output_gain(host).unwrap();
    }
    {
        let (machine, host) = setup.machine_and_host_mut(&master).unwrap();
        machine.enable_input_gain(host).unwrap();
    }

    let wire = setup.wire(uid).unwrap().clone();
    assert_eq!(
        setup.pipeline().peer(wire.sink_pad),
        Some(wire.src_machine_pad),
        "the wire should know it now leaves through the output gain"
    );
    assert_eq!(
        setup.machine(&synth).unwrap().slot_element(Slot::OutputGain),
        setup.pipeline().element_of_pad(wire.src_machine_pad)
    );
    assert_eq!(setup.pipeline().peer(wire.src_pad), Some(wire.dst_machine_pad));
    assert_eq!(
        setup.machine(&master).unwrap().slot_element(Slot::InputGain),
        setup.pipeline().element_of_pad(wire.dst_machine_pad)
    );

    setup.disconnect(uid).unwrap();
    assert!(
        setup.pipeline().peer(wire.src_machine_pad).is_none()
            && setup.pipeline().peer(wire.dst_machine_pad).is_none(),
        "disconnecting should free both machine pads"
    );
    assert!(setup.machine(&synth).unwrap().verify_chain(setup.pipeline()));
}
