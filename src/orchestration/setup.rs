// Copyright (c) 2024 Mike Tsao

use super::{GraphHost, MachineEvent, Wire, WireEnd, WireRepository};
use crate::{
    machine::{
        ConstructionError, Machine, MachineData, MachineKind, MachineParams, MachineState,
        PatternInfo, StateError,
    },
    types::{MachineId, PadId, PatternUid, SongTempo, UidFactory, WireUid},
    unit::{factories, PadDirection, Pipeline, UnitFactory},
    util::MachineSettings,
};
use anyhow::{anyhow, Result};
use rustc_hash::{FxHashMap, FxHashSet};

/// Everything in the song graph except the machines themselves. Machines get
/// this as their [GraphHost] while the graph lends them out.
#[derive(Debug)]
pub struct SetupHost<P: Pipeline> {
    pipeline: P,
    wires: WireRepository,
    pattern_uid_factory: UidFactory<PatternUid>,
    pattern_voices: FxHashMap<PatternUid, usize>,
    events: Vec<MachineEvent>,
    is_unsaved: bool,
}
impl<P: Pipeline> GraphHost for SetupHost<P> {
    fn pipeline(&self) -> &dyn Pipeline {
        &self.pipeline
    }

    fn pipeline_mut(&mut self) -> &mut dyn Pipeline {
        &mut self.pipeline
    }

    fn reconnect_wire(
        &mut self,
        machine: &MachineId,
        end: WireEnd,
        peer: PadId,
        pad: PadId,
    ) -> Result<()> {
        let wire = self
            .wires
            .wire_by_peer_mut(machine, end, peer)
            .ok_or_else(|| anyhow!("no wire at {end} of {machine} through pad {peer}"))?;
        match end {
            WireEnd::Input => {
                self.pipeline.link(peer, pad)?;
                wire.dst_machine_pad = pad;
            }
            WireEnd::Output => {
                self.pipeline.link(pad, peer)?;
                wire.src_machine_pad = pad;
            }
        }
        log::debug!("wire {} now attaches to {machine} at pad {pad}", wire.uid);
        Ok(())
    }

    fn resize_pattern_voices(&mut self, pattern: PatternUid, voices: usize) {
        self.pattern_voices.insert(pattern, voices);
    }

    fn notify(&mut self, event: MachineEvent) {
        self.events.push(event);
    }

    fn mark_unsaved(&mut self) {
        self.is_unsaved = true;
    }
}

/// A song graph: machines, the wires between them, and the pipeline that
/// carries their audio.
#[derive(Debug)]
pub struct Setup<P: Pipeline> {
    factory: UnitFactory,
    settings: MachineSettings,
    machines: FxHashMap<MachineId, Machine>,
    machine_order: Vec<MachineId>,
    tempo: SongTempo,
    tempo_subscribers: FxHashSet<MachineId>,
    host: SetupHost<P>,
}
impl<P: Pipeline> Setup<P> {
    #[allow(missing_docs)]
    pub fn new_with(pipeline: P, factory: UnitFactory, settings: MachineSettings) -> Self {
        Self {
            factory,
            settings,
            machines: Default::default(),
            machine_order: Default::default(),
            tempo: Default::default(),
            tempo_subscribers: Default::default(),
            host: SetupHost {
                pipeline,
                wires: Default::default(),
                pattern_uid_factory: Default::default(),
                pattern_voices: Default::default(),
                events: Default::default(),
                is_unsaved: false,
            },
        }
    }

    /// Builds a machine and adds it to the song. Tempo-aware machines start
    /// receiving tempo changes right away, beginning with the current tempo.
    pub fn add_machine(&mut self, params: MachineParams) -> Result<MachineId, ConstructionError> {
        if self.machines.contains_key(&params.id) {
            return Err(ConstructionError::DuplicateId(params.id));
        }
        let mut machine = Machine::new(&mut self.host, &self.factory, &self.settings, params)?;
        let id = machine.id().clone();
        if machine.is_tempo_aware() {
            machine.update_tempo(self.tempo);
            self.tempo_subscribers.insert(id.clone());
        }
        log::debug!("added {} machine {id}", machine.kind());
        self.machines.insert(id.clone(), machine);
        self.machine_order.push(id.clone());
        self.host.mark_unsaved();
        Ok(id)
    }

    /// Removes a machine along with every wire attached to it.
    pub fn remove_machine(&mut self, id: &MachineId) -> Result<()> {
        if !self.machines.contains_key(id) {
            return Err(anyhow!("machine {id} not found"));
        }
        let mut attached = self.host.wires.incoming(id);
        attached.extend(self.host.wires.outgoing(id));
        for uid in attached {
            self.disconnect(uid)?;
        }
        self.tempo_subscribers.remove(id);
        self.machine_order.retain(|m| m != id);
        if let Some(machine) = self.machines.remove(id) {
            machine.dispose(&mut self.host.pipeline);
        }
        self.host.mark_unsaved();
        Ok(())
    }

    #[allow(missing_docs)]
    pub fn machine(&self, id: &MachineId) -> Option<&Machine> {
        self.machines.get(id)
    }

    #[allow(missing_docs)]
    pub fn machine_mut(&mut self, id: &MachineId) -> Option<&mut Machine> {
        self.machines.get_mut(id)
    }

    /// Lends out a machine together with the host it needs for operations
    /// that reach outside itself.
    pub fn machine_and_host_mut(
        &mut self,
        id: &MachineId,
    ) -> Option<(&mut Machine, &mut dyn GraphHost)> {
        let machine = self.machines.get_mut(id)?;
        Some((machine, &mut self.host))
    }

    /// Machine ids in the order they were added.
    pub fn machine_ids(&self) -> &[MachineId] {
        &self.machine_order
    }

    /// Connects `src`'s output to `dst`'s input. The second wire into a
    /// machine turns on its adder, and the second wire out of one turns on
    /// its spreader.
    pub fn connect(&mut self, src: &MachineId, dst: &MachineId) -> Result<WireUid> {
        if src == dst {
            return Err(anyhow!("can't wire {src} to itself"));
        }
        let src_kind = self.kind_of(src)?;
        let dst_kind = self.kind_of(dst)?;
        if src_kind == MachineKind::Sink {
            return Err(anyhow!("{src} has no output"));
        }
        if dst_kind == MachineKind::Source {
            return Err(anyhow!("{dst} has no input"));
        }
        if self.host.wires.wire_by_dst_machine(src, dst).is_some() {
            return Err(anyhow!("{src} is already wired to {dst}"));
        }

        if !self.host.wires.incoming(dst).is_empty() {
            if let Some(machine) = self.machines.get_mut(dst) {
                machine.activate_adder(&mut self.host)?;
            }
        }
        if !self.host.wires.outgoing(src).is_empty() {
            if let Some(machine) = self.machines.get_mut(src) {
                machine.activate_spreader(&mut self.host)?;
            }
        }

        let pipeline = &mut self.host.pipeline;
        let element = pipeline.make_element(factories::QUEUE, &format!("{src}->{dst}"))?;
        let (Some(sink_pad), Some(src_pad)) = (
            pipeline.static_pad(element, PadDirection::Sink),
            pipeline.static_pad(element, PadDirection::Src),
        ) else {
            pipeline.remove_element(element);
            return Err(anyhow!("queue for {src}->{dst} is missing pads"));
        };

        let src_machine = self
            .machines
            .get(src)
            .ok_or_else(|| anyhow!("machine {src} not found"))?;
        let dst_machine = self
            .machines
            .get(dst)
            .ok_or_else(|| anyhow!("machine {dst} not found"))?;
        let result = link_wire(pipeline, src_machine, dst_machine, sink_pad, src_pad);
        let (src_machine_pad, dst_machine_pad) = match result {
            Ok(pads) => pads,
            Err(e) => {
                log::error!("couldn't wire {src} to {dst}: {e}");
                pipeline.remove_element(element);
                return Err(e);
            }
        };

        let uid = self.host.wires.mint_wire_uid();
        self.host.wires.add_wire(Wire {
            uid,
            src: src.clone(),
            dst: dst.clone(),
            element,
            sink_pad,
            src_pad,
            src_machine_pad,
            dst_machine_pad,
        })?;
        self.host.mark_unsaved();
        log::debug!("wired {src} to {dst} as {uid}");
        Ok(uid)
    }

    /// Removes a wire and gives back the machine pads it was using.
    pub fn disconnect(&mut self, uid: WireUid) -> Result<()> {
        let wire = self
            .host
            .wires
            .remove_wire(uid)
            .ok_or_else(|| anyhow!("wire {uid} not found"))?;
        let pipeline = &mut self.host.pipeline;
        pipeline.unlink(wire.src_machine_pad, wire.sink_pad);
        pipeline.release_pad(wire.src_machine_pad);
        pipeline.unlink(wire.src_pad, wire.dst_machine_pad);
        pipeline.release_pad(wire.dst_machine_pad);
        pipeline.remove_element(wire.element);
        self.host.mark_unsaved();
        Ok(())
    }

    #[allow(missing_docs)]
    pub fn wire(&self, uid: WireUid) -> Option<&Wire> {
        self.host.wires.wire(uid)
    }

    /// The wire from `src` to `dst`, if they're connected.
    pub fn wire_by_dst_machine(&self, src: &MachineId, dst: &MachineId) -> Option<WireUid> {
        self.host.wires.wire_by_dst_machine(src, dst)
    }

    fn kind_of(&self, id: &MachineId) -> Result<MachineKind> {
        self.machines
            .get(id)
            .map(|m| m.kind())
            .ok_or_else(|| anyhow!("machine {id} not found"))
    }

    fn set_muted(&mut self, id: &MachineId, is_muted: bool) -> bool {
        let Some(machine) = self.machines.get_mut(id) else {
            return false;
        };
        match machine.set_muted(&mut self.host, is_muted) {
            Ok(_) => true,
            Err(e) => {
                log::error!("couldn't {} {id}: {e}", if is_muted { "mute" } else { "unmute" });
                false
            }
        }
    }

    fn other_sources(&self, id: &MachineId) -> Vec<MachineId> {
        self.machine_order
            .iter()
            .filter(|other| *other != id)
            .filter(|other| {
                self.machines
                    .get(*other)
                    .is_some_and(|m| m.kind() == MachineKind::Source)
            })
            .cloned()
            .collect()
    }

    fn record_state(&mut self, id: &MachineId, state: MachineState) {
        if let Some(machine) = self.machines.get_mut(id) {
            machine.record_state(state);
            self.host.notify(MachineEvent::StateChanged {
                machine: id.clone(),
                state,
            });
        }
    }

    /// Moves a machine to a new playback state. The old state's effects are
    /// undone first. Soloing a machine mutes every other source and takes
    /// the solo away from whichever machine had it; leaving solo unmutes the
    /// sources that aren't muted in their own right.
    pub fn set_machine_state(&mut self, id: &MachineId, state: MachineState) -> Result<()> {
        let machine = self
            .machines
            .get(id)
            .ok_or_else(|| anyhow!("machine {id} not found"))?;
        machine.check_state_allowed(state)?;
        let old_state = machine.state();
        if old_state == state {
            return Ok(());
        }
        log::debug!("{id}: {old_state} -> {state}");

        let mut is_complete = true;
        match old_state {
            MachineState::Normal => {}
            MachineState::Mute => is_complete &= self.set_muted(id, false),
            MachineState::Solo => {
                for other in self.other_sources(id) {
                    if self.machines.get(&other).map(|m| m.state()) != Some(MachineState::Mute) {
                        is_complete &= self.set_muted(&other, false);
                    }
                }
            }
            MachineState::Bypass => {
                if let Some(machine) = self.machines.get_mut(id) {
                    machine.set_bypass(false);
                }
            }
        }

        match state {
            MachineState::Normal => {}
            MachineState::Mute => is_complete &= self.set_muted(id, true),
            MachineState::Solo => {
                let soloists: Vec<MachineId> = self
                    .machine_order
                    .iter()
                    .filter(|other| *other != id)
                    .filter(|other| {
                        self.machines.get(*other).map(|m| m.state()) == Some(MachineState::Solo)
                    })
                    .cloned()
                    .collect();
                for other in soloists {
                    // Every source is about to be muted anyway, so the old
                    // soloist's unmuting is skipped.
                    self.record_state(&other, MachineState::Normal);
                }
                for other in self.other_sources(id) {
                    is_complete &= self.set_muted(&other, true);
                }
                if self.machines.get(id).is_some_and(|m| m.is_muted(&self.host.pipeline)) {
                    is_complete &= self.set_muted(id, false);
                }
            }
            MachineState::Bypass => {
                if let Some(machine) = self.machines.get_mut(id) {
                    machine.set_bypass(true);
                }
            }
        }

        self.record_state(id, state);
        self.host.mark_unsaved();
        if is_complete {
            Ok(())
        } else {
            Err(StateError::Incomplete {
                id: id.clone(),
                state,
            }
            .into())
        }
    }

    /// Changes the song tempo and tells every tempo-aware machine.
    pub fn update_tempo(&mut self, tempo: SongTempo) {
        self.tempo = tempo;
        for id in self.tempo_subscribers.iter() {
            if let Some(machine) = self.machines.get_mut(id) {
                machine.update_tempo(tempo);
            }
        }
    }

    #[allow(missing_docs)]
    pub fn tempo(&self) -> SongTempo {
        self.tempo
    }

    /// Creates a pattern for a machine. Its voice storage starts out matching
    /// the machine's voice count.
    pub fn add_pattern(
        &mut self,
        machine: &MachineId,
        name: &str,
        is_internal: bool,
    ) -> Result<PatternUid> {
        let m = self
            .machines
            .get_mut(machine)
            .ok_or_else(|| anyhow!("machine {machine} not found"))?;
        let uid = self.host.pattern_uid_factory.mint_next();
        if !m.add_pattern(&mut self.host, PatternInfo::new_with(uid, name, is_internal)) {
            return Err(anyhow!("{machine} already has a pattern named '{name}'"));
        }
        self.host.pattern_voices.insert(uid, m.voice_count());
        Ok(uid)
    }

    #[allow(missing_docs)]
    pub fn remove_pattern(&mut self, machine: &MachineId, uid: PatternUid) -> Result<()> {
        let m = self
            .machines
            .get_mut(machine)
            .ok_or_else(|| anyhow!("machine {machine} not found"))?;
        m.remove_pattern(&mut self.host, uid)
            .ok_or_else(|| anyhow!("{machine} has no pattern {uid}"))?;
        self.host.pattern_voices.remove(&uid);
        Ok(())
    }

    /// How many voices a pattern's storage has room for.
    pub fn pattern_voices(&self, uid: PatternUid) -> Option<usize> {
        self.host.pattern_voices.get(&uid).copied()
    }

    /// Saveable state of every machine, in the order they were added.
    pub fn machine_data(&self) -> Vec<MachineData> {
        self.machine_order
            .iter()
            .filter_map(|id| self.machines.get(id))
            .map(|m| m.persist())
            .collect()
    }

    /// Returns and forgets every event since the last call.
    pub fn take_events(&mut self) -> Vec<MachineEvent> {
        std::mem::take(&mut self.host.events)
    }

    /// Whether anything changed since [Setup::mark_clean()].
    pub fn is_unsaved(&self) -> bool {
        self.host.is_unsaved
    }

    /// Call after saving.
    pub fn mark_clean(&mut self) {
        self.host.is_unsaved = false;
    }

    #[allow(missing_docs)]
    pub fn settings(&self) -> &MachineSettings {
        &self.settings
    }

    #[allow(missing_docs)]
    pub fn pipeline(&self) -> &P {
        &self.host.pipeline
    }

    /// Direct access to the pipeline, bypassing the graph's bookkeeping.
    pub fn pipeline_mut(&mut self) -> &mut P {
        &mut self.host.pipeline
    }
}

/// Links both ends of a wire's queue to the machines. Nothing is left linked
/// or requested if either end fails.
fn link_wire(
    pipeline: &mut dyn Pipeline,
    src_machine: &Machine,
    dst_machine: &Machine,
    sink_pad: PadId,
    src_pad: PadId,
) -> Result<(PadId, PadId)> {
    let out_pad = src_machine.acquire_output_pad(pipeline)?;
    if let Err(e) = pipeline.link(out_pad, sink_pad) {
        pipeline.release_pad(out_pad);
        return Err(e.into());
    }
    let in_pad = match dst_machine.acquire_input_pad(pipeline) {
        Ok(pad) => pad,
        Err(e) => {
            pipeline.unlink(out_pad, sink_pad);
            pipeline.release_pad(out_pad);
            return Err(e);
        }
    };
    if let Err(e) = pipeline.link(src_pad, in_pad) {
        pipeline.unlink(out_pad, sink_pad);
        pipeline.release_pad(out_pad);
        pipeline.release_pad(in_pad);
        return Err(e.into());
    }
    Ok((out_pad, in_pad))
}
