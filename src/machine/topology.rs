// Copyright (c) 2024 Mike Tsao

//! The chain of auxiliary elements around a machine's unit.
//!
//! Every machine has eleven slots in a fixed order. Only the unit's slot is
//! filled at first; the others are created the first time they're needed and
//! are then kept for the life of the machine. The slots that are present
//! always form a single linked path, so enabling a slot means splicing it
//! between its nearest present neighbors.

use super::{Machine, MachineKind, TopologyError};
use crate::{
    orchestration::{GraphHost, WireEnd},
    types::{ElementId, PadId, ParamValue},
    unit::{factories, PadDirection, Pipeline},
};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumCount, EnumIter};

/// One position in a machine's internal chain, in chain order.
#[derive(
    Clone, Copy, Debug, Display, EnumCount, EnumIter, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[strum(serialize_all = "kebab-case")]
pub enum Slot {
    /// Mixes several incoming wires.
    Adder,
    /// Pins the adder's output format when the adder can't do it alone.
    CapsFilter,
    /// Converts the mixed signal into something the unit accepts.
    AdderConvert,
    #[allow(missing_docs)]
    InputPreLevel,
    #[allow(missing_docs)]
    InputGain,
    #[allow(missing_docs)]
    InputPostLevel,
    /// The wrapped unit itself.
    Unit,
    #[allow(missing_docs)]
    OutputPreLevel,
    #[allow(missing_docs)]
    OutputGain,
    #[allow(missing_docs)]
    OutputPostLevel,
    /// Copies the output to several outgoing wires.
    Spreader,
}
impl Slot {
    fn factory(&self) -> &'static str {
        match self {
            Slot::Adder => factories::ADDER,
            Slot::CapsFilter => factories::CAPS_FILTER,
            Slot::AdderConvert => factories::AUDIO_CONVERT,
            Slot::InputPreLevel
            | Slot::InputPostLevel
            | Slot::OutputPreLevel
            | Slot::OutputPostLevel => factories::LEVEL,
            Slot::InputGain | Slot::OutputGain => factories::VOLUME,
            Slot::Unit => "",
            Slot::Spreader => factories::TEE,
        }
    }

    fn abbreviation(&self) -> &'static str {
        match self {
            Slot::Adder => "A",
            Slot::CapsFilter => "CF",
            Slot::AdderConvert => "AC",
            Slot::InputPreLevel => "I<L",
            Slot::InputGain => "IG",
            Slot::InputPostLevel => "I>L",
            Slot::Unit => "M",
            Slot::OutputPreLevel => "O<L",
            Slot::OutputGain => "OG",
            Slot::OutputPostLevel => "O>L",
            Slot::Spreader => "S",
        }
    }

    /// Whether the slot sits before the unit.
    pub fn is_input_side(&self) -> bool {
        *self < Slot::Unit
    }

    /// Whether the slot sits after the unit.
    pub fn is_output_side(&self) -> bool {
        *self > Slot::Unit
    }

    fn is_level(&self) -> bool {
        self.factory() == factories::LEVEL
    }
}

/// A slot's element and its static pads. Adders have no static sink pad and
/// spreaders no static src pad; their other side is made of request pads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct SlotElement {
    pub(crate) element: ElementId,
    pub(crate) src: Option<PadId>,
    pub(crate) sink: Option<PadId>,
    /// Linked into the chain. Elements left over from a failed splice stay
    /// cached but inactive.
    pub(crate) is_active: bool,
}

fn link_error(slot: Slot, e: impl ToString) -> TopologyError {
    TopologyError::LinkFailed {
        slot,
        reason: e.to_string(),
    }
}

impl Machine {
    /// Whether the slot is in the chain.
    pub fn is_slot_present(&self, slot: Slot) -> bool {
        self.slots[slot as usize].is_some_and(|s| s.is_active)
    }

    /// Whether the machine can mix several inputs.
    pub fn has_active_adder(&self) -> bool {
        self.is_slot_present(Slot::Adder)
    }

    /// Whether the machine can feed several outputs.
    pub fn has_active_spreader(&self) -> bool {
        self.is_slot_present(Slot::Spreader)
    }

    /// The pipeline element in a slot, if the slot is present.
    pub fn slot_element(&self, slot: Slot) -> Option<ElementId> {
        self.active_slot(slot).map(|s| s.element)
    }

    fn active_slot(&self, slot: Slot) -> Option<SlotElement> {
        self.slots[slot as usize].filter(|s| s.is_active)
    }

    fn present_before(&self, slot: Slot) -> Option<Slot> {
        Slot::iter()
            .take_while(|s| *s < slot)
            .filter(|s| self.is_slot_present(*s))
            .last()
    }

    fn present_after(&self, slot: Slot) -> Option<Slot> {
        Slot::iter()
            .skip_while(|s| *s <= slot)
            .find(|s| self.is_slot_present(*s))
    }

    fn first_present(&self) -> Option<Slot> {
        Slot::iter().find(|s| self.is_slot_present(*s))
    }

    fn last_present(&self) -> Option<Slot> {
        Slot::iter().filter(|s| self.is_slot_present(*s)).last()
    }

    fn src_pad(&self, slot: Slot) -> Result<PadId, TopologyError> {
        self.slots[slot as usize]
            .and_then(|s| s.src)
            .ok_or_else(|| link_error(slot, "slot has no src pad"))
    }

    fn sink_pad(&self, slot: Slot) -> Result<PadId, TopologyError> {
        self.slots[slot as usize]
            .and_then(|s| s.sink)
            .ok_or_else(|| link_error(slot, "slot has no sink pad"))
    }

    fn set_slot_active(&mut self, slot: Slot, is_active: bool) {
        if let Some(s) = self.slots[slot as usize].as_mut() {
            s.is_active = is_active;
        }
    }

    fn check_applicable(&self, slot: Slot) -> Result<(), TopologyError> {
        let ok = match self.kind {
            MachineKind::Source => !slot.is_input_side(),
            MachineKind::Processor => true,
            MachineKind::Sink => !slot.is_output_side(),
        };
        if ok {
            Ok(())
        } else {
            Err(TopologyError::NotApplicable {
                slot,
                kind: self.kind,
            })
        }
    }

    /// Creates the slot's element if it hasn't been created before. Doesn't
    /// link it.
    fn ensure_slot_element(
        &mut self,
        pipeline: &mut dyn Pipeline,
        slot: Slot,
    ) -> Result<ElementId, TopologyError> {
        if let Some(s) = self.slots[slot as usize] {
            return Ok(s.element);
        }
        let name = format!("{}:{}", self.id, slot);
        let element = pipeline
            .make_element(slot.factory(), &name)
            .map_err(|source| TopologyError::ElementCreation { slot, source })?;
        if slot.is_level() {
            for (property, value) in [
                ("interval", ParamValue::UInt(self.settings.level_interval_ms())),
                ("peak-ttl", ParamValue::UInt(self.settings.peak_ttl_ms())),
                ("peak-falloff", ParamValue::Double(self.settings.peak_falloff())),
                ("message", ParamValue::Boolean(true)),
            ] {
                if let Err(e) = pipeline.set_property(element, property, value) {
                    log::warn!("{name}: couldn't configure level meter: {e}");
                }
            }
        }
        self.slots[slot as usize] = Some(SlotElement {
            element,
            src: pipeline.static_pad(element, PadDirection::Src),
            sink: pipeline.static_pad(element, PadDirection::Sink),
            is_active: false,
        });
        Ok(element)
    }

    /// Makes the slot part of the chain. Enabling a present slot does
    /// nothing.
    pub fn enable_slot(
        &mut self,
        host: &mut dyn GraphHost,
        slot: Slot,
    ) -> Result<(), TopologyError> {
        match slot {
            Slot::Unit => Ok(()),
            Slot::Adder | Slot::CapsFilter | Slot::AdderConvert => self.activate_adder(host),
            Slot::Spreader => self.activate_spreader(host),
            _ => {
                if self.is_slot_present(slot) {
                    return Ok(());
                }
                self.check_applicable(slot)?;
                self.ensure_slot_element(host.pipeline_mut(), slot)?;
                self.insert_slot(host, slot)
            }
        }
    }

    #[allow(missing_docs)]
    pub fn enable_input_pre_level(&mut self, host: &mut dyn GraphHost) -> Result<(), TopologyError> {
        self.enable_slot(host, Slot::InputPreLevel)
    }
    #[allow(missing_docs)]
    pub fn enable_input_gain(&mut self, host: &mut dyn GraphHost) -> Result<(), TopologyError> {
        self.enable_slot(host, Slot::InputGain)
    }
    #[allow(missing_docs)]
    pub fn enable_input_post_level(&mut self, host: &mut dyn GraphHost) -> Result<(), TopologyError> {
        self.enable_slot(host, Slot::InputPostLevel)
    }
    #[allow(missing_docs)]
    pub fn enable_output_pre_level(&mut self, host: &mut dyn GraphHost) -> Result<(), TopologyError> {
        self.enable_slot(host, Slot::OutputPreLevel)
    }
    #[allow(missing_docs)]
    pub fn enable_output_gain(&mut self, host: &mut dyn GraphHost) -> Result<(), TopologyError> {
        self.enable_slot(host, Slot::OutputGain)
    }
    #[allow(missing_docs)]
    pub fn enable_output_post_level(&mut self, host: &mut dyn GraphHost) -> Result<(), TopologyError> {
        self.enable_slot(host, Slot::OutputPostLevel)
    }

    /// Splices a created but inactive slot between its present neighbors.
    fn insert_slot(&mut self, host: &mut dyn GraphHost, pos: Slot) -> Result<(), TopologyError> {
        let pre = self.present_before(pos);
        let post = self.present_after(pos);
        let pos_src = self.src_pad(pos)?;
        let pos_sink = self.sink_pad(pos)?;
        log::trace!("{}: inserting {pos} between {pre:?} and {post:?}", self.id);

        match (pre, post) {
            (Some(pre), Some(post)) => {
                let pre_src = self.src_pad(pre)?;
                let post_sink = self.sink_pad(post)?;
                let pipeline = host.pipeline_mut();
                pipeline.unlink(pre_src, post_sink);
                if let Err(e) = pipeline
                    .link(pre_src, pos_sink)
                    .and_then(|_| pipeline.link(pos_src, post_sink))
                {
                    log::error!("{}: couldn't splice {pos} between {pre} and {post}: {e}", self.id);
                    pipeline.unlink(pre_src, pos_sink);
                    pipeline.unlink(pos_src, post_sink);
                    if let Err(e2) = pipeline.link(pre_src, post_sink) {
                        log::error!("{}: couldn't restore {pre} -> {post}: {e2}", self.id);
                        return Err(TopologyError::Inconsistent {
                            slot: pos,
                            reason: format!("{e}; restoring {pre} -> {post} failed: {e2}"),
                        });
                    }
                    return Err(link_error(pos, e));
                }
            }
            (None, Some(post)) => {
                let post_sink = self.sink_pad(post)?;
                let peer = host.pipeline().peer(post_sink);
                if let Some(peer) = peer {
                    host.pipeline_mut().unlink(peer, post_sink);
                }
                let result = host
                    .pipeline_mut()
                    .link(pos_src, post_sink)
                    .map_err(anyhow::Error::from)
                    .and_then(|_| match peer {
                        Some(peer) => host.reconnect_wire(&self.id, WireEnd::Input, peer, pos_sink),
                        None => Ok(()),
                    });
                if let Err(e) = result {
                    log::error!("{}: couldn't prepend {pos} to {post}: {e}", self.id);
                    let pipeline = host.pipeline_mut();
                    pipeline.unlink(pos_src, post_sink);
                    if let Some(peer) = peer {
                        pipeline.unlink(peer, pos_sink);
                    }
                    let Some(peer) = peer else {
                        return Err(link_error(pos, e));
                    };
                    self.recover_edge(host, pos, WireEnd::Input, peer, (pos_src, post_sink), &e)?;
                }
            }
            (Some(pre), None) => {
                let pre_src = self.src_pad(pre)?;
                let peer = host.pipeline().peer(pre_src);
                if let Some(peer) = peer {
                    host.pipeline_mut().unlink(pre_src, peer);
                }
                let result = host
                    .pipeline_mut()
                    .link(pre_src, pos_sink)
                    .map_err(anyhow::Error::from)
                    .and_then(|_| match peer {
                        Some(peer) => host.reconnect_wire(&self.id, WireEnd::Output, peer, pos_src),
                        None => Ok(()),
                    });
                if let Err(e) = result {
                    log::error!("{}: couldn't append {pos} to {pre}: {e}", self.id);
                    let pipeline = host.pipeline_mut();
                    pipeline.unlink(pre_src, pos_sink);
                    if let Some(peer) = peer {
                        pipeline.unlink(pos_src, peer);
                    }
                    let Some(peer) = peer else {
                        return Err(link_error(pos, e));
                    };
                    self.recover_edge(host, pos, WireEnd::Output, peer, (pre_src, pos_sink), &e)?;
                }
            }
            (None, None) => {
                log::error!("{}: {pos} has no neighbors; machine has no unit?", self.id);
                return Err(TopologyError::BrokenChain { slot: pos });
            }
        }
        self.set_slot_active(pos, true);
        log::debug!("{} {}", self.id, self.describe_slots());
        Ok(())
    }

    /// After a failed splice at either end of the chain, links the new slot to
    /// its one neighbor and asks the wire on the outside to reconnect to it.
    /// If that works, the slot ends up spliced in after all.
    fn recover_edge(
        &mut self,
        host: &mut dyn GraphHost,
        pos: Slot,
        end: WireEnd,
        peer: PadId,
        inner_link: (PadId, PadId),
        cause: &dyn std::fmt::Display,
    ) -> Result<(), TopologyError> {
        let (inner_src, inner_sink) = inner_link;
        let new_pad = match end {
            WireEnd::Input => self.sink_pad(pos)?,
            WireEnd::Output => self.src_pad(pos)?,
        };
        if let Err(e) = host.pipeline_mut().link(inner_src, inner_sink) {
            return Err(TopologyError::Inconsistent {
                slot: pos,
                reason: format!("{cause}; relinking inside the machine failed: {e}"),
            });
        }
        if let Err(e) = host.reconnect_wire(&self.id, end, peer, new_pad) {
            log::error!("{}: wire couldn't reconnect to {pos}: {e}", self.id);
            host.pipeline_mut().unlink(inner_src, inner_sink);
            return Err(TopologyError::Inconsistent {
                slot: pos,
                reason: format!("{cause}; wire reconnection failed: {e}"),
            });
        }
        log::warn!("{}: {pos} spliced in through wire reconnection", self.id);
        Ok(())
    }

    /// Turns on mixing of several inputs: an adder, then a caps filter if
    /// the adder can't pin its own format, then a converter unless the unit
    /// takes the mixer format directly.
    pub fn activate_adder(&mut self, host: &mut dyn GraphHost) -> Result<(), TopologyError> {
        if self.has_active_adder() {
            return Ok(());
        }
        self.check_applicable(Slot::Adder)?;
        let Some(target) = Slot::iter()
            .skip_while(|s| *s < Slot::InputPreLevel)
            .take_while(|s| *s <= Slot::Unit)
            .find(|s| self.is_slot_present(*s))
        else {
            return Err(TopologyError::BrokenChain { slot: Slot::Adder });
        };

        let mixer_caps = self.settings.mixer_caps().clone();
        let adder = self.ensure_slot_element(host.pipeline_mut(), Slot::Adder)?;
        let mut chain = vec![Slot::Adder];
        if host.pipeline().has_property(adder, "caps") {
            host.pipeline_mut()
                .set_caps(adder, &mixer_caps)
                .map_err(|e| link_error(Slot::Adder, e))?;
        } else {
            let filter = self.ensure_slot_element(host.pipeline_mut(), Slot::CapsFilter)?;
            host.pipeline_mut()
                .set_caps(filter, &mixer_caps)
                .map_err(|e| link_error(Slot::CapsFilter, e))?;
            chain.push(Slot::CapsFilter);
        }

        let skip_convert = self.kind != MachineKind::Sink
            && self
                .unit
                .sink_caps()
                .is_some_and(|caps| caps.can_intersect(&mixer_caps));
        if !skip_convert {
            let convert = self.ensure_slot_element(host.pipeline_mut(), Slot::AdderConvert)?;
            if self.kind != MachineKind::Sink && self.settings.should_disable_dithering() {
                for property in ["dithering", "noise-shaping"] {
                    if let Err(e) =
                        host.pipeline_mut()
                            .set_property(convert, property, ParamValue::Int(0))
                    {
                        log::warn!("{}: couldn't configure converter: {e}", self.id);
                    }
                }
            }
            chain.push(Slot::AdderConvert);
        } else {
            log::debug!("{}: unit takes the mixer format; no converter", self.id);
        }
        chain.push(target);

        let target_sink = self.sink_pad(target)?;
        let old_peer = host.pipeline().peer(target_sink);
        if let Some(peer) = old_peer {
            host.pipeline_mut().unlink(peer, target_sink);
        }
        let mut linked = Vec::default();
        for pair in chain.windows(2) {
            let (src, sink) = (self.src_pad(pair[0])?, self.sink_pad(pair[1])?);
            if let Err(e) = host.pipeline_mut().link(src, sink) {
                log::error!("{}: couldn't link {} -> {}: {e}", self.id, pair[0], pair[1]);
                return self.abandon_adder(host, &linked, old_peer, target_sink, e);
            }
            linked.push((src, sink));
        }
        let members = &chain[..chain.len() - 1];
        for slot in members {
            self.set_slot_active(*slot, true);
        }

        if let Some(peer) = old_peer {
            if let Err(e) = self.move_wire(host, WireEnd::Input, adder, peer) {
                log::error!("{}: existing input couldn't move to the adder: {e}", self.id);
                for slot in members {
                    self.set_slot_active(*slot, false);
                }
                return self.abandon_adder(host, &linked, old_peer, target_sink, e);
            }
        }
        log::debug!("{} {}", self.id, self.describe_slots());
        Ok(())
    }

    /// Moves the wire that was linked to `peer` onto a fresh request pad of
    /// the adder or spreader.
    fn move_wire(
        &self,
        host: &mut dyn GraphHost,
        end: WireEnd,
        element: ElementId,
        peer: PadId,
    ) -> Result<(), String> {
        let direction = match end {
            WireEnd::Input => PadDirection::Sink,
            WireEnd::Output => PadDirection::Src,
        };
        let pad = host
            .pipeline_mut()
            .request_pad(element, direction)
            .map_err(|e| e.to_string())?;
        if let Err(e) = host.reconnect_wire(&self.id, end, peer, pad) {
            host.pipeline_mut().release_pad(pad);
            return Err(e.to_string());
        }
        Ok(())
    }

    fn abandon_adder(
        &mut self,
        host: &mut dyn GraphHost,
        linked: &[(PadId, PadId)],
        old_peer: Option<PadId>,
        target_sink: PadId,
        cause: impl ToString,
    ) -> Result<(), TopologyError> {
        let pipeline = host.pipeline_mut();
        for (src, sink) in linked {
            pipeline.unlink(*src, *sink);
        }
        if let Some(peer) = old_peer {
            if let Err(e) = pipeline.link(peer, target_sink) {
                return Err(TopologyError::Inconsistent {
                    slot: Slot::Adder,
                    reason: format!("{}; restoring input failed: {e}", cause.to_string()),
                });
            }
        }
        Err(link_error(Slot::Adder, cause))
    }

    /// Turns on feeding several outputs by appending a spreader after the
    /// last present slot.
    pub fn activate_spreader(&mut self, host: &mut dyn GraphHost) -> Result<(), TopologyError> {
        if self.has_active_spreader() {
            return Ok(());
        }
        self.check_applicable(Slot::Spreader)?;
        let Some(source) = Slot::iter()
            .skip_while(|s| *s < Slot::Unit)
            .take_while(|s| *s <= Slot::OutputPostLevel)
            .filter(|s| self.is_slot_present(*s))
            .last()
        else {
            return Err(TopologyError::BrokenChain {
                slot: Slot::Spreader,
            });
        };
        let spreader = self.ensure_slot_element(host.pipeline_mut(), Slot::Spreader)?;
        let source_src = self.src_pad(source)?;
        let spreader_sink = self.sink_pad(Slot::Spreader)?;

        let old_peer = host.pipeline().peer(source_src);
        if let Some(peer) = old_peer {
            host.pipeline_mut().unlink(source_src, peer);
        }
        let restore = |host: &mut dyn GraphHost, cause: String| -> TopologyError {
            if let Some(peer) = old_peer {
                if let Err(e) = host.pipeline_mut().link(source_src, peer) {
                    return TopologyError::Inconsistent {
                        slot: Slot::Spreader,
                        reason: format!("{cause}; restoring output failed: {e}"),
                    };
                }
            }
            link_error(Slot::Spreader, cause)
        };

        if let Err(e) = host.pipeline_mut().link(source_src, spreader_sink) {
            log::error!("{}: couldn't link {source} -> spreader: {e}", self.id);
            return Err(restore(host, e.to_string()));
        }
        if let Some(peer) = old_peer {
            if let Err(e) = self.move_wire(host, WireEnd::Output, spreader, peer) {
                log::error!("{}: existing output couldn't move to the spreader: {e}", self.id);
                host.pipeline_mut().unlink(source_src, spreader_sink);
                return Err(restore(host, e));
            }
        }
        self.set_slot_active(Slot::Spreader, true);
        log::debug!("{} {}", self.id, self.describe_slots());
        Ok(())
    }

    /// Returns a pad that a new incoming wire can link to. With an adder, each
    /// wire gets its own request pad; otherwise it's the first slot's sink.
    pub fn acquire_input_pad(&self, pipeline: &mut dyn Pipeline) -> anyhow::Result<PadId> {
        if let Some(adder) = self.active_slot(Slot::Adder) {
            return Ok(pipeline.request_pad(adder.element, PadDirection::Sink)?);
        }
        let first = self
            .first_present()
            .ok_or_else(|| anyhow::anyhow!("machine {} has no slots", self.id))?;
        Ok(self.sink_pad(first)?)
    }

    /// Returns a pad that a new outgoing wire can link from. See
    /// [Machine::acquire_input_pad()].
    pub fn acquire_output_pad(&self, pipeline: &mut dyn Pipeline) -> anyhow::Result<PadId> {
        if let Some(spreader) = self.active_slot(Slot::Spreader) {
            return Ok(pipeline.request_pad(spreader.element, PadDirection::Src)?);
        }
        let last = self
            .last_present()
            .ok_or_else(|| anyhow::anyhow!("machine {} has no slots", self.id))?;
        Ok(self.src_pad(last)?)
    }

    /// Checks that the present slots are linked one to the next and to
    /// nothing else inside the machine.
    pub fn verify_chain(&self, pipeline: &dyn Pipeline) -> bool {
        let present: Vec<Slot> = Slot::iter().filter(|s| self.is_slot_present(*s)).collect();
        for pair in present.windows(2) {
            let (Ok(src), Ok(sink)) = (self.src_pad(pair[0]), self.sink_pad(pair[1])) else {
                return false;
            };
            if pipeline.peer(src) != Some(sink) {
                return false;
            }
        }
        // Inactive leftovers must be fully detached.
        self.slots
            .iter()
            .flatten()
            .filter(|s| !s.is_active)
            .all(|s| {
                s.src.map_or(true, |p| pipeline.peer(p).is_none())
                    && s.sink.map_or(true, |p| pipeline.peer(p).is_none())
            })
    }

    /// A compact picture of the chain, like `[a cf ac i<l IG i>l M ...]`.
    /// Present slots are upper case.
    pub fn describe_slots(&self) -> String {
        let parts: Vec<String> = Slot::iter()
            .map(|slot| {
                if self.is_slot_present(slot) {
                    slot.abbreviation().to_string()
                } else {
                    slot.abbreviation().to_lowercase()
                }
            })
            .collect();
        format!("[{}]", parts.join(" "))
    }

    fn gain_slot(&self) -> Slot {
        if self.kind == MachineKind::Sink {
            Slot::InputGain
        } else {
            Slot::OutputGain
        }
    }

    /// Silences or unsilences the machine through its gain slot, enabling
    /// the slot if needed.
    pub fn set_muted(&mut self, host: &mut dyn GraphHost, is_muted: bool) -> Result<(), TopologyError> {
        let slot = self.gain_slot();
        if !self.is_slot_present(slot) {
            if !is_muted {
                return Ok(());
            }
            self.enable_slot(host, slot)?;
        }
        let element = self
            .slot_element(slot)
            .ok_or(TopologyError::BrokenChain { slot })?;
        host.pipeline_mut()
            .set_property(element, "mute", ParamValue::Boolean(is_muted))
            .map_err(|e| link_error(slot, e))
    }

    /// Whether the gain slot is currently muting the machine.
    pub fn is_muted(&self, pipeline: &dyn Pipeline) -> bool {
        self.slot_element(self.gain_slot())
            .and_then(|element| pipeline.property(element, "mute"))
            == Some(ParamValue::Boolean(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        machine::MachineParamsBuilder,
        testing::{test_factory, TestEffect, TestHost, TestSink, TestSynth},
        types::Caps,
        util::{MachineSettings, Rng},
    };

    fn machine(host: &mut TestHost, key: &str, kind: MachineKind) -> Machine {
        machine_with_settings(host, key, kind, &MachineSettings::default())
    }

    fn machine_with_settings(
        host: &mut TestHost,
        key: &str,
        kind: MachineKind,
        settings: &MachineSettings,
    ) -> Machine {
        Machine::new(
            host,
            &test_factory(),
            settings,
            MachineParamsBuilder::default()
                .id(format!("{key}-machine").as_str())
                .plugin_name(key)
                .kind(kind)
                .voices(1usize)
                .build()
                .unwrap(),
        )
        .unwrap()
    }

    /// Links an outside element into the machine's input, the way a wire
    /// would.
    fn attach_input(host: &mut TestHost, m: &Machine) -> PadId {
        let queue = host.pipeline.make_element("queue", "wire-in").unwrap();
        let queue_src = host.pipeline.static_pad(queue, PadDirection::Src).unwrap();
        let input = m.acquire_input_pad(&mut host.pipeline).unwrap();
        host.pipeline.link(queue_src, input).unwrap();
        queue_src
    }

    fn attach_output(host: &mut TestHost, m: &Machine) -> PadId {
        let queue = host.pipeline.make_element("queue", "wire-out").unwrap();
        let queue_sink = host.pipeline.static_pad(queue, PadDirection::Sink).unwrap();
        let output = m.acquire_output_pad(&mut host.pipeline).unwrap();
        host.pipeline.link(output, queue_sink).unwrap();
        queue_sink
    }

    #[test]
    fn slot_order_and_sides() {
        let all: Vec<Slot> = Slot::iter().collect();
        assert_eq!(all.len(), 11);
        assert_eq!(all.first(), Some(&Slot::Adder));
        assert_eq!(all.last(), Some(&Slot::Spreader));
        assert!(Slot::InputGain.is_input_side());
        assert!(Slot::OutputGain.is_output_side());
        assert!(!Slot::Unit.is_input_side() && !Slot::Unit.is_output_side());
    }

    #[test]
    fn enabling_slots_keeps_one_chain() {
        let mut host = TestHost::default();
        let mut m = machine(&mut host, TestEffect::UNIT_KEY, MachineKind::Processor);
        let input = attach_input(&mut host, &m);
        let output = attach_output(&mut host, &m);

        assert!(m.enable_output_gain(&mut host).is_ok());
        assert!(m.verify_chain(&host.pipeline));
        assert!(m.enable_input_post_level(&mut host).is_ok());
        assert!(m.enable_input_pre_level(&mut host).is_ok());
        assert!(m.enable_output_post_level(&mut host).is_ok());
        assert!(m.enable_input_gain(&mut host).is_ok());
        assert!(m.enable_output_pre_level(&mut host).is_ok());
        assert!(m.verify_chain(&host.pipeline));
        assert_eq!(
            m.describe_slots(),
            "[a cf ac I<L IG I>L M O<L OG O>L s]"
        );

        let first = m.slots[Slot::InputPreLevel as usize].unwrap();
        let last = m.slots[Slot::OutputPostLevel as usize].unwrap();
        assert_eq!(
            host.pipeline.peer(input),
            first.sink,
            "the outside input should now feed the first slot"
        );
        assert_eq!(host.pipeline.peer(output), last.src);

        let elements = host.pipeline.element_count();
        assert!(m.enable_output_gain(&mut host).is_ok());
        assert_eq!(
            host.pipeline.element_count(),
            elements,
            "enabling a present slot is a no-op"
        );
    }

    #[test]
    fn sides_that_dont_apply_are_rejected() {
        let mut host = TestHost::default();
        let mut source = machine(&mut host, TestSynth::UNIT_KEY, MachineKind::Source);
        assert_eq!(
            source.enable_input_gain(&mut host),
            Err(TopologyError::NotApplicable {
                slot: Slot::InputGain,
                kind: MachineKind::Source
            })
        );
        assert!(source.activate_adder(&mut host).is_err());

        let mut sink = machine(&mut host, TestSink::UNIT_KEY, MachineKind::Sink);
        assert!(sink.enable_output_gain(&mut host).is_err());
        assert!(sink.activate_spreader(&mut host).is_err());
        assert!(sink.enable_input_gain(&mut host).is_ok());
    }

    #[test]
    fn failed_interior_splice_restores_connectivity() {
        for slot in [
            Slot::InputGain,
            Slot::InputPostLevel,
            Slot::OutputPreLevel,
            Slot::OutputGain,
        ] {
            let mut host = TestHost::default();
            let mut m = machine(&mut host, TestEffect::UNIT_KEY, MachineKind::Processor);
            attach_input(&mut host, &m);
            attach_output(&mut host, &m);
            m.enable_input_pre_level(&mut host).unwrap();
            m.enable_output_post_level(&mut host).unwrap();

            let before = host.pipeline.links();
            host.pipeline.fail_nth_link(1);
            let r = m.enable_slot(&mut host, slot);
            assert!(
                matches!(r, Err(TopologyError::LinkFailed { .. })),
                "{slot}: the second link's failure should be reported"
            );
            assert_eq!(
                host.pipeline.links(),
                before,
                "{slot}: rollback should restore the exact prior links"
            );
            assert!(!m.is_slot_present(slot));
            assert!(m.verify_chain(&host.pipeline));

            let elements = host.pipeline.element_count();
            assert!(
                m.enable_slot(&mut host, slot).is_ok(),
                "{slot}: the cached element should be reusable"
            );
            assert_eq!(host.pipeline.element_count(), elements);
            assert!(m.verify_chain(&host.pipeline));
        }
    }

    #[test]
    fn failed_rollback_is_inconsistent() {
        let mut host = TestHost::default();
        let mut m = machine(&mut host, TestEffect::UNIT_KEY, MachineKind::Processor);
        m.enable_input_pre_level(&mut host).unwrap();
        host.pipeline.set_links_fail(true);
        let r = m.enable_input_gain(&mut host);
        assert!(
            r.as_ref().is_err_and(|e| e.is_inconsistent()),
            "a failed restore must be reported as inconsistent, got {r:?}"
        );
    }

    #[test]
    fn edge_splice_failure_recovers_through_wire() {
        let mut host = TestHost::default();
        let mut m = machine(&mut host, TestEffect::UNIT_KEY, MachineKind::Processor);
        let input = attach_input(&mut host, &m);

        host.pipeline.fail_nth_link(0);
        assert!(m.enable_input_gain(&mut host).is_ok());
        assert_eq!(host.reconnects.len(), 1, "the wire should have been asked to reconnect");
        let gain = m.slots[Slot::InputGain as usize].unwrap();
        assert_eq!(host.pipeline.peer(input), gain.sink);
        assert!(m.is_slot_present(Slot::InputGain));
        assert!(m.verify_chain(&host.pipeline));

        let output = attach_output(&mut host, &m);
        host.pipeline.fail_nth_link(1);
        host.refuse_reconnects = true;
        let r = m.enable_output_gain(&mut host);
        assert!(
            r.as_ref().is_err_and(|e| e.is_inconsistent()),
            "if the wire can't reconnect either, the chain is inconsistent"
        );
        assert!(host.pipeline.peer(output).is_none());
    }

    #[test]
    fn edge_splice_without_outside_peer() {
        let mut host = TestHost::default();
        let mut m = machine(&mut host, TestSynth::UNIT_KEY, MachineKind::Source);
        let before = host.pipeline.links();
        host.pipeline.fail_nth_link(0);
        assert!(matches!(
            m.enable_output_gain(&mut host),
            Err(TopologyError::LinkFailed { .. })
        ));
        assert_eq!(host.pipeline.links(), before);
        assert!(m.enable_output_gain(&mut host).is_ok());
        assert!(m.verify_chain(&host.pipeline));
    }

    #[test]
    fn edge_splices_move_the_wire() {
        let mut host = TestHost::default();
        let mut m = machine(&mut host, TestEffect::UNIT_KEY, MachineKind::Processor);
        let input = attach_input(&mut host, &m);
        let output = attach_output(&mut host, &m);

        m.enable_input_gain(&mut host).unwrap();
        m.enable_output_gain(&mut host).unwrap();
        let in_gain = m.slots[Slot::InputGain as usize].unwrap();
        let out_gain = m.slots[Slot::OutputGain as usize].unwrap();
        assert_eq!(
            host.reconnects,
            vec![
                (m.id().clone(), WireEnd::Input, input, in_gain.sink.unwrap()),
                (m.id().clone(), WireEnd::Output, output, out_gain.src.unwrap()),
            ],
            "the wire at each edge should be told where it now attaches"
        );
        assert_eq!(host.pipeline.peer(input), in_gain.sink);
        assert_eq!(host.pipeline.peer(output), out_gain.src);

        m.enable_input_post_level(&mut host).unwrap();
        assert_eq!(host.reconnects.len(), 2, "interior splices leave the wires alone");
    }

    #[test]
    fn failed_adder_restores_prior_links() {
        // Adder -> caps filter -> unit is two links, and moving the wire is
        // the third.
        for n in 0..3 {
            let mut host = TestHost::default();
            let mut m = machine(&mut host, TestEffect::UNIT_KEY, MachineKind::Processor);
            let input = attach_input(&mut host, &m);
            attach_output(&mut host, &m);
            let unit_sink = m.slots[Slot::Unit as usize].unwrap().sink;

            let before = host.pipeline.links();
            host.pipeline.fail_nth_link(n);
            assert!(
                matches!(m.activate_adder(&mut host), Err(TopologyError::LinkFailed { .. })),
                "link {n}: the failure should be reported"
            );
            host.pipeline.clear_link_failures();
            assert_eq!(
                host.pipeline.links(),
                before,
                "link {n}: rollback should restore the exact prior links"
            );
            assert_eq!(
                host.pipeline.peer(input),
                unit_sink,
                "link {n}: the wire should be back on its original pad"
            );
            assert!(!m.has_active_adder());
            let adder = m.slots[Slot::Adder as usize].unwrap().element;
            assert_eq!(host.pipeline.request_pad_count(adder), 0);
            assert!(host.reconnects.is_empty());
            assert!(m.verify_chain(&host.pipeline));

            assert!(m.activate_adder(&mut host).is_ok());
            assert_eq!(
                host.pipeline.peer(input).and_then(|p| host.pipeline.element_of_pad(p)),
                Some(adder)
            );
        }

        let mut host = TestHost::default();
        let mut m = machine(&mut host, TestEffect::UNIT_KEY, MachineKind::Processor);
        let input = attach_input(&mut host, &m);
        let before = host.pipeline.links();
        host.refuse_reconnects = true;
        assert!(matches!(
            m.activate_adder(&mut host),
            Err(TopologyError::LinkFailed { .. })
        ));
        assert_eq!(host.pipeline.links(), before);
        assert_eq!(host.pipeline.peer(input), m.slots[Slot::Unit as usize].unwrap().sink);
        assert!(!m.has_active_adder());
    }

    #[test]
    fn failed_spreader_restores_prior_links() {
        // Unit -> spreader is one link, and moving the wire is the second.
        for n in 0..2 {
            let mut host = TestHost::default();
            let mut m = machine(&mut host, TestSynth::UNIT_KEY, MachineKind::Source);
            let output = attach_output(&mut host, &m);
            let unit_src = m.slots[Slot::Unit as usize].unwrap().src;

            let before = host.pipeline.links();
            host.pipeline.fail_nth_link(n);
            assert!(
                matches!(
                    m.activate_spreader(&mut host),
                    Err(TopologyError::LinkFailed { .. })
                ),
                "link {n}: the failure should be reported"
            );
            host.pipeline.clear_link_failures();
            assert_eq!(host.pipeline.links(), before, "link {n}");
            assert_eq!(host.pipeline.peer(output), unit_src, "link {n}");
            assert!(!m.has_active_spreader());
            let spreader = m.slots[Slot::Spreader as usize].unwrap().element;
            assert_eq!(host.pipeline.request_pad_count(spreader), 0);
            assert!(m.verify_chain(&host.pipeline));
        }

        let mut host = TestHost::default();
        let mut m = machine(&mut host, TestSynth::UNIT_KEY, MachineKind::Source);
        let output = attach_output(&mut host, &m);
        let before = host.pipeline.links();
        host.refuse_reconnects = true;
        assert!(matches!(
            m.activate_spreader(&mut host),
            Err(TopologyError::LinkFailed { .. })
        ));
        assert_eq!(host.pipeline.links(), before);
        assert_eq!(host.pipeline.peer(output), m.slots[Slot::Unit as usize].unwrap().src);
    }

    #[test]
    fn adder_skips_converter_when_formats_agree() {
        let mut host = TestHost::default();
        host.pipeline.adder_has_caps = true;
        let mut m = machine(&mut host, TestEffect::UNIT_KEY, MachineKind::Processor);
        let input = attach_input(&mut host, &m);

        assert!(m.activate_adder(&mut host).is_ok());
        assert!(m.has_active_adder());
        assert!(!m.is_slot_present(Slot::CapsFilter), "adder pins its own caps");
        assert!(!m.is_slot_present(Slot::AdderConvert), "float unit needs no converter");
        assert!(m.verify_chain(&host.pipeline));
        let adder = m.slot_element(Slot::Adder).unwrap();
        assert_eq!(host.pipeline.caps(adder), Some(&Caps::canonical_mixer()));
        assert_eq!(
            host.pipeline.peer(input).and_then(|p| host.pipeline.element_of_pad(p)),
            Some(adder),
            "the existing input should move onto an adder request pad"
        );

        assert!(m.activate_adder(&mut host).is_ok(), "activation is idempotent");
    }

    #[test]
    fn adder_converts_for_picky_units() {
        let mut host = TestHost::default();
        let mut m = machine(&mut host, TestEffect::INT_UNIT_KEY, MachineKind::Processor);
        assert!(m.activate_adder(&mut host).is_ok());
        assert!(m.is_slot_present(Slot::CapsFilter));
        assert!(m.is_slot_present(Slot::AdderConvert));
        let convert = m.slot_element(Slot::AdderConvert).unwrap();
        assert_eq!(
            host.pipeline.property(convert, "dithering"),
            Some(ParamValue::Int(0))
        );
        assert!(m.verify_chain(&host.pipeline));
        assert_eq!(m.describe_slots(), "[A CF AC i<l ig i>l M o<l og o>l s]");

        let mut sink_host = TestHost::default();
        let settings = MachineSettings::default();
        let mut sink = machine_with_settings(
            &mut sink_host,
            TestSink::UNIT_KEY,
            MachineKind::Sink,
            &settings,
        );
        assert!(sink.activate_adder(&mut sink_host).is_ok());
        assert!(
            sink.is_slot_present(Slot::AdderConvert),
            "sinks always get a converter"
        );
        let convert = sink.slot_element(Slot::AdderConvert).unwrap();
        assert_eq!(
            sink_host.pipeline.property(convert, "dithering"),
            Some(ParamValue::Int(1)),
            "sinks keep dithering"
        );
    }

    #[test]
    fn spreader_moves_existing_output() {
        let mut host = TestHost::default();
        let mut m = machine(&mut host, TestSynth::UNIT_KEY, MachineKind::Source);
        m.enable_output_gain(&mut host).unwrap();
        let output = attach_output(&mut host, &m);
        assert!(m.activate_spreader(&mut host).is_ok());
        let spreader = m.slot_element(Slot::Spreader).unwrap();
        assert_eq!(
            host.pipeline.peer(output).and_then(|p| host.pipeline.element_of_pad(p)),
            Some(spreader)
        );
        assert!(m.verify_chain(&host.pipeline));

        assert!(
            m.enable_output_post_level(&mut host).is_ok(),
            "slots can still be inserted before an active spreader"
        );
        assert!(m.verify_chain(&host.pipeline));
        assert_eq!(m.describe_slots(), "[a cf ac i<l ig i>l M o<l OG O>L S]");
    }

    #[test]
    fn missing_factory_is_reported() {
        let mut host = TestHost::default();
        let mut m = machine(&mut host, TestSynth::UNIT_KEY, MachineKind::Source);
        host.pipeline.remove_factory("level");
        assert!(matches!(
            m.enable_output_pre_level(&mut host),
            Err(TopologyError::ElementCreation { .. })
        ));
        assert!(m.enable_output_gain(&mut host).is_ok());
    }

    #[test]
    fn level_meters_are_configured() {
        let mut host = TestHost::default();
        let mut m = machine(&mut host, TestSynth::UNIT_KEY, MachineKind::Source);
        m.enable_output_pre_level(&mut host).unwrap();
        let level = m.slot_element(Slot::OutputPreLevel).unwrap();
        assert_eq!(
            host.pipeline.property(level, "interval"),
            Some(ParamValue::UInt(100))
        );
        assert_eq!(
            host.pipeline.property(level, "peak-ttl"),
            Some(ParamValue::UInt(200))
        );
        assert_eq!(
            host.pipeline.property(level, "peak-falloff"),
            Some(ParamValue::Double(50.0))
        );
    }

    #[test]
    fn mute_uses_the_right_gain_slot() {
        let mut host = TestHost::default();
        let mut source = machine(&mut host, TestSynth::UNIT_KEY, MachineKind::Source);
        assert!(!source.is_muted(&host.pipeline));
        assert!(source.set_muted(&mut host, true).is_ok());
        assert!(source.is_slot_present(Slot::OutputGain));
        assert!(source.is_muted(&host.pipeline));
        assert!(source.set_muted(&mut host, false).is_ok());
        assert!(!source.is_muted(&host.pipeline));

        let mut sink = machine(&mut host, TestSink::UNIT_KEY, MachineKind::Sink);
        assert!(sink.set_muted(&mut host, true).is_ok());
        assert!(sink.is_slot_present(Slot::InputGain));
        assert!(sink.is_muted(&host.pipeline));
    }

    #[test]
    fn random_enable_sequences_keep_one_chain() {
        let mut rng = Rng::new_with_seed(1234);
        let candidates = [
            Slot::Adder,
            Slot::InputPreLevel,
            Slot::InputGain,
            Slot::InputPostLevel,
            Slot::OutputPreLevel,
            Slot::OutputGain,
            Slot::OutputPostLevel,
            Slot::Spreader,
        ];
        for _ in 0..25 {
            let mut host = TestHost::default();
            let mut m = machine(&mut host, TestEffect::UNIT_KEY, MachineKind::Processor);
            attach_input(&mut host, &m);
            attach_output(&mut host, &m);
            for _ in 0..12 {
                let slot = candidates[rng.rand_range(0..candidates.len() as u64) as usize];
                if rng.rand_range(0..4) == 0 {
                    host.pipeline.fail_nth_link(rng.rand_range(0..3) as usize);
                }
                let _ = m.enable_slot(&mut host, slot);
                host.pipeline.clear_link_failures();
                assert!(
                    m.verify_chain(&host.pipeline),
                    "chain broke after enabling {slot}: {}",
                    m.describe_slots()
                );
            }
        }
    }
}
