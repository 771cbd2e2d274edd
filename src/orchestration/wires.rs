// Copyright (c) 2024 Mike Tsao

use super::WireEnd;
use crate::types::{ElementId, MachineId, PadId, UidFactory, WireUid};
use anyhow::{anyhow, Result};
use delegate::delegate;
use rustc_hash::FxHashMap;

/// A connection from one machine's output to another's input. The wire owns
/// a queue element in between; the queue's pads never change, so they're
/// how a wire is recognized from the machines' side.
#[derive(Clone, Debug, PartialEq)]
pub struct Wire {
    #[allow(missing_docs)]
    pub uid: WireUid,
    /// The machine feeding the wire.
    pub src: MachineId,
    /// The machine the wire feeds.
    pub dst: MachineId,
    /// The wire's queue.
    pub element: ElementId,
    /// The queue's sink pad, linked to `src_machine_pad`.
    pub sink_pad: PadId,
    /// The queue's src pad, linked to `dst_machine_pad`.
    pub src_pad: PadId,
    /// Where the wire leaves the source machine. Kept current as slots are
    /// spliced in at that machine's output.
    pub src_machine_pad: PadId,
    /// Where the wire enters the destination machine. Kept current as slots
    /// are spliced in at that machine's input.
    pub dst_machine_pad: PadId,
}

/// Holds the song's [Wire]s in creation order.
#[derive(Debug, Default)]
pub struct WireRepository {
    uid_factory: UidFactory<WireUid>,
    wires: FxHashMap<WireUid, Wire>,
    uids: Vec<WireUid>,
}
impl WireRepository {
    /// Takes ownership of a wire. Fails if the pair is already connected.
    pub fn add_wire(&mut self, wire: Wire) -> Result<WireUid> {
        if self.wire_by_dst_machine(&wire.src, &wire.dst).is_some() {
            return Err(anyhow!("{} is already wired to {}", wire.src, wire.dst));
        }
        let uid = wire.uid;
        self.wires.insert(uid, wire);
        self.uids.push(uid);
        Ok(uid)
    }

    #[allow(missing_docs)]
    pub fn remove_wire(&mut self, uid: WireUid) -> Option<Wire> {
        self.uids.retain(|u| *u != uid);
        self.wires.remove(&uid)
    }

    #[allow(missing_docs)]
    pub fn wire(&self, uid: WireUid) -> Option<&Wire> {
        self.wires.get(&uid)
    }

    /// The wire from `src` to `dst`, if they're connected.
    pub fn wire_by_dst_machine(&self, src: &MachineId, dst: &MachineId) -> Option<WireUid> {
        self.uids
            .iter()
            .find(|uid| {
                self.wires
                    .get(*uid)
                    .is_some_and(|w| &w.src == src && &w.dst == dst)
            })
            .copied()
    }

    /// Wires feeding the machine.
    pub fn incoming(&self, machine: &MachineId) -> Vec<WireUid> {
        self.filtered(|w| &w.dst == machine)
    }

    /// Wires fed by the machine.
    pub fn outgoing(&self, machine: &MachineId) -> Vec<WireUid> {
        self.filtered(|w| &w.src == machine)
    }

    fn filtered(&self, f: impl Fn(&Wire) -> bool) -> Vec<WireUid> {
        self.uids
            .iter()
            .filter(|uid| self.wires.get(*uid).is_some_and(&f))
            .copied()
            .collect()
    }

    /// Finds the wire attached to `machine` at `end` through the queue pad
    /// `peer`.
    pub fn wire_by_peer_mut(
        &mut self,
        machine: &MachineId,
        end: WireEnd,
        peer: PadId,
    ) -> Option<&mut Wire> {
        self.wires.values_mut().find(|w| match end {
            WireEnd::Input => &w.dst == machine && w.src_pad == peer,
            WireEnd::Output => &w.src == machine && w.sink_pad == peer,
        })
    }

    /// Wire uids in creation order.
    pub fn uids(&self) -> &[WireUid] {
        &self.uids
    }

    delegate! {
        to self.uid_factory {
            #[call(mint_next)]
            /// Creates a new [WireUid].
            pub fn mint_wire_uid(&self) -> WireUid;
        }
    }
}
