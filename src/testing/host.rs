// Copyright (c) 2024 Mike Tsao

use super::TestPipeline;
use crate::{
    orchestration::{GraphHost, MachineEvent, WireEnd},
    types::{MachineId, PadId, PatternUid},
    unit::Pipeline,
};
use anyhow::anyhow;

/// A [GraphHost] that records everything asked of it. Wire reconnection
/// links the pads directly, as if a wire were there, unless
/// `refuse_reconnects` is set.
#[derive(Debug, Default)]
pub struct TestHost {
    #[allow(missing_docs)]
    pub pipeline: TestPipeline,
    /// Every event delivered, oldest first.
    pub events: Vec<MachineEvent>,
    #[allow(missing_docs)]
    pub is_unsaved: bool,
    /// (machine, end, peer, new pad) for each successful reconnection.
    pub reconnects: Vec<(MachineId, WireEnd, PadId, PadId)>,
    /// Makes every reconnection fail.
    pub refuse_reconnects: bool,
    /// (pattern, voices) for each resize request.
    pub pattern_resizes: Vec<(PatternUid, usize)>,
}
impl GraphHost for TestHost {
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
    ) -> anyhow::Result<()> {
        if self.refuse_reconnects {
            return Err(anyhow!("reconnection refused"));
        }
        match end {
            WireEnd::Input => self.pipeline.link(peer, pad)?,
            WireEnd::Output => self.pipeline.link(pad, peer)?,
        }
        self.reconnects.push((machine.clone(), end, peer, pad));
        Ok(())
    }

    fn resize_pattern_voices(&mut self, pattern: PatternUid, voices: usize) {
        self.pattern_resizes.push((pattern, voices));
    }

    fn notify(&mut self, event: MachineEvent) {
        self.events.push(event);
    }

    fn mark_unsaved(&mut self) {
        self.is_unsaved = true;
    }
}
