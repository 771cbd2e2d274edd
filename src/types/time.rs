// Copyright (c) 2024 Mike Tsao

use core::fmt;
use derivative::Derivative;
use serde::{Deserialize, Serialize};
use synonym::Synonym;

/// A position on the song timeline, counted in ticks from the start of the
/// song.
#[derive(Synonym, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Timestamp(pub u64);
impl Timestamp {
    /// The start of the song. Automation curves always carry a value here.
    pub const ZERO: Timestamp = Timestamp(0);

    #[allow(missing_docs)]
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

/// The song's tempo as the sequencer sees it: beats per minute, and how many
/// ticks make up a beat.
#[derive(Clone, Copy, Debug, Derivative, PartialEq, Eq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(rename_all = "kebab-case")]
pub struct SongTempo {
    /// Beats per minute.
    #[derivative(Default(value = "125"))]
    pub bpm: u32,
    /// Ticks per beat.
    #[derivative(Default(value = "4"))]
    pub tpb: u32,
}
impl fmt::Display for SongTempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{} BPM, {} TPB", self.bpm, self.tpb))
    }
}
