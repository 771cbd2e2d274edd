// Copyright (c) 2024 Mike Tsao

use core::ops::RangeInclusive;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

/// How a single audio sample is stored.
#[derive(Clone, Copy, Debug, Display, EnumIter, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SampleFormat {
    /// Signed 16-bit integers.
    S16,
    /// Signed 32-bit integers.
    S32,
    /// 32-bit floating point.
    F32,
    /// 64-bit floating point.
    F64,
}

/// Describes the audio formats a port can carry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Caps {
    /// The acceptable sample encodings.
    pub formats: Vec<SampleFormat>,
    /// The acceptable channel counts.
    pub channels: RangeInclusive<u32>,
    /// The acceptable sample rates, in Hertz.
    pub rates: RangeInclusive<u32>,
}
impl Default for Caps {
    fn default() -> Self {
        Self::canonical_mixer()
    }
}
impl Caps {
    /// The format every adder mixes in: 32-bit float, mono or stereo, any
    /// rate.
    pub fn canonical_mixer() -> Self {
        Self {
            formats: vec![SampleFormat::F32],
            channels: 1..=2,
            rates: 1..=u32::MAX,
        }
    }

    /// Accepts anything.
    pub fn any() -> Self {
        Self {
            formats: vec![
                SampleFormat::S16,
                SampleFormat::S32,
                SampleFormat::F32,
                SampleFormat::F64,
            ],
            channels: 1..=u32::MAX,
            rates: 1..=u32::MAX,
        }
    }

    /// Whether at least one concrete format satisfies both sets of caps.
    pub fn can_intersect(&self, other: &Caps) -> bool {
        fn overlaps(a: &RangeInclusive<u32>, b: &RangeInclusive<u32>) -> bool {
            a.start() <= b.end() && b.start() <= a.end()
        }
        self.formats.iter().any(|f| other.formats.contains(f))
            && overlaps(&self.channels, &other.channels)
            && overlaps(&self.rates, &other.rates)
    }
}
