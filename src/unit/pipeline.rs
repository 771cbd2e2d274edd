// Copyright (c) 2024 Mike Tsao

use crate::types::{Caps, ElementId, PadId, ParamValue};
use core::fmt::Debug;
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use thiserror::Error;

/// Which way audio flows through a pad.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum PadDirection {
    /// Audio leaves the element here.
    Src,
    /// Audio enters the element here.
    Sink,
}

/// How many static pads of each direction an element has.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PadCounts {
    #[allow(missing_docs)]
    pub src: usize,
    #[allow(missing_docs)]
    pub sink: usize,
}

/// Well-known element factory names.
pub mod factories {
    /// Mixes any number of inputs into one output.
    pub const ADDER: &str = "adder";
    /// Restricts the format passing through it.
    pub const CAPS_FILTER: &str = "capsfilter";
    /// Converts between sample formats.
    pub const AUDIO_CONVERT: &str = "audioconvert";
    /// Measures signal level.
    pub const LEVEL: &str = "level";
    /// Scales the signal; has a `mute` switch.
    pub const VOLUME: &str = "volume";
    /// Copies one input to any number of outputs.
    pub const TEE: &str = "tee";
    /// Buffers between two machines. Every wire owns one.
    pub const QUEUE: &str = "queue";
}

/// What can go wrong when asking the pipeline to do something.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PipelineError {
    #[allow(missing_docs)]
    #[error("no element factory named '{0}'")]
    NoSuchFactory(String),
    #[allow(missing_docs)]
    #[error("element {0} not found")]
    NoSuchElement(ElementId),
    #[allow(missing_docs)]
    #[error("pad {0} not found")]
    NoSuchPad(PadId),
    #[allow(missing_docs)]
    #[error("element {element} has no property '{name}'")]
    NoSuchProperty { element: ElementId, name: String },
    #[allow(missing_docs)]
    #[error("element {element} can't have {direction} pads requested")]
    NoRequestPads {
        element: ElementId,
        direction: PadDirection,
    },
    #[allow(missing_docs)]
    #[error("pads {src} and {sink} can't be linked: {reason}")]
    LinkRefused {
        src: PadId,
        sink: PadId,
        reason: String,
    },
}

/// The media runtime that actually moves audio. Machines ask it to create
/// auxiliary elements and to connect their pads; they never touch audio
/// themselves.
pub trait Pipeline: Debug {
    /// Creates an element from the named factory.
    fn make_element(&mut self, factory: &str, name: &str) -> Result<ElementId, PipelineError>;

    /// Registers a unit's element, which has the given static pads.
    fn add_unit(&mut self, name: &str, pads: PadCounts) -> Result<ElementId, PipelineError>;

    /// Removes an element, unlinking and releasing all of its pads.
    fn remove_element(&mut self, element: ElementId);

    /// Whether the element has a property with this name.
    fn has_property(&self, element: ElementId, name: &str) -> bool;

    /// Reads an element property.
    fn property(&self, element: ElementId, name: &str) -> Option<ParamValue>;

    /// Writes an element property.
    fn set_property(
        &mut self,
        element: ElementId,
        name: &str,
        value: ParamValue,
    ) -> Result<(), PipelineError>;

    /// Writes an element's `caps` property.
    fn set_caps(&mut self, element: ElementId, caps: &Caps) -> Result<(), PipelineError>;

    /// Returns the element's always-present pad in the given direction, if it
    /// has one.
    fn static_pad(&self, element: ElementId, direction: PadDirection) -> Option<PadId>;

    /// Asks a fan-in or fan-out element for a new pad.
    fn request_pad(
        &mut self,
        element: ElementId,
        direction: PadDirection,
    ) -> Result<PadId, PipelineError>;

    /// Gives back a pad obtained from [Pipeline::request_pad()]. Does nothing
    /// for static pads.
    fn release_pad(&mut self, pad: PadId);

    /// Connects a source pad to a sink pad.
    fn link(&mut self, src: PadId, sink: PadId) -> Result<(), PipelineError>;

    /// Disconnects two pads. Returns false if they weren't connected.
    fn unlink(&mut self, src: PadId, sink: PadId) -> bool;

    /// Returns the pad this one is connected to.
    fn peer(&self, pad: PadId) -> Option<PadId>;
}
