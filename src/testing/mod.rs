// Copyright (c) 2024 Mike Tsao

//! Test doubles for everything a machine touches: units, the media
//! pipeline, the song graph, and interaction controls. They're built for
//! introspection rather than for making sound.

pub use factory::{register_test_units, test_factory, test_machine, test_machine_with_settings};
pub use host::TestHost;
pub use interaction::{TestControlHandle, TestInteractionControl, TestInteractionRegistry};
pub use pipeline::TestPipeline;
pub use units::{TestEffect, TestSink, TestSynth, TestVoice};

mod factory;
mod host;
mod interaction;
mod pipeline;
mod units;
