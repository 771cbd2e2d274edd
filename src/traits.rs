// Copyright (c) 2024 Mike Tsao

//! Traits shared across the crate that don't belong to any one module.

/// Quick import of all important traits.
pub mod prelude {
    pub use super::HasSettings;
}

/// Tracks whether a settings struct has changed since it was last saved.
/// Structs composed of several settings structs can ask each of them.
pub trait HasSettings {
    /// Whether the current state of this struct has been saved to disk.
    fn has_been_saved(&self) -> bool;
    /// Call this whenever the struct changes.
    fn needs_save(&mut self);
    /// Call this after a load() or a save().
    fn mark_clean(&mut self);
}
