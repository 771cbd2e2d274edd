// Copyright (c) 2024 Mike Tsao

use super::ControlCurve;
use crate::types::{ControlUid, ControlUidFactory};
use core::fmt::Debug;
use rustc_hash::FxHashMap;

/// Owns every [ControlCurve] of one machine. Parameters refer to their curve
/// by [ControlUid] and never hold the curve itself.
#[derive(Debug, Default)]
pub struct Automator {
    uid_factory: ControlUidFactory,
    curves: FxHashMap<ControlUid, ControlCurve>,
}
impl Automator {
    /// Takes ownership of a curve and returns its handle.
    pub fn add_curve(&mut self, curve: ControlCurve) -> ControlUid {
        let uid = self.uid_factory.mint_next();
        self.curves.insert(uid, curve);
        uid
    }

    /// Destroys a curve.
    pub fn remove_curve(&mut self, uid: ControlUid) -> Option<ControlCurve> {
        self.curves.remove(&uid)
    }

    #[allow(missing_docs)]
    pub fn curve(&self, uid: ControlUid) -> Option<&ControlCurve> {
        self.curves.get(&uid)
    }

    #[allow(missing_docs)]
    pub fn curve_mut(&mut self, uid: ControlUid) -> Option<&mut ControlCurve> {
        self.curves.get_mut(&uid)
    }

    /// How many curves exist.
    pub fn len(&self) -> usize {
        self.curves.len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    /// Destroys every curve.
    pub fn clear(&mut self) {
        self.curves.clear();
    }
}
