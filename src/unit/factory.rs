// Copyright (c) 2024 Mike Tsao

use super::Unit;
use anyhow::{anyhow, Result};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use synonym::Synonym;

/// Names a kind of unit, such as a particular synthesizer plugin.
#[derive(Synonym, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UnitKey(String);

#[allow(missing_docs)]
pub type UnitFactoryFn = fn() -> Box<dyn Unit>;

/// [UnitFactory] turns [UnitKey]s into fresh units.
#[derive(Debug, Default)]
pub struct UnitFactory {
    units: FxHashMap<UnitKey, UnitFactoryFn>,
    keys: FxHashSet<UnitKey>,

    is_registration_complete: bool,
    sorted_keys: Vec<UnitKey>,
}
impl UnitFactory {
    /// Registers a constructor for the given [UnitKey].
    pub fn register_unit(&mut self, key: UnitKey, f: UnitFactoryFn) -> Result<()> {
        if self.is_registration_complete {
            return Err(anyhow!(
                "can't register {key} after registration completed"
            ));
        }
        if self.keys.insert(key.clone()) {
            self.units.insert(key, f);
            Ok(())
        } else {
            Err(anyhow!("register_unit({key}): duplicate key"))
        }
    }

    /// Like [UnitFactory::register_unit()], but takes a &str.
    pub fn register_unit_with_str_key(&mut self, key: &str, f: UnitFactoryFn) -> Result<()> {
        self.register_unit(UnitKey::from(key), f)
    }

    /// Tells the factory that we won't be registering any more units.
    pub fn finalize(mut self) -> Self {
        self.is_registration_complete = true;
        self.sorted_keys = self.keys.iter().cloned().collect();
        self.sorted_keys.sort();
        self
    }

    /// Creates a new unit of the kind named by the given key.
    pub fn new_unit(&self, key: &UnitKey) -> Option<Box<dyn Unit>> {
        if let Some(f) = self.units.get(key) {
            Some(f())
        } else {
            log::warn!("{key} produced no unit");
            None
        }
    }

    /// Returns all registered keys in sorted order. Empty until
    /// [UnitFactory::finalize()] has been called.
    pub fn sorted_keys(&self) -> &[UnitKey] {
        &self.sorted_keys
    }
}
