// Copyright (c) 2024 Mike Tsao

//! Unique identifiers for the objects that make up a machine graph, and
//! factories that help ensure they are in fact unique.

use core::sync::atomic::Ordering;
use core::{hash::Hash, marker::PhantomData, sync::atomic::AtomicUsize};
use delegate::delegate;
use serde::{Deserialize, Serialize};
use synonym::Synonym;

/// Identifies a machine within its song. Unlike the numeric ids below, this
/// one is chosen by the user and shows up in saved songs.
#[derive(Synonym, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MachineId(pub String);

/// An optional Uid trait.
pub trait IsUid: Eq + Hash + Clone + From<usize> {
    /// Returns the raw uid.
    fn as_usize(&self) -> usize;
}

macro_rules! numeric_uid {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Synonym, Serialize, Deserialize, Eq, PartialEq)]
        #[synonym(skip(PartialEq))]
        #[serde(rename_all = "kebab-case")]
        pub struct $name(pub usize);
        impl IsUid for $name {
            fn as_usize(&self) -> usize {
                self.0
            }
        }
    };
}

numeric_uid!(
    /// Identifies an element that the media pipeline created on our behalf.
    ElementId
);
numeric_uid!(
    /// Identifies one port of a pipeline element.
    PadId
);
numeric_uid!(
    /// Identifies a connection between two machines.
    WireUid
);
numeric_uid!(
    /// Identifies a pattern that refers to a machine. Patterns are owned
    /// elsewhere; machines only remember which ones point at them.
    PatternUid
);
numeric_uid!(
    /// Identifies a control curve owned by an
    /// [Automator](crate::automation::Automator).
    ControlUid
);

/// Generates unique uids.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UidFactory<U: IsUid> {
    pub(crate) next_uid_value: AtomicUsize,
    #[serde(skip)]
    pub(crate) _phantom: PhantomData<U>,
}
impl<U: IsUid> Default for UidFactory<U> {
    fn default() -> Self {
        Self::new(1)
    }
}
impl<U: IsUid> UidFactory<U> {
    /// Creates a new [UidFactory] starting with the given value.
    pub fn new(first_uid: usize) -> Self {
        Self {
            next_uid_value: AtomicUsize::new(first_uid),
            _phantom: Default::default(),
        }
    }

    /// Generates the next unique uid.
    pub fn mint_next(&self) -> U {
        let uid_value = self.next_uid_value.fetch_add(1, Ordering::Relaxed);
        U::from(uid_value)
    }

    /// Notifies the factory that a uid exists that might have been created
    /// elsewhere (for example, while restoring a saved song). This gives the
    /// factory an opportunity to adjust `next_uid_value` to stay consistent
    /// with all known uids.
    pub fn notify_externally_minted_uid(&self, uid: U) {
        if uid.as_usize() >= self.next_uid_value.load(Ordering::Relaxed) {
            self.next_uid_value
                .store(uid.as_usize() + 1, Ordering::Relaxed);
        }
    }
}
impl<U: IsUid> PartialEq for UidFactory<U> {
    fn eq(&self, other: &Self) -> bool {
        self.next_uid_value.load(Ordering::Relaxed) == other.next_uid_value.load(Ordering::Relaxed)
    }
}

/// A factory that generates unique [ControlUid]s.
#[derive(Synonym, Debug, Serialize, Deserialize)]
pub struct ControlUidFactory(UidFactory<ControlUid>);
impl Default for ControlUidFactory {
    fn default() -> Self {
        Self(UidFactory::<ControlUid>::new(1))
    }
}
impl ControlUidFactory {
    delegate! {
        to self.0 {
            /// Generates the next unique [ControlUid].
            pub fn mint_next(&self) -> ControlUid;
        }
    }
}
