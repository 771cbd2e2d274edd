// Copyright (c) 2024 Mike Tsao

use super::Machine;
use crate::{
    orchestration::{GraphHost, MachineEvent},
    types::PatternUid,
};
use serde::{Deserialize, Serialize};

/// What a machine remembers about a pattern that refers to it. The pattern
/// itself lives elsewhere.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PatternInfo {
    #[allow(missing_docs)]
    pub uid: PatternUid,
    /// Unique among the machine's patterns.
    pub name: String,
    /// Internal patterns, like the ones that mute or break a track, aren't
    /// shown to the user or saved.
    pub is_internal: bool,
}
impl PatternInfo {
    #[allow(missing_docs)]
    pub fn new_with(uid: PatternUid, name: &str, is_internal: bool) -> Self {
        Self {
            uid,
            name: name.to_string(),
            is_internal,
        }
    }
}

impl Machine {
    /// Registers a pattern. Returns false if a pattern with the same uid or
    /// name is already registered.
    pub fn add_pattern(&mut self, host: &mut dyn GraphHost, pattern: PatternInfo) -> bool {
        if self
            .patterns
            .iter()
            .any(|p| p.uid == pattern.uid || p.name == pattern.name)
        {
            log::warn!(
                "{}: pattern '{}' is already registered",
                self.id,
                pattern.name
            );
            return false;
        }
        if pattern.is_internal {
            self.private_pattern_count += 1;
        } else {
            host.notify(MachineEvent::PatternAdded {
                machine: self.id.clone(),
                pattern: pattern.uid,
            });
            host.mark_unsaved();
        }
        self.patterns.push(pattern);
        true
    }

    /// Forgets a pattern. Returns what was registered, if anything.
    pub fn remove_pattern(
        &mut self,
        host: &mut dyn GraphHost,
        uid: PatternUid,
    ) -> Option<PatternInfo> {
        let index = self.patterns.iter().position(|p| p.uid == uid)?;
        let pattern = self.patterns.remove(index);
        if pattern.is_internal {
            self.private_pattern_count -= 1;
        } else {
            host.notify(MachineEvent::PatternRemoved {
                machine: self.id.clone(),
                pattern: uid,
            });
            host.mark_unsaved();
        }
        Some(pattern)
    }

    #[allow(missing_docs)]
    pub fn pattern_by_name(&self, name: &str) -> Option<&PatternInfo> {
        self.patterns.iter().find(|p| p.name == name)
    }

    #[allow(missing_docs)]
    pub fn pattern_by_uid(&self, uid: PatternUid) -> Option<&PatternInfo> {
        self.patterns.iter().find(|p| p.uid == uid)
    }

    /// The nth pattern the user can see. Internal patterns don't count.
    pub fn pattern_by_index(&self, index: usize) -> Option<&PatternInfo> {
        self.patterns.iter().filter(|p| !p.is_internal).nth(index)
    }

    /// Every registered pattern, internal ones included.
    pub fn patterns(&self) -> &[PatternInfo] {
        &self.patterns
    }

    /// Whether the user has made any patterns for this machine.
    pub fn has_patterns(&self) -> bool {
        self.patterns.len() > self.private_pattern_count
    }

    /// The first two-digit name no pattern is using yet.
    pub fn unique_pattern_name(&self) -> Option<String> {
        (0..100)
            .map(|i| format!("{i:02}"))
            .find(|name| self.pattern_by_name(name).is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        machine::MachineKind,
        testing::{test_machine, TestHost, TestSynth},
    };

    #[test]
    fn registry_mainline() {
        let mut host = TestHost::default();
        let mut m = test_machine(&mut host, "synth", TestSynth::UNIT_KEY, MachineKind::Source, 1);
        assert!(!m.has_patterns());
        assert_eq!(m.unique_pattern_name(), Some("00".to_string()));

        assert!(m.add_pattern(&mut host, PatternInfo::new_with(PatternUid(1), "mute", true)));
        assert!(
            host.events.is_empty() && !host.is_unsaved,
            "internal patterns are quiet"
        );
        assert!(!m.has_patterns(), "internal patterns don't count");

        assert!(m.add_pattern(&mut host, PatternInfo::new_with(PatternUid(2), "00", false)));
        assert!(m.add_pattern(&mut host, PatternInfo::new_with(PatternUid(3), "01", false)));
        assert_eq!(
            host.events.first(),
            Some(&MachineEvent::PatternAdded {
                machine: m.id().clone(),
                pattern: PatternUid(2)
            })
        );
        assert!(host.is_unsaved);
        assert!(m.has_patterns());
        assert_eq!(m.unique_pattern_name(), Some("02".to_string()));

        assert!(
            !m.add_pattern(&mut host, PatternInfo::new_with(PatternUid(9), "00", false)),
            "names must be unique"
        );
        assert!(!m.add_pattern(&mut host, PatternInfo::new_with(PatternUid(2), "zz", false)));

        assert_eq!(m.pattern_by_index(0).map(|p| p.uid), Some(PatternUid(2)));
        assert_eq!(m.pattern_by_index(1).map(|p| p.uid), Some(PatternUid(3)));
        assert!(m.pattern_by_index(2).is_none());
        assert_eq!(m.pattern_by_name("01").map(|p| p.uid), Some(PatternUid(3)));

        host.events.clear();
        assert!(m.remove_pattern(&mut host, PatternUid(2)).is_some());
        assert_eq!(
            host.events,
            vec![MachineEvent::PatternRemoved {
                machine: m.id().clone(),
                pattern: PatternUid(2)
            }]
        );
        assert!(m.remove_pattern(&mut host, PatternUid(2)).is_none());
        assert!(m.remove_pattern(&mut host, PatternUid(1)).is_some());
        assert_eq!(m.patterns().len(), 1);
        assert_eq!(m.unique_pattern_name(), Some("00".to_string()));
    }
}
