//! Per-run memoisation of visited groups and their resolved members.
//!
//! Entries live in an arena (`Vec`) addressed by index, with a map from the
//! provider-native group id to that index. An id present in the map has been
//! visited; that is the walker's cycle guard. Cached groups carry no
//! sub-group stubs, the walker consumes those. Entries are only handed out
//! as copies.

use std::collections::HashMap;

use crate::contract::{NativeGroup, NativeUser};

#[derive(Debug, Clone)]
struct Entry {
    group: NativeGroup,
    members: Vec<NativeUser>,
}

#[derive(Debug, Default)]
pub struct GroupCache {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
}

impl GroupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every entry. Called at the start of each run.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    pub fn contains(&self, group_id: &str) -> bool {
        self.index.contains_key(group_id)
    }

    /// Slot of a visited group.
    pub fn slot(&self, group_id: &str) -> Option<usize> {
        self.index.get(group_id).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a visited group and its direct members, returning its slot.
    ///
    /// A second insert for the same id keeps the first entry and returns its slot.
    pub fn insert(&mut self, group: NativeGroup, members: Vec<NativeUser>) -> usize {
        if let Some(&slot) = self.index.get(&group.id) {
            return slot;
        }
        let slot = self.entries.len();
        self.index.insert(group.id.clone(), slot);
        self.entries.push(Entry { group, members });
        slot
    }

    /// Append the child's current member list onto the parent's.
    pub(crate) fn bubble(&mut self, child: usize, parent: usize) {
        if child == parent {
            return;
        }
        let Some(child_members) = self.entries.get(child).map(|e| e.members.clone()) else {
            return;
        };
        if let Some(parent_entry) = self.entries.get_mut(parent) {
            parent_entry.members.extend(child_members);
        }
    }

    /// Ids in visiting order.
    pub fn group_ids(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.group.id.clone()).collect()
    }

    /// Copy of the resolved members for `group_id`.
    pub fn members(&self, group_id: &str) -> Option<Vec<NativeUser>> {
        self.index
            .get(group_id)
            .map(|&slot| self.entries[slot].members.clone())
    }

    /// Copies of every `(group, members)` pair, in visiting order.
    pub fn snapshot(&self) -> Vec<(NativeGroup, Vec<NativeUser>)> {
        self.entries
            .iter()
            .map(|e| (e.group.clone(), e.members.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str) -> NativeUser {
        NativeUser::new(format!("id-{name}"), name)
    }

    #[test]
    fn insert_is_idempotent_per_id() {
        let mut cache = GroupCache::new();
        let first = cache.insert(NativeGroup::new("g1", "eng"), vec![user("alice")]);
        let second = cache.insert(NativeGroup::new("g1", "renamed"), vec![user("bob")]);

        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.members("g1").unwrap(), vec![user("alice")]);
    }

    #[test]
    fn bubble_appends_without_dedup() {
        let mut cache = GroupCache::new();
        let parent = cache.insert(NativeGroup::new("p", "parent"), vec![user("alice")]);
        let child = cache.insert(NativeGroup::new("c", "child"), vec![user("alice")]);

        cache.bubble(child, parent);

        let names: Vec<_> = cache
            .members("p")
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, vec!["alice", "alice"]);
    }

    #[test]
    fn slot_matches_insert() {
        let mut cache = GroupCache::new();
        let slot = cache.insert(NativeGroup::new("g1", "eng"), Vec::new());

        assert_eq!(cache.slot("g1"), Some(slot));
        assert_eq!(cache.slot("g2"), None);
    }

    #[test]
    fn clear_forgets_everything() {
        let mut cache = GroupCache::new();
        cache.insert(NativeGroup::new("g1", "eng"), Vec::new());
        cache.clear();

        assert!(cache.is_empty());
        assert!(!cache.contains("g1"));
    }
}
