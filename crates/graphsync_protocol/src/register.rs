//! The replicated register.

use crate::change_set::{Change, ChangeSet, EntityKey, Properties, Snapshot};
use graphsync_codec::Value;

/// Key → property → value store.
///
/// The same register runs on the hub and inside every client. It has no
/// failure modes: references to absent keys are silent no-ops, so stale
/// change-sets arriving around a reconnect cannot corrupt it.
///
/// # Conflict policy
///
/// A property write unconditionally overwrites the previous value. When two
/// replicas write the same field concurrently, the write the hub broadcasts
/// last wins everywhere; there are no timestamps and no origin tie-break.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Register {
    state: Snapshot,
}

impl Register {
    /// Creates an empty register.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a register holding `snapshot`.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self { state: snapshot }
    }

    /// Replaces the whole state.
    pub fn restore(&mut self, snapshot: Snapshot) {
        self.state = snapshot;
    }

    /// Creates every key not already present with an empty property map.
    ///
    /// Existing keys keep their properties.
    pub fn apply_add<I, K>(&mut self, keys: I)
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        for key in keys {
            let key = key.as_ref();
            if !self.state.contains_key(key) {
                self.state.insert(key.to_owned(), Properties::new());
            }
        }
    }

    /// Deletes keys together with their properties. Absent keys are ignored.
    pub fn apply_remove<I, K>(&mut self, keys: I)
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        for key in keys {
            self.state.remove(key.as_ref());
        }
    }

    /// Writes one property. Returns false (and does nothing) if the key is
    /// absent.
    pub fn apply_change(&mut self, change: &Change) -> bool {
        match self.state.get_mut(&change.key) {
            Some(properties) => {
                properties.insert(change.property.clone(), change.value.clone());
                true
            }
            None => false,
        }
    }

    /// Applies a whole change-set: adds, then changes, then removes.
    pub fn apply(&mut self, change_set: &ChangeSet) {
        self.apply_add(&change_set.adds);
        for change in &change_set.changes {
            self.apply_change(change);
        }
        self.apply_remove(&change_set.removes);
    }

    /// Returns an independent deep copy of the state.
    pub fn snapshot(&self) -> Snapshot {
        self.state.clone()
    }

    /// Derives a change-set that rebuilds this state from an empty register.
    pub fn to_change_set(&self) -> ChangeSet {
        ChangeSet::from_snapshot(&self.state)
    }

    /// Returns the properties of `key`.
    pub fn get(&self, key: &str) -> Option<&Properties> {
        self.state.get(key)
    }

    /// Returns a single property value.
    pub fn property(&self, key: &str, property: &str) -> Option<&Value> {
        self.state.get(key).and_then(|p| p.get(property))
    }

    /// Returns true if `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.state.contains_key(key)
    }

    /// Iterates over present keys.
    pub fn keys(&self) -> impl Iterator<Item = &EntityKey> {
        self.state.keys()
    }

    /// Number of entities.
    pub fn len(&self) -> usize {
        self.state.len()
    }

    /// Returns true if the register holds no entities.
    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    /// Borrows the live state.
    pub fn state(&self) -> &Snapshot {
        &self.state
    }
}
