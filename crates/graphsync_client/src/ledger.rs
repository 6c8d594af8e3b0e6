//! Unconfirmed-operation ledger.

use graphsync_protocol::{Change, ChangeSet, EntityKey};
use tracing::debug;

/// Local adds and changes the hub has not echoed back yet.
///
/// Removes are never recorded. Entries leave the ledger only when a
/// matching broadcast confirms them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnconfirmedLedger {
    adds: Vec<EntityKey>,
    changes: Vec<Change>,
}

impl UnconfirmedLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the adds and changes of a locally applied change-set.
    pub fn record(&mut self, change_set: &ChangeSet) {
        self.adds.extend(change_set.adds.iter().cloned());
        self.changes.extend(change_set.changes.iter().cloned());
    }

    /// Filters a broadcast against the ledger and returns what remains to
    /// be applied locally.
    ///
    /// An add or change that matches the first pending entry confirms it
    /// and is dropped. A change to a pending field with a different value
    /// is a stale echo: it is dropped and the entry stays pending. Removes
    /// pass through untouched.
    pub fn reconcile(&mut self, incoming: &ChangeSet) -> ChangeSet {
        let mut effective = ChangeSet::new();

        for key in &incoming.adds {
            match self.adds.iter().position(|pending| pending == key) {
                Some(index) => {
                    debug!(%key, "add confirmed");
                    self.adds.remove(index);
                }
                None => effective.adds.push(key.clone()),
            }
        }

        for change in &incoming.changes {
            match self.changes.iter().position(|pending| pending.same_field(change)) {
                Some(index) if self.changes[index].value == change.value => {
                    debug!(key = %change.key, property = %change.property, "change confirmed");
                    self.changes.remove(index);
                }
                Some(_) => {
                    debug!(key = %change.key, property = %change.property, "stale echo ignored");
                }
                None => effective.changes.push(change.clone()),
            }
        }

        effective.removes = incoming.removes.clone();
        effective
    }

    /// Pending adds, oldest first.
    pub fn unconfirmed_adds(&self) -> &[EntityKey] {
        &self.adds
    }

    /// Pending changes, oldest first.
    pub fn unconfirmed_changes(&self) -> &[Change] {
        &self.changes
    }

    /// Returns true if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.adds.is_empty() && self.changes.is_empty()
    }

    /// Number of pending entries.
    pub fn len(&self) -> usize {
        self.adds.len() + self.changes.len()
    }

    /// Forgets every pending entry.
    pub fn clear(&mut self) {
        self.adds.clear();
        self.changes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_echo_is_fully_suppressed() {
        let local = ChangeSet::new()
            .with_add("t1")
            .with_change("t1", "completed", false)
            .with_change("todos", "t1", "t1");

        let mut ledger = UnconfirmedLedger::new();
        ledger.record(&local);
        assert_eq!(ledger.len(), 3);

        let effective = ledger.reconcile(&local);

        assert!(effective.is_empty());
        assert!(ledger.is_empty());
    }

    #[test]
    fn stale_echo_is_dropped_and_entry_kept() {
        let mut ledger = UnconfirmedLedger::new();
        ledger.record(&ChangeSet::new().with_change("t1", "completed", true));

        let effective = ledger.reconcile(&ChangeSet::new().with_change("t1", "completed", false));

        assert!(effective.changes.is_empty());
        assert_eq!(
            ledger.unconfirmed_changes(),
            &[Change::new("t1", "completed", true)]
        );

        // The matching echo confirms it later.
        ledger.reconcile(&ChangeSet::new().with_change("t1", "completed", true));
        assert!(ledger.is_empty());
    }

    #[test]
    fn only_first_matching_entry_is_confirmed() {
        let mut ledger = UnconfirmedLedger::new();
        ledger.record(&ChangeSet::new().with_change("t1", "n", 1));
        ledger.record(&ChangeSet::new().with_change("t1", "n", 2));

        ledger.reconcile(&ChangeSet::new().with_change("t1", "n", 1));
        assert_eq!(ledger.unconfirmed_changes(), &[Change::new("t1", "n", 2)]);

        ledger.reconcile(&ChangeSet::new().with_change("t1", "n", 2));
        assert!(ledger.is_empty());
    }

    #[test]
    fn remote_operations_pass_through() {
        let mut ledger = UnconfirmedLedger::new();
        ledger.record(&ChangeSet::new().with_add("mine"));

        let remote = ChangeSet::new()
            .with_add("theirs")
            .with_change("theirs", "text", "hello")
            .with_remove("old");
        let effective = ledger.reconcile(&remote);

        assert_eq!(effective, remote);
        assert_eq!(ledger.unconfirmed_adds(), &["mine".to_string()]);
    }

    #[test]
    fn removes_are_never_filtered() {
        let mut ledger = UnconfirmedLedger::new();
        let local = ChangeSet::new().with_remove("t1");
        ledger.record(&local);
        assert!(ledger.is_empty());

        assert_eq!(ledger.reconcile(&local).removes, vec!["t1".to_string()]);
    }

    #[test]
    fn duplicate_adds_confirm_one_at_a_time() {
        let mut ledger = UnconfirmedLedger::new();
        ledger.record(&ChangeSet::new().with_add("a"));
        ledger.record(&ChangeSet::new().with_add("a"));

        assert!(ledger.reconcile(&ChangeSet::new().with_add("a")).is_empty());
        assert_eq!(ledger.unconfirmed_adds().len(), 1);

        ledger.clear();
        assert_eq!(
            ledger.reconcile(&ChangeSet::new().with_add("a")).adds,
            vec!["a".to_string()]
        );
    }
}
