//! Change-sets.

use graphsync_codec::{CodecResult, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque identifier of one addressable object in the graph.
pub type EntityKey = String;

/// Property map of a single entity.
pub type Properties = BTreeMap<String, Value>;

/// Full register state: entity key → properties.
pub type Snapshot = BTreeMap<EntityKey, Properties>;

/// A single property write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Change {
    /// Entity the property belongs to.
    pub key: EntityKey,
    /// Property name.
    pub property: String,
    /// New value.
    pub value: Value,
}

impl Change {
    /// Creates a new change.
    pub fn new(
        key: impl Into<EntityKey>,
        property: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            key: key.into(),
            property: property.into(),
            value: value.into(),
        }
    }

    /// Returns true if this change writes the same field as `other`.
    pub fn same_field(&self, other: &Change) -> bool {
        self.key == other.key && self.property == other.property
    }
}

/// A batch of adds, property changes and removes.
///
/// Adds and removes keep the order they were produced in, and changes are
/// an ordered sequence: a later change to the same field wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChangeSet {
    /// Keys to create (idempotent).
    pub adds: Vec<EntityKey>,
    /// Keys to delete together with their properties.
    pub removes: Vec<EntityKey>,
    /// Property writes.
    pub changes: Vec<Change>,
}

impl ChangeSet {
    /// Creates an empty change-set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a key.
    pub fn with_add(mut self, key: impl Into<EntityKey>) -> Self {
        self.adds.push(key.into());
        self
    }

    /// Removes a key.
    pub fn with_remove(mut self, key: impl Into<EntityKey>) -> Self {
        self.removes.push(key.into());
        self
    }

    /// Sets a property.
    pub fn with_change(
        mut self,
        key: impl Into<EntityKey>,
        property: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.changes.push(Change::new(key, property, value));
        self
    }

    /// Derives the change-set that rebuilds `snapshot` from an empty register.
    ///
    /// Every key becomes an add (including entities without properties),
    /// every property becomes a change, and there are no removes.
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let adds = snapshot.keys().cloned().collect();
        let changes = snapshot
            .iter()
            .flat_map(|(key, properties)| {
                properties
                    .iter()
                    .map(move |(property, value)| Change::new(key.clone(), property.clone(), value.clone()))
            })
            .collect();

        Self {
            adds,
            removes: Vec::new(),
            changes,
        }
    }

    /// Returns true if the change-set carries nothing.
    pub fn is_empty(&self) -> bool {
        self.adds.is_empty() && self.removes.is_empty() && self.changes.is_empty()
    }

    /// Total number of operations.
    pub fn len(&self) -> usize {
        self.adds.len() + self.removes.len() + self.changes.len()
    }

    /// Checks every value can be replicated.
    pub fn validate(&self) -> CodecResult<()> {
        self.changes.iter().try_for_each(|c| c.value.validate())
    }
}

impl fmt::Display for ChangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "adds={} changes={} removes={}",
            self.adds.len(),
            self.changes.len(),
            self.removes.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphsync_codec::{from_cbor, to_cbor, CodecError};

    #[test]
    fn builder() {
        let set = ChangeSet::new()
            .with_add("t1")
            .with_change("t1", "text", "buy milk")
            .with_change("todos", "t1", "t1")
            .with_remove("t0");

        assert_eq!(set.adds, vec!["t1".to_string()]);
        assert_eq!(set.removes, vec!["t0".to_string()]);
        assert_eq!(set.changes.len(), 2);
        assert_eq!(set.len(), 4);
        assert!(!set.is_empty());
        assert!(ChangeSet::new().is_empty());
    }

    #[test]
    fn from_snapshot_covers_empty_entities() {
        let mut snapshot = Snapshot::new();
        snapshot.insert("todos".into(), Properties::new());
        let mut todo = Properties::new();
        todo.insert("completed".into(), Value::Bool(false));
        todo.insert("text".into(), Value::from("walk dog"));
        snapshot.insert("t1".into(), todo);

        let set = ChangeSet::from_snapshot(&snapshot);

        assert_eq!(set.adds, vec!["t1".to_string(), "todos".to_string()]);
        assert!(set.removes.is_empty());
        assert_eq!(
            set.changes,
            vec![
                Change::new("t1", "completed", false),
                Change::new("t1", "text", "walk dog"),
            ]
        );
    }

    #[test]
    fn same_field() {
        let a = Change::new("t1", "completed", true);
        assert!(a.same_field(&Change::new("t1", "completed", false)));
        assert!(!a.same_field(&Change::new("t1", "text", true)));
        assert!(!a.same_field(&Change::new("t2", "completed", true)));
    }

    #[test]
    fn validate_rejects_nan_values() {
        let set = ChangeSet::new().with_change("t1", "weight", f64::NAN);
        assert_eq!(set.validate(), Err(CodecError::NonFiniteFloat));
        assert!(ChangeSet::new().with_change("t1", "weight", 1.0).validate().is_ok());
    }

    #[test]
    fn cbor_shape_is_strict() {
        #[derive(Serialize)]
        struct Partial {
            adds: Vec<String>,
        }

        let bytes = to_cbor(&Partial {
            adds: vec!["x".into()],
        })
        .unwrap();
        assert!(from_cbor::<ChangeSet>(&bytes).is_err());

        let set = ChangeSet::new().with_add("x").with_change("x", "p", 1);
        let decoded: ChangeSet = from_cbor(&to_cbor(&set).unwrap()).unwrap();
        assert_eq!(decoded, set);
    }

    #[test]
    fn display_summarizes_counts() {
        let set = ChangeSet::new().with_add("a").with_change("a", "p", 1);
        assert_eq!(set.to_string(), "adds=1 changes=1 removes=0");
    }
}
