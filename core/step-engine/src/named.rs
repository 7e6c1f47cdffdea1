//! FILENAME: core/step-engine/src/named.rs
//! PURPOSE: Insertion-ordered environment of named intermediate results.
//! CONTEXT: Aggregate columns and summary formulas bind their result under a
//! caller-chosen name; later entries of the same call may reference it. The
//! environment is owned by the evaluation loop and threaded through by value,
//! never shared: a name becomes visible only after its entry has run.

use rustc_hash::FxHashMap;

use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq)]
pub struct NamedValues<V> {
    entries: Vec<(String, V)>,
    index: FxHashMap<String, usize>,
}

impl<V> Default for NamedValues<V> {
    fn default() -> Self {
        NamedValues {
            entries: Vec::new(),
            index: FxHashMap::default(),
        }
    }
}

impl<V> NamedValues<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `value` under `name` and returns the grown environment.
    /// Rebinding a name is an error: entries are single-assignment.
    pub fn bind(mut self, name: &str, value: V) -> Result<Self, ValidationError> {
        if self.index.contains_key(name) {
            return Err(ValidationError::new(format!("'{}' is defined more than once", name))
                .field("name")
                .with_detail("value", name));
        }
        self.index.insert(name.to_string(), self.entries.len());
        self.entries.push((name.to_string(), value));
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&V> {
        self.index.get(name).map(|&i| &self.entries[i].1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Bound names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up both operands of a combinator, reporting the first missing one
    /// together with everything bound so far.
    pub fn pair(&self, field: &str, left: &str, right: &str) -> Result<(&V, &V), ValidationError> {
        let lookup = |name: &str| {
            self.get(name)
                .ok_or_else(|| ValidationError::unknown_reference(field, name, self.names()))
        };
        Ok((lookup(left)?, lookup(right)?))
    }

    pub fn into_entries(self) -> Vec<(String, V)> {
        self.entries
    }
}
