//! In-memory versioned state store
//!
//! Holds the committed state and applies batches of merge values. A batch is
//! reduced against a staged copy of the touched keys first and only written
//! back when every merge value succeeded, so a failing batch leaves no trace.

use crate::{
    error::Result,
    state::{State, StateMergeValue, StateReader},
    types::Height,
    StateValue,
};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// In-memory state store
#[derive(Debug, Default)]
pub struct MemoryState {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    states: BTreeMap<String, State>,
    height: Option<Height>,
}

impl MemoryState {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a value directly, bypassing merge rules (bootstrap only)
    pub fn set(&self, key: impl Into<String>, value: StateValue, height: Height) {
        let key = key.into();
        let mut inner = self.inner.write();
        inner.states.insert(
            key.clone(),
            State {
                key,
                value,
                height,
            },
        );
    }

    /// Apply a batch of merge values at `height`, all or nothing
    ///
    /// Merge values for the same key are reduced in batch order.
    pub fn merge(&self, height: Height, values: &[StateMergeValue]) -> Result<()> {
        let mut inner = self.inner.write();

        let mut staged: BTreeMap<String, StateValue> = BTreeMap::new();
        for value in values {
            let prior = staged
                .get(value.key())
                .or_else(|| inner.states.get(value.key()).map(|st| &st.value));
            let merged = value.merge(prior)?;
            staged.insert(value.key().to_string(), merged);
        }

        for (key, value) in staged {
            inner.states.insert(
                key.clone(),
                State {
                    key,
                    value,
                    height,
                },
            );
        }
        inner.height = Some(inner.height.map_or(height, |h| h.max(height)));

        tracing::debug!(
            "Merged {} state values at height {}",
            values.len(),
            height
        );

        Ok(())
    }

    /// Highest height merged so far
    pub fn height(&self) -> Option<Height> {
        self.inner.read().height
    }

    /// Snapshot of all states, ordered by key
    pub fn states(&self) -> Vec<State> {
        self.inner.read().states.values().cloned().collect()
    }

    /// Number of stored states
    pub fn len(&self) -> usize {
        self.inner.read().states.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.inner.read().states.is_empty()
    }
}

impl StateReader for MemoryState {
    fn get(&self, key: &str) -> Result<Option<State>> {
        Ok(self.inner.read().states.get(key).cloned())
    }
}
