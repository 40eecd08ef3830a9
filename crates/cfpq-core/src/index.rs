use crate::error::{CfpqError, Result};
use rustc_hash::FxHashMap;
use std::hash::Hash;

/// Bijection between states and the dense indices `0..n` used by matrices.
///
/// Indices are handed out in first-seen order and never change, so an
/// automaton's matrices stay valid for the lifetime of its index.
#[derive(Debug, Clone)]
pub struct StateIndex<S> {
    states: Vec<S>,
    index: FxHashMap<S, u32>,
}

impl<S> Default for StateIndex<S> {
    fn default() -> Self {
        StateIndex {
            states: Vec::new(),
            index: FxHashMap::default(),
        }
    }
}

impl<S: Clone + Eq + Hash> StateIndex<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a state. Returns its index, allocating the next one if unseen.
    ///
    /// Fails once the `u32` index space is exhausted.
    pub fn try_intern(&mut self, state: S) -> Result<u32> {
        if let Some(&id) = self.index.get(&state) {
            return Ok(id);
        }
        let n = self.states.len();
        let id = u32::try_from(n).map_err(|_| {
            let limit = u32::MAX as usize;
            CfpqError::dimension_mismatch((n + 1, n + 1), (limit, limit))
        })?;
        self.states.push(state.clone());
        self.index.insert(state, id);
        Ok(id)
    }

    /// Panicking [`try_intern`](Self::try_intern), for sources that cannot
    /// exceed `u32::MAX` distinct states.
    pub fn intern(&mut self, state: S) -> u32 {
        match self.try_intern(state) {
            Ok(id) => id,
            Err(e) => panic!("{e}"),
        }
    }

    /// Index over `states` in first-seen order.
    pub fn try_from_states<I: IntoIterator<Item = S>>(states: I) -> Result<Self> {
        let mut idx = StateIndex::new();
        for s in states {
            idx.try_intern(s)?;
        }
        Ok(idx)
    }

    pub fn index_of(&self, state: &S) -> Option<u32> {
        self.index.get(state).copied()
    }

    pub fn state(&self, id: u32) -> Option<&S> {
        self.states.get(id as usize)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// States in index order.
    pub fn states(&self) -> &[S] {
        &self.states
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &S)> + '_ {
        self.states.iter().enumerate().map(|(i, s)| (i as u32, s))
    }
}

impl<S: Clone + Eq + Hash> FromIterator<S> for StateIndex<S> {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut idx = StateIndex::new();
        for s in iter {
            idx.intern(s);
        }
        idx
    }
}
