use crate::index::StateIndex;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;

/// Label id reserved for epsilon arcs.
pub const EPSILON: u32 = u32::MAX;

/// Finite automaton as parallel arc arrays over states `0..num_states`.
///
/// Labels are ids into `symbols`; `EPSILON` marks an empty move. This is the
/// working form for regex compilation, subset construction and minimization
/// before an automaton is lifted into boolean matrices.
#[derive(Debug, Clone, Default)]
pub struct Fsa {
    pub num_states: u32,
    pub start: Vec<u32>,
    pub stop: Vec<u32>,
    pub arc_src: Vec<u32>,
    pub arc_lbl: Vec<u32>,
    pub arc_dst: Vec<u32>,
    pub symbols: StateIndex<String>,
}

impl Fsa {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_state(&mut self) -> u32 {
        self.num_states += 1;
        self.num_states - 1
    }

    pub fn add_arc(&mut self, src: u32, lbl: u32, dst: u32) {
        self.arc_src.push(src);
        self.arc_lbl.push(lbl);
        self.arc_dst.push(dst);
    }

    pub fn add_epsilon(&mut self, src: u32, dst: u32) {
        self.add_arc(src, EPSILON, dst);
    }

    /// Add an arc labeled by `symbol`, interning the symbol.
    pub fn add_symbol_arc(&mut self, src: u32, symbol: &str, dst: u32) {
        let lbl = self.symbols.intern(symbol.to_string());
        self.add_arc(src, lbl, dst);
    }

    pub fn num_arcs(&self) -> usize {
        self.arc_src.len()
    }

    pub fn has_epsilon(&self) -> bool {
        self.arc_lbl.contains(&EPSILON)
    }

    pub fn symbol(&self, lbl: u32) -> Option<&str> {
        self.symbols.state(lbl).map(String::as_str)
    }

    /// True if no state has two arcs with the same label and there are no
    /// epsilon arcs or multiple start states.
    pub fn is_deterministic(&self) -> bool {
        if self.start.len() > 1 || self.has_epsilon() {
            return false;
        }
        let mut seen: FxHashSet<(u32, u32)> = FxHashSet::default();
        (0..self.num_arcs()).all(|i| seen.insert((self.arc_src[i], self.arc_lbl[i])))
    }

    /// Outgoing `(label, dest)` pairs per state.
    pub(crate) fn adjacency(&self) -> Vec<Vec<(u32, u32)>> {
        let mut out = vec![Vec::new(); self.num_states as usize];
        for i in 0..self.num_arcs() {
            out[self.arc_src[i] as usize].push((self.arc_lbl[i], self.arc_dst[i]));
        }
        out
    }

    /// NFA simulation over the word's symbols.
    pub fn accepts(&self, word: &[&str]) -> bool {
        let adj = self.adjacency();
        let mut current = eps_closure_with(&adj, &self.start);
        for sym in word {
            let Some(lbl) = self.symbols.index_of(&sym.to_string()) else {
                return false;
            };
            let mut raw: Vec<u32> = Vec::new();
            for &s in &current {
                for &(x, j) in &adj[s as usize] {
                    if x == lbl {
                        raw.push(j);
                    }
                }
            }
            if raw.is_empty() {
                return false;
            }
            current = eps_closure_with(&adj, &raw);
        }
        current.iter().any(|s| self.stop.contains(s))
    }

    /// Batch-compute all non-epsilon successors of an epsilon-closed state
    /// set, grouped by label. Each bucket is epsilon-closed, sorted and
    /// deduplicated so it can be interned directly.
    pub(crate) fn successors_by_label(
        adj: &[Vec<(u32, u32)>],
        states: &[u32],
    ) -> Vec<(u32, Vec<u32>)> {
        let mut by_symbol: FxHashMap<u32, Vec<u32>> = FxHashMap::default();
        for &s in states {
            for &(x, j) in &adj[s as usize] {
                if x != EPSILON {
                    by_symbol.entry(x).or_default().push(j);
                }
            }
        }
        let mut result: Vec<(u32, Vec<u32>)> = by_symbol
            .into_iter()
            .map(|(x, raw)| (x, eps_closure_with(adj, &raw)))
            .collect();
        result.sort_unstable_by_key(|(x, _)| *x);
        result
    }
}

pub(crate) fn eps_closure_with(adj: &[Vec<(u32, u32)>], states: &[u32]) -> Vec<u32> {
    let mut visited: FxHashSet<u32> = FxHashSet::default();
    let mut worklist: VecDeque<u32> = VecDeque::new();
    for &s in states {
        if visited.insert(s) {
            worklist.push_back(s);
        }
    }
    while let Some(s) = worklist.pop_front() {
        for &(x, j) in &adj[s as usize] {
            if x == EPSILON && visited.insert(j) {
                worklist.push_back(j);
            }
        }
    }
    let mut result: Vec<u32> = visited.into_iter().collect();
    result.sort_unstable();
    result
}
