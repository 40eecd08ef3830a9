use crate::error::Result;
use crate::fsa::{Fsa, EPSILON};
use crate::graph::LabeledGraph;
use crate::index::StateIndex;
use crate::intersect::transitive_closure;
use crate::matrix::BoolMatrix;
use crate::powerset::determinize;
use crate::regex::regex_to_min_dfa;
use roaring::RoaringBitmap;
use rustc_hash::{FxHashMap, FxHashSet};
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::hash::Hash;

/// Finite automaton decomposed into one `n × n` boolean matrix per symbol.
///
/// `states` fixes the state ↔ index bijection for the lifetime of the
/// automaton; matrices, start and final sets are all expressed in indices.
/// The only mutation after construction is adding transitions, which never
/// touches the bijection.
#[derive(Debug, Clone)]
pub struct MatrixAutomaton<S> {
    states: StateIndex<S>,
    matrices: FxHashMap<String, BoolMatrix>,
    start: BTreeSet<u32>,
    finals: BTreeSet<u32>,
}

impl<S: Clone + Eq + Hash> MatrixAutomaton<S> {
    /// Automaton over `states` with no transitions, start or final states.
    pub fn new(states: StateIndex<S>) -> Self {
        MatrixAutomaton {
            states,
            matrices: FxHashMap::default(),
            start: BTreeSet::new(),
            finals: BTreeSet::new(),
        }
    }

    #[inline]
    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    pub fn states(&self) -> &StateIndex<S> {
        &self.states
    }

    pub fn state(&self, index: u32) -> Option<&S> {
        self.states.state(index)
    }

    pub fn index_of(&self, state: &S) -> Option<u32> {
        self.states.index_of(state)
    }

    pub fn start_indices(&self) -> &BTreeSet<u32> {
        &self.start
    }

    pub fn final_indices(&self) -> &BTreeSet<u32> {
        &self.finals
    }

    #[inline]
    pub fn is_start(&self, index: u32) -> bool {
        self.start.contains(&index)
    }

    #[inline]
    pub fn is_final(&self, index: u32) -> bool {
        self.finals.contains(&index)
    }

    pub fn mark_start(&mut self, index: u32) {
        self.start.insert(index);
    }

    pub fn mark_final(&mut self, index: u32) {
        self.finals.insert(index);
    }

    /// Symbols that have a matrix, sorted.
    pub fn symbols(&self) -> Vec<&str> {
        let mut v: Vec<&str> = self.matrices.keys().map(String::as_str).collect();
        v.sort_unstable();
        v
    }

    pub fn has_symbol(&self, symbol: &str) -> bool {
        self.matrices.contains_key(symbol)
    }

    /// Transition matrix for `symbol`; all-false if the symbol is unseen.
    pub fn matrix(&self, symbol: &str) -> Cow<'_, BoolMatrix> {
        match self.matrices.get(symbol) {
            Some(m) => Cow::Borrowed(m),
            None => Cow::Owned(BoolMatrix::square(self.num_states())),
        }
    }

    /// Mutable matrix for `symbol`, created empty on first use.
    pub fn matrix_mut(&mut self, symbol: &str) -> &mut BoolMatrix {
        let n = self.num_states();
        self.matrices
            .entry(symbol.to_string())
            .or_insert_with(|| BoolMatrix::square(n))
    }

    pub(crate) fn matrices(&self) -> impl Iterator<Item = (&str, &BoolMatrix)> + '_ {
        self.matrices.iter().map(|(k, m)| (k.as_str(), m))
    }

    /// Rename every symbol through `rename`, which must be injective.
    pub(crate) fn map_symbols(mut self, rename: impl Fn(&str) -> String) -> Self {
        self.matrices = self
            .matrices
            .into_iter()
            .map(|(k, m)| (rename(&k), m))
            .collect();
        self
    }

    /// Add `i --symbol--> j`. Returns true if the transition is new.
    pub fn add_transition(&mut self, i: u32, symbol: &str, j: u32) -> bool {
        self.matrix_mut(symbol).set(i, j)
    }

    /// Total number of transitions over all symbols.
    pub fn nnz(&self) -> u64 {
        self.matrices.values().map(BoolMatrix::nnz).sum()
    }

    /// OR of all symbol matrices.
    pub fn adjacency(&self) -> Result<BoolMatrix> {
        let mut adj = BoolMatrix::try_square(self.num_states())?;
        for m in self.matrices.values() {
            adj.union_with(m)?;
        }
        Ok(adj)
    }

    /// Reflexive-transitive closure of the adjacency relation.
    pub fn transitive_closure(&self) -> Result<BoolMatrix> {
        transitive_closure(&self.adjacency()?)
    }

    /// Does the automaton accept `word`?
    pub fn accepts(&self, word: &[&str]) -> bool {
        let mut current: RoaringBitmap = self.start.iter().copied().collect();
        for sym in word {
            let Some(m) = self.matrices.get(*sym) else {
                return false;
            };
            let mut next = RoaringBitmap::new();
            for i in &current {
                next |= m.row(i);
            }
            if next.is_empty() {
                return false;
            }
            current = next;
        }
        current.iter().any(|i| self.finals.contains(&i))
    }

    /// True if no final state is reachable from a start state.
    pub fn is_empty(&self) -> bool {
        let mut seen: RoaringBitmap = self.start.iter().copied().collect();
        let mut frontier: Vec<u32> = seen.iter().collect();
        while let Some(i) = frontier.pop() {
            if self.finals.contains(&i) {
                return false;
            }
            for m in self.matrices.values() {
                for j in m.row(i) {
                    if seen.insert(j) {
                        frontier.push(j);
                    }
                }
            }
        }
        true
    }
}

impl MatrixAutomaton<u32> {
    /// Lift an `Fsa` into matrix form. States keep their `Fsa` numbering.
    /// Epsilon arcs are removed by subset construction first.
    pub fn from_fsa(fsa: &Fsa) -> Self {
        let dfa;
        let fsa = if fsa.has_epsilon() {
            dfa = determinize(fsa);
            &dfa
        } else {
            fsa
        };

        let states: StateIndex<u32> = (0..fsa.num_states).collect();
        let mut fa = MatrixAutomaton::new(states);
        for i in 0..fsa.num_arcs() {
            let lbl = fsa.arc_lbl[i];
            if lbl == EPSILON {
                continue;
            }
            if let Some(sym) = fsa.symbol(lbl) {
                let sym = sym.to_string();
                fa.add_transition(fsa.arc_src[i], &sym, fsa.arc_dst[i]);
            }
        }
        fa.start.extend(fsa.start.iter().copied());
        fa.finals.extend(fsa.stop.iter().copied());
        fa
    }

    /// Graph as an automaton whose states are the graph's nodes.
    ///
    /// `None` or an empty set makes every node a start (final) state. Filter
    /// nodes that are not in the graph are ignored.
    pub fn from_graph(
        graph: &LabeledGraph,
        start_nodes: Option<&FxHashSet<u32>>,
        final_nodes: Option<&FxHashSet<u32>>,
    ) -> Self {
        let states: StateIndex<u32> = graph.nodes().collect();
        let mut fa = MatrixAutomaton::new(states);
        for e in graph.edges() {
            if let (Some(i), Some(j)) = (fa.index_of(&e.src), fa.index_of(&e.dst)) {
                fa.add_transition(i, &e.label, j);
            }
        }

        let pick = |filter: Option<&FxHashSet<u32>>| -> BTreeSet<u32> {
            match filter.filter(|f| !f.is_empty()) {
                None => (0..fa.num_states() as u32).collect(),
                Some(f) => f.iter().filter_map(|v| fa.index_of(v)).collect(),
            }
        };
        let start = pick(start_nodes);
        let finals = pick(final_nodes);
        fa.start = start;
        fa.finals = finals;
        fa
    }
}

/// Minimal DFA of `expr` in matrix form.
pub fn build_automaton_from_regex(expr: &str) -> Result<MatrixAutomaton<u32>> {
    Ok(MatrixAutomaton::from_fsa(&regex_to_min_dfa(expr)?))
}

/// Graph automaton; see [`MatrixAutomaton::from_graph`].
pub fn build_automaton_from_graph(
    graph: &LabeledGraph,
    start_nodes: Option<&FxHashSet<u32>>,
    final_nodes: Option<&FxHashSet<u32>>,
) -> MatrixAutomaton<u32> {
    MatrixAutomaton::from_graph(graph, start_nodes, final_nodes)
}
