use crate::automaton::MatrixAutomaton;
use crate::matrix::BoolMatrix;
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::hash::Hash;
use tracing::debug;

/// Regular-constrained reachability.
///
/// For each start state `v` of `graph`, the final states `y` of `graph` such
/// that a non-empty path `v → y` spells a word accepted by `constraint`.
/// Every start state gets an entry, possibly empty. Sources are searched
/// independently on the rayon pool.
pub fn reachable_with_constraints<S, C>(
    graph: &MatrixAutomaton<S>,
    constraint: &MatrixAutomaton<C>,
) -> BTreeMap<S, BTreeSet<S>>
where
    S: Clone + Eq + Hash + Ord + Send + Sync,
    C: Clone + Eq + Hash + Send + Sync,
{
    let labels: Vec<&str> = graph
        .symbols()
        .into_iter()
        .filter(|l| constraint.has_symbol(l))
        .collect();
    let mats: Vec<(Cow<'_, BoolMatrix>, Cow<'_, BoolMatrix>)> = labels
        .iter()
        .map(|l| (constraint.matrix(l), graph.matrix(l)))
        .collect();
    debug!(labels = labels.len(), "constrained reachability");

    let search = |v: u32| -> BTreeSet<S> {
        let mut seen: FxHashSet<(u32, u32)> = FxHashSet::default();
        let mut queue: VecDeque<(u32, u32)> = VecDeque::new();
        for &c in constraint.start_indices() {
            if seen.insert((c, v)) {
                queue.push_back((c, v));
            }
        }
        let mut hits = BTreeSet::new();
        while let Some((c, g)) = queue.pop_front() {
            for (mc, mg) in &mats {
                for c2 in mc.row(c) {
                    for g2 in mg.row(g) {
                        if constraint.is_final(c2) && graph.is_final(g2) {
                            if let Some(s) = graph.state(g2) {
                                hits.insert(s.clone());
                            }
                        }
                        if seen.insert((c2, g2)) {
                            queue.push_back((c2, g2));
                        }
                    }
                }
            }
        }
        hits
    };

    let sources: Vec<u32> = graph.start_indices().iter().copied().collect();
    let found: Vec<(S, BTreeSet<S>)> = sources
        .par_iter()
        .filter_map(|&v| graph.state(v).map(|s| (s.clone(), search(v))))
        .collect();
    found.into_iter().collect()
}
