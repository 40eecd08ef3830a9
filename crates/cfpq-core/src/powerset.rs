use crate::fsa::{eps_closure_with, Fsa};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;

/// Interns sorted NFA state sets as `u32` DFA state ids.
/// After interning, the subset construction only handles cheap ids.
pub struct PowersetArena {
    map: FxHashMap<Vec<u32>, u32>,
    /// Fast path for single-element sets, common for already-deterministic
    /// regions of the input. Avoids hashing a Vec.
    single_map: FxHashMap<u32, u32>,
    pub sets: Vec<Vec<u32>>,
    pub is_final: Vec<bool>,
}

impl Default for PowersetArena {
    fn default() -> Self {
        Self::new()
    }
}

impl PowersetArena {
    pub fn new() -> Self {
        PowersetArena {
            map: FxHashMap::default(),
            single_map: FxHashMap::default(),
            sets: Vec::new(),
            is_final: Vec::new(),
        }
    }

    /// Intern a sorted set of NFA states. Returns the id and whether it is new.
    pub fn intern(&mut self, sorted_set: Vec<u32>, any_final: bool) -> (u32, bool) {
        if sorted_set.len() == 1 {
            let key = sorted_set[0];
            if let Some(&id) = self.single_map.get(&key) {
                return (id, false);
            }
            let id = self.sets.len() as u32;
            self.sets.push(sorted_set);
            self.is_final.push(any_final);
            self.single_map.insert(key, id);
            return (id, true);
        }

        if let Some(&id) = self.map.get(&sorted_set) {
            return (id, false);
        }
        let id = self.sets.len() as u32;
        self.sets.push(sorted_set.clone());
        self.is_final.push(any_final);
        self.map.insert(sorted_set, id);
        (id, true)
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

/// Subset construction. Epsilon arcs are folded into the closures, so the
/// result has a single start state and no epsilon arcs.
///
/// Only states reachable from the start closure are built. An automaton
/// without start states yields an empty DFA.
pub fn determinize(nfa: &Fsa) -> Fsa {
    let mut dfa = Fsa {
        symbols: nfa.symbols.clone(),
        ..Fsa::default()
    };
    if nfa.start.is_empty() {
        return dfa;
    }

    let adj = nfa.adjacency();
    let mut is_stop = vec![false; nfa.num_states as usize];
    for &s in &nfa.stop {
        is_stop[s as usize] = true;
    }
    let any_final = |set: &[u32]| set.iter().any(|&s| is_stop[s as usize]);

    let mut arena = PowersetArena::new();
    let init = eps_closure_with(&adj, &nfa.start);
    let init_final = any_final(&init);
    let (start_id, _) = arena.intern(init, init_final);

    let mut worklist: VecDeque<u32> = VecDeque::new();
    worklist.push_back(start_id);

    while let Some(sid) = worklist.pop_front() {
        let set = arena.sets[sid as usize].clone();
        for (x, successor) in Fsa::successors_by_label(&adj, &set) {
            let succ_final = any_final(&successor);
            let (dest_id, fresh) = arena.intern(successor, succ_final);
            dfa.add_arc(sid, x, dest_id);
            if fresh {
                worklist.push_back(dest_id);
            }
        }
    }

    dfa.num_states = arena.len() as u32;
    dfa.start = vec![start_id];
    dfa.stop = (0..arena.len() as u32)
        .filter(|&id| arena.is_final[id as usize])
        .collect();
    dfa
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern() {
        let mut arena = PowersetArena::new();

        let (id0, new0) = arena.intern(vec![1, 2, 3], false);
        let (id1, _) = arena.intern(vec![4], true);
        let (id2, new2) = arena.intern(vec![1, 2, 3], false);

        assert_eq!(id0, 0);
        assert_eq!(id1, 1);
        assert_eq!(id2, 0); // same set, same ID
        assert!(new0);
        assert!(!new2);

        assert!(!arena.is_final[id0 as usize]);
        assert!(arena.is_final[id1 as usize]);
        assert_eq!(arena.intern(vec![4], true), (1, false));
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_determinize_merges_nondeterminism() {
        // 0 -a-> 1, 0 -a-> 2, 1 -b-> 3(F), 2 -c-> 3(F), plus 0 -eps-> 4(F)
        let mut nfa = Fsa::new();
        for _ in 0..5 {
            nfa.add_state();
        }
        nfa.start.push(0);
        nfa.stop.extend([3, 4]);
        nfa.add_symbol_arc(0, "a", 1);
        nfa.add_symbol_arc(0, "a", 2);
        nfa.add_symbol_arc(1, "b", 3);
        nfa.add_symbol_arc(2, "c", 3);
        nfa.add_epsilon(0, 4);

        let dfa = determinize(&nfa);
        assert!(dfa.is_deterministic());
        // {0,4}, {1,2}, {3}
        assert_eq!(dfa.num_states, 3);
        assert!(dfa.accepts(&[]));
        assert!(dfa.accepts(&["a", "b"]));
        assert!(dfa.accepts(&["a", "c"]));
        assert!(!dfa.accepts(&["a"]));
    }

    #[test]
    fn test_determinize_without_start() {
        let mut nfa = Fsa::new();
        nfa.add_state();
        let dfa = determinize(&nfa);
        assert_eq!(dfa.num_states, 0);
        assert!(dfa.start.is_empty());
    }
}
