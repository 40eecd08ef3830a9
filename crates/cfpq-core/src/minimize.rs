use crate::fsa::{Fsa, EPSILON};
use crate::powerset::determinize;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;

/// Minimize an automaton.
///
/// Non-deterministic input is determinized first. Then trims unreachable and
/// dead states and merges equivalent states with Hopcroft's partition
/// refinement (O(kn log n)).
pub fn minimize(fsa: &Fsa) -> Fsa {
    let dfa;
    let input = if fsa.is_deterministic() {
        fsa
    } else {
        dfa = determinize(fsa);
        &dfa
    };
    let trimmed = trim(input);
    if trimmed.num_states <= 1 {
        return trimmed;
    }
    let class = hopcroft_classes(&trimmed);
    quotient(&trimmed, &class)
}

fn reach(adj: &[Vec<u32>], seeds: &[u32]) -> Vec<bool> {
    let mut seen = vec![false; adj.len()];
    let mut queue: VecDeque<u32> = VecDeque::new();
    for &s in seeds {
        if !seen[s as usize] {
            seen[s as usize] = true;
            queue.push_back(s);
        }
    }
    while let Some(s) = queue.pop_front() {
        for &d in &adj[s as usize] {
            if !seen[d as usize] {
                seen[d as usize] = true;
                queue.push_back(d);
            }
        }
    }
    seen
}

/// Keep states that are reachable from a start state and co-reachable to a
/// final state, renumbered contiguously.
fn trim(fsa: &Fsa) -> Fsa {
    let n = fsa.num_states as usize;
    let mut fwd: Vec<Vec<u32>> = vec![vec![]; n];
    let mut rev: Vec<Vec<u32>> = vec![vec![]; n];
    for i in 0..fsa.num_arcs() {
        fwd[fsa.arc_src[i] as usize].push(fsa.arc_dst[i]);
        rev[fsa.arc_dst[i] as usize].push(fsa.arc_src[i]);
    }
    let live_fwd = reach(&fwd, &fsa.start);
    let live_bwd = reach(&rev, &fsa.stop);

    let mut renumber = vec![u32::MAX; n];
    let mut next: u32 = 0;
    for q in 0..n {
        if live_fwd[q] && live_bwd[q] {
            renumber[q] = next;
            next += 1;
        }
    }

    let keep = |q: &u32| renumber[*q as usize] != u32::MAX;
    let mut out = Fsa {
        num_states: next,
        symbols: fsa.symbols.clone(),
        ..Fsa::default()
    };
    out.start = fsa.start.iter().filter(|&&q| keep(&q)).map(|&q| renumber[q as usize]).collect();
    out.stop = fsa.stop.iter().filter(|&&q| keep(&q)).map(|&q| renumber[q as usize]).collect();
    for i in 0..fsa.num_arcs() {
        let (s, d) = (fsa.arc_src[i], fsa.arc_dst[i]);
        if keep(&s) && keep(&d) {
            out.add_arc(renumber[s as usize], fsa.arc_lbl[i], renumber[d as usize]);
        }
    }
    out
}

/// Blocks of the current partition with an O(1) state → block lookup.
struct Partition {
    blocks: Vec<Vec<u32>>,
    block_of: Vec<u32>,
}

impl Partition {
    fn new(n: usize, finals: &FxHashSet<u32>) -> Self {
        let (fin, rest): (Vec<u32>, Vec<u32>) = (0..n as u32).partition(|q| finals.contains(q));
        let mut blocks = Vec::new();
        let mut block_of = vec![0u32; n];
        for block in [fin, rest] {
            if block.is_empty() {
                continue;
            }
            let id = blocks.len() as u32;
            for &q in &block {
                block_of[q as usize] = id;
            }
            blocks.push(block);
        }
        Partition { blocks, block_of }
    }

    /// Move `marked` (a proper, non-empty subset of `block`) out into a new
    /// block. Returns the new block id.
    fn split(&mut self, block: u32, marked: &FxHashSet<u32>) -> u32 {
        let (moved, stay): (Vec<u32>, Vec<u32>) = self.blocks[block as usize]
            .iter()
            .partition(|q| marked.contains(*q));
        let new_id = self.blocks.len() as u32;
        for &q in &moved {
            self.block_of[q as usize] = new_id;
        }
        self.blocks[block as usize] = stay;
        self.blocks.push(moved);
        new_id
    }
}

/// Hopcroft refinement. Returns the equivalence class of each state, with
/// classes numbered in order of their smallest member.
fn hopcroft_classes(dfa: &Fsa) -> Vec<u32> {
    let n = dfa.num_states as usize;

    let mut labels: Vec<u32> = dfa.arc_lbl.iter().copied().filter(|&x| x != EPSILON).collect();
    labels.sort_unstable();
    labels.dedup();

    // pre[(dest, label)] = predecessors of dest on label
    let mut pre: FxHashMap<(u32, u32), Vec<u32>> = FxHashMap::default();
    for i in 0..dfa.num_arcs() {
        pre.entry((dfa.arc_dst[i], dfa.arc_lbl[i]))
            .or_default()
            .push(dfa.arc_src[i]);
    }

    let finals: FxHashSet<u32> = dfa.stop.iter().copied().collect();
    let mut part = Partition::new(n, &finals);

    // Both initial blocks go on the worklist; the automaton may be partial.
    let mut in_worklist: Vec<bool> = vec![true; part.blocks.len()];
    let mut worklist: Vec<u32> = (0..part.blocks.len() as u32).collect();

    while let Some(splitter) = worklist.pop() {
        in_worklist[splitter as usize] = false;
        let members = part.blocks[splitter as usize].clone();

        for &x in &labels {
            // Pre-image of the splitter on x, grouped by current block.
            let mut touched: FxHashMap<u32, FxHashSet<u32>> = FxHashMap::default();
            for &q in &members {
                if let Some(preds) = pre.get(&(q, x)) {
                    for &p in preds {
                        touched.entry(part.block_of[p as usize]).or_default().insert(p);
                    }
                }
            }

            let mut touched: Vec<(u32, FxHashSet<u32>)> = touched.into_iter().collect();
            touched.sort_unstable_by_key(|(b, _)| *b);
            for (block, marked) in touched {
                let size = part.blocks[block as usize].len();
                if marked.len() == size {
                    continue;
                }
                let new_id = part.split(block, &marked);
                in_worklist.push(false);

                if in_worklist[block as usize] {
                    in_worklist[new_id as usize] = true;
                    worklist.push(new_id);
                } else {
                    // Only the smaller half needs to act as a splitter.
                    let smaller = if part.blocks[block as usize].len() <= part.blocks[new_id as usize].len() {
                        block
                    } else {
                        new_id
                    };
                    in_worklist[smaller as usize] = true;
                    worklist.push(smaller);
                }
            }
        }
    }

    let mut class_of_block = vec![u32::MAX; part.blocks.len()];
    let mut next = 0u32;
    (0..n)
        .map(|q| {
            let b = part.block_of[q] as usize;
            if class_of_block[b] == u32::MAX {
                class_of_block[b] = next;
                next += 1;
            }
            class_of_block[b]
        })
        .collect()
}

fn quotient(fsa: &Fsa, class: &[u32]) -> Fsa {
    let num_classes = class.iter().max().map_or(0, |&c| c + 1);
    let mut out = Fsa {
        num_states: num_classes,
        symbols: fsa.symbols.clone(),
        ..Fsa::default()
    };

    let remap = |states: &[u32]| {
        let mut v: Vec<u32> = states.iter().map(|&q| class[q as usize]).collect();
        v.sort_unstable();
        v.dedup();
        v
    };
    out.start = remap(&fsa.start);
    out.stop = remap(&fsa.stop);

    let mut seen: FxHashSet<(u32, u32, u32)> = FxHashSet::default();
    for i in 0..fsa.num_arcs() {
        let arc = (
            class[fsa.arc_src[i] as usize],
            fsa.arc_lbl[i],
            class[fsa.arc_dst[i] as usize],
        );
        if seen.insert(arc) {
            out.add_arc(arc.0, arc.1, arc.2);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dfa(num_states: u32, start: u32, stop: &[u32], arcs: &[(u32, &str, u32)]) -> Fsa {
        let mut fsa = Fsa::new();
        fsa.num_states = num_states;
        fsa.start = vec![start];
        fsa.stop = stop.to_vec();
        for &(s, x, d) in arcs {
            fsa.add_symbol_arc(s, x, d);
        }
        fsa
    }

    #[test]
    fn test_minimize_empty() {
        let m = minimize(&Fsa::new());
        assert_eq!(m.num_states, 0);
        assert!(m.start.is_empty());
        assert!(m.stop.is_empty());
    }

    #[test]
    fn test_minimize_single_state() {
        let m = minimize(&dfa(1, 0, &[0], &[(0, "a", 0)]));
        assert_eq!(m.num_states, 1);
        assert_eq!(m.start, vec![0]);
        assert_eq!(m.stop, vec![0]);
        assert_eq!(m.num_arcs(), 1);
    }

    #[test]
    fn test_minimize_mergeable_final_states() {
        // 0 -a-> 1(F), 0 -b-> 2(F): 1 and 2 are equivalent.
        let m = minimize(&dfa(3, 0, &[1, 2], &[(0, "a", 1), (0, "b", 2)]));
        assert_eq!(m.num_states, 2);
        assert_eq!(m.num_arcs(), 2);
        assert!(m.accepts(&["a"]));
        assert!(m.accepts(&["b"]));
    }

    #[test]
    fn test_minimize_removes_unreachable_and_dead() {
        // 2 is unreachable, 3 is dead.
        let m = minimize(&dfa(
            4,
            0,
            &[1],
            &[(0, "a", 1), (2, "a", 1), (0, "b", 3)],
        ));
        assert_eq!(m.num_states, 2);
        assert_eq!(m.num_arcs(), 1);
    }

    #[test]
    fn test_minimize_chain_merge() {
        // 0 -a-> 1 -b-> 2(F), 0 -c-> 3 -b-> 4(F): {1,3} and {2,4} merge.
        let m = minimize(&dfa(
            5,
            0,
            &[2, 4],
            &[(0, "a", 1), (1, "b", 2), (0, "c", 3), (3, "b", 4)],
        ));
        assert_eq!(m.num_states, 3);
        assert!(m.accepts(&["c", "b"]));
        assert!(!m.accepts(&["b"]));
    }

    #[test]
    fn test_minimize_partial_dfa_keeps_distinct_states() {
        // (ab)*: 0(F) -a-> 1 -b-> 0. Partial, already minimal.
        let m = minimize(&dfa(2, 0, &[0], &[(0, "a", 1), (1, "b", 0)]));
        assert_eq!(m.num_states, 2);
        assert!(m.accepts(&["a", "b", "a", "b"]));
        assert!(!m.accepts(&["a", "a"]));
    }

    #[test]
    fn test_minimize_determinizes_first() {
        // 0 -a-> 1(F), 0 -a-> 2(F)
        let mut nfa = dfa(3, 0, &[1, 2], &[(0, "a", 1), (0, "a", 2)]);
        nfa.add_epsilon(0, 0);
        let m = minimize(&nfa);
        assert!(m.is_deterministic());
        assert_eq!(m.num_states, 2);
    }

    #[test]
    fn test_minimize_preserves_language() {
        // {a, b}* with two equivalent accepting states.
        let m = minimize(&dfa(
            2,
            0,
            &[0, 1],
            &[(0, "a", 1), (0, "b", 1), (1, "a", 0), (1, "b", 0)],
        ));
        assert_eq!(m.num_states, 1);
        assert_eq!(m.num_arcs(), 2);
        assert!(m.accepts(&["b", "a", "b"]));
    }
}
