use crate::filter::{Derivations, SolveStats, Triple};
use crate::grammar::{Body, NormalGrammar};
use crate::graph::LabeledGraph;
use crate::index::StateIndex;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use std::time::Instant;
use tracing::{debug, info};

/// Worklist state over variable ids. A triple is `(start, var, end)`.
struct Worklist {
    result: FxHashSet<(u32, u32, u32)>,
    unhandled: VecDeque<(u32, u32, u32)>,
    /// node → `(var, end)` of triples starting there
    outgoing: FxHashMap<u32, Vec<(u32, u32)>>,
    /// node → `(start, var)` of triples ending there
    incoming: FxHashMap<u32, Vec<(u32, u32)>>,
}

impl Worklist {
    fn new() -> Self {
        Worklist {
            result: FxHashSet::default(),
            unhandled: VecDeque::new(),
            outgoing: FxHashMap::default(),
            incoming: FxHashMap::default(),
        }
    }

    /// Record a triple if it is new.
    fn emit(&mut self, start: u32, var: u32, end: u32) {
        if self.result.insert((start, var, end)) {
            self.unhandled.push_back((start, var, end));
            self.outgoing.entry(start).or_default().push((var, end));
            self.incoming.entry(end).or_default().push((start, var));
        }
    }
}

/// All triples derivable over `graph`, by Hellings' worklist algorithm.
///
/// Seeds `(v, A, v)` for `A → ε` and `(u, A, v)` for `A → a` on an `a`-edge,
/// then joins each popped triple with the stored triples that meet it at
/// either end through a binary rule.
pub fn hellings(grammar: &NormalGrammar, graph: &LabeledGraph) -> Derivations {
    let t0 = Instant::now();
    let vars: StateIndex<String> = grammar.variables().into_iter().collect();
    let id = |v: &String| vars.index_of(v).unwrap_or(u32::MAX);

    let mut eps_heads: Vec<u32> = Vec::new();
    let mut term_heads: FxHashMap<&str, Vec<u32>> = FxHashMap::default();
    // (left, right) → heads of `head → left right`
    let mut pair_heads: FxHashMap<(u32, u32), Vec<u32>> = FxHashMap::default();
    for rule in grammar.rules() {
        let head = id(&rule.head);
        match &rule.body {
            Body::Epsilon => eps_heads.push(head),
            Body::Terminal(t) => term_heads.entry(t.as_str()).or_default().push(head),
            Body::Pair(b, c) => pair_heads.entry((id(b), id(c))).or_default().push(head),
        }
    }

    let mut wl = Worklist::new();
    for v in graph.nodes() {
        for &a in &eps_heads {
            wl.emit(v, a, v);
        }
    }
    for e in graph.edges() {
        if let Some(heads) = term_heads.get(e.label.as_str()) {
            for &a in heads {
                wl.emit(e.src, a, e.dst);
            }
        }
    }
    debug!(seeds = wl.result.len(), "hellings seeded");

    let mut pops: u64 = 0;
    while let Some((i, b, j)) = wl.unhandled.pop_front() {
        pops += 1;

        // (h, C, i) + (i, B, j) with A → C B gives (h, A, j)
        let before: Vec<(u32, u32)> = wl.incoming.get(&i).cloned().unwrap_or_default();
        for (h, c) in before {
            if let Some(heads) = pair_heads.get(&(c, b)) {
                for &a in heads {
                    wl.emit(h, a, j);
                }
            }
        }

        // (i, B, j) + (j, D, k) with A → B D gives (i, A, k)
        let after: Vec<(u32, u32)> = wl.outgoing.get(&j).cloned().unwrap_or_default();
        for (d, k) in after {
            if let Some(heads) = pair_heads.get(&(b, d)) {
                for &a in heads {
                    wl.emit(i, a, k);
                }
            }
        }
    }

    let triples: FxHashSet<Triple> = wl
        .result
        .iter()
        .filter_map(|&(s, v, e)| vars.state(v).map(|name| Triple::new(s, name.clone(), e)))
        .collect();
    let stats = SolveStats {
        rounds: pops,
        derived: triples.len() as u64,
        elapsed_ms: t0.elapsed().as_secs_f64() * 1000.0,
    };
    info!(
        triples = stats.derived,
        pops = stats.rounds,
        elapsed_ms = stats.elapsed_ms,
        "hellings done"
    );
    Derivations { triples, stats }
}
