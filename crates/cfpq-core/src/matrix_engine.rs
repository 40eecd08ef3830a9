use crate::error::Result;
use crate::filter::{Derivations, SolveStats, Triple};
use crate::grammar::{Body, NormalGrammar};
use crate::graph::LabeledGraph;
use crate::index::StateIndex;
use crate::matrix::BoolMatrix;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use std::time::Instant;
use tracing::{debug, info};

/// Semi-naive boolean-matrix closure.
///
/// Keeps one `n × n` matrix per variable. Terminal rules seed edges and
/// ε-rules seed the identity. Each round evaluates every rule `A → B C` as
/// `ΔB·C ∨ B·ΔC` against the snapshot left by the previous round, so only
/// products that involve a newly derived entry are recomputed. Candidates
/// are merged by OR after all rules of the round have run; the round ends
/// when no matrix gained an entry.
///
/// With `parallel` the rules of one round are evaluated on the rayon pool.
pub fn matrix_closure(
    grammar: &NormalGrammar,
    graph: &LabeledGraph,
    parallel: bool,
) -> Result<Derivations> {
    let t0 = Instant::now();
    let nodes: StateIndex<u32> = StateIndex::try_from_states(graph.nodes())?;
    let n = nodes.len();
    let vars: StateIndex<String> = StateIndex::try_from_states(grammar.variables())?;
    let var = |v: &String| vars.index_of(v).map(|i| i as usize).unwrap_or(usize::MAX);

    let mut by_label: FxHashMap<&str, Vec<usize>> = FxHashMap::default();
    let mut eps: Vec<usize> = Vec::new();
    let mut pairs: Vec<(usize, usize, usize)> = Vec::new();
    for rule in grammar.rules() {
        let a = var(&rule.head);
        match &rule.body {
            Body::Epsilon => eps.push(a),
            Body::Terminal(t) => by_label.entry(t.as_str()).or_default().push(a),
            Body::Pair(b, c) => pairs.push((a, var(b), var(c))),
        }
    }

    let empty = BoolMatrix::try_square(n)?;
    let mut mats: Vec<BoolMatrix> = vec![empty.clone(); vars.len()];
    for e in graph.edges() {
        let Some(heads) = by_label.get(e.label.as_str()) else {
            continue;
        };
        if let (Some(i), Some(j)) = (nodes.index_of(&e.src), nodes.index_of(&e.dst)) {
            for &a in heads {
                mats[a].set(i, j);
            }
        }
    }
    let id = BoolMatrix::try_identity(n)?;
    for &a in &eps {
        mats[a].union_with(&id)?;
    }

    // Everything seeded counts as new for the first round.
    let mut delta: Vec<BoolMatrix> = mats.clone();
    let mut rounds: u64 = 0;

    loop {
        let step = |&(a, b, c): &(usize, usize, usize)| -> Result<Option<(usize, BoolMatrix)>> {
            let (db, dc) = (&delta[b], &delta[c]);
            if db.is_empty() && dc.is_empty() {
                return Ok(None);
            }
            let mut cand = db.multiply(&mats[c])?;
            cand.union_with(&mats[b].multiply(dc)?)?;
            Ok(Some((a, cand)))
        };
        let candidates: Vec<Option<(usize, BoolMatrix)>> = if parallel {
            pairs.par_iter().map(step).collect::<Result<_>>()?
        } else {
            pairs.iter().map(step).collect::<Result<_>>()?
        };
        rounds += 1;

        // Barrier: merge the round's candidates into the snapshot.
        let mut next: Vec<BoolMatrix> = vec![empty.clone(); vars.len()];
        let mut added: u64 = 0;
        for (a, cand) in candidates.into_iter().flatten() {
            let fresh = cand.difference(&mats[a])?;
            added += mats[a].union_with(&fresh)?;
            next[a].union_with(&fresh)?;
        }
        debug!(round = rounds, added, "matrix round");
        if added == 0 {
            break;
        }
        delta = next;
    }

    let mut triples: FxHashSet<Triple> = FxHashSet::default();
    for (v, name) in vars.iter() {
        for (i, j) in mats[v as usize].iter() {
            if let (Some(&s), Some(&e)) = (nodes.state(i), nodes.state(j)) {
                triples.insert(Triple::new(s, name.clone(), e));
            }
        }
    }
    let stats = SolveStats {
        rounds,
        derived: mats.iter().map(BoolMatrix::nnz).sum(),
        elapsed_ms: t0.elapsed().as_secs_f64() * 1000.0,
    };
    info!(
        entries = stats.derived,
        rounds,
        elapsed_ms = stats.elapsed_ms,
        "matrix closure done"
    );
    Ok(Derivations { triples, stats })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::filter;
    use crate::grammar::NormalRule;
    use crate::hellings::hellings;

    fn rule(head: &str, body: Body) -> NormalRule {
        NormalRule {
            head: head.into(),
            body,
        }
    }

    fn dyck() -> NormalGrammar {
        // S -> S S | L R | L X | $ ; X -> S R ; L -> ( ; R -> )
        NormalGrammar::new(
            "S",
            vec![
                rule("S", Body::Pair("S".into(), "S".into())),
                rule("S", Body::Pair("L".into(), "R".into())),
                rule("S", Body::Pair("L".into(), "X".into())),
                rule("S", Body::Epsilon),
                rule("X", Body::Pair("S".into(), "R".into())),
                rule("L", Body::Terminal("(".into())),
                rule("R", Body::Terminal(")".into())),
            ],
        )
    }

    fn graph() -> LabeledGraph {
        LabeledGraph::from_edges([
            (0, "(", 1),
            (1, "(", 2),
            (2, ")", 3),
            (3, ")", 4),
            (4, "(", 0),
            (2, "(", 2),
            (3, ")", 1),
        ])
    }

    #[test]
    fn test_agrees_with_hellings() {
        let g = graph();
        let h = hellings(&dyck(), &g);
        let m = matrix_closure(&dyck(), &g, true).unwrap();
        assert_eq!(h.triples, m.triples);
        assert_eq!(
            filter(&h.triples, "S", None, None),
            filter(&m.triples, "S", None, None)
        );
    }

    #[test]
    fn test_sequential_matches_parallel() {
        let g = graph();
        let par = matrix_closure(&dyck(), &g, true).unwrap();
        let seq = matrix_closure(&dyck(), &g, false).unwrap();
        assert_eq!(par.triples, seq.triples);
        assert_eq!(par.stats.rounds, seq.stats.rounds);
    }

    #[test]
    fn test_chain_needs_several_rounds() {
        // S -> S A | A ... written as S -> S A ; S -> a ; A -> a on a long a-path.
        let grammar = NormalGrammar::new(
            "S",
            vec![
                rule("S", Body::Pair("S".into(), "A".into())),
                rule("S", Body::Terminal("a".into())),
                rule("A", Body::Terminal("a".into())),
            ],
        );
        let g = LabeledGraph::from_edges((0..5).map(|i| (i, "a", i + 1)));
        let d = matrix_closure(&grammar, &g, true).unwrap();
        let pairs = filter(&d.triples, "S", None, None);
        // every i < j on the path
        assert_eq!(pairs.len(), 15);
        assert!(d.stats.rounds >= 4);
    }

    #[test]
    fn test_empty_graph() {
        let d = matrix_closure(&dyck(), &LabeledGraph::new(), true).unwrap();
        assert!(d.triples.is_empty());
        assert_eq!(d.stats.derived, 0);
    }
}
