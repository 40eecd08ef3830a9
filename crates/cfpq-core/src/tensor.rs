use crate::automaton::MatrixAutomaton;
use crate::error::{CfpqError, Result};
use crate::filter::{Derivations, SolveStats, Triple};
use crate::graph::LabeledGraph;
use crate::intersect::intersect;
use crate::matrix::BoolMatrix;
use crate::rsm::{Rsm, RsmLabel};
use rustc_hash::FxHashSet;
use std::time::Instant;
use tracing::{debug, info};

/// Tensor-product CFPQ over a recursive state machine.
///
/// The graph automaton gains a call edge `u --B--> v` whenever the closure
/// of `rsm × graph` connects a start of box `B` at `u` with a final of box
/// `B` at `v`. Nullable boxes start with a self-loop on every node. Rounds
/// stop once the closure's entry count no longer grows.
///
/// Both automata key transitions by [`RsmLabel::key`]: graph edges are
/// terminals and derived edges are calls, so an edge labeled like a box is
/// never mistaken for a derivation of that box.
///
/// Returns one triple per derived box edge; start/final filtering happens in
/// [`crate::filter::ResultFilter`].
pub fn tensor_closure(rsm: &Rsm, graph: &LabeledGraph) -> Result<Derivations> {
    let t0 = Instant::now();
    let mut graph_fa = MatrixAutomaton::from_graph(graph, None, None)
        .map_symbols(|label| RsmLabel::term(label).key());
    let size = graph_fa.num_states();
    if size == 0 || rsm.is_empty() {
        return Ok(Derivations::default());
    }
    let limit = u32::MAX as usize;
    let n = u32::try_from(size)
        .map_err(|_| CfpqError::dimension_mismatch((size, size), (limit, limit)))?;
    let id = BoolMatrix::try_identity(size)?;
    let rsm_fa = rsm.to_matrix_automaton();
    // Indexed by box id.
    let calls: Vec<(&str, String)> = rsm
        .boxes()
        .map(|(name, _)| (name, RsmLabel::call(name).key()))
        .collect();

    for name in rsm.nullable_symbols() {
        graph_fa.matrix_mut(&RsmLabel::call(name).key()).union_with(&id)?;
    }

    let mut last_nnz: Option<u64> = None;
    let mut rounds: u64 = 0;
    loop {
        let closure = intersect(&rsm_fa, &graph_fa)?.transitive_closure()?;
        rounds += 1;
        let nnz = closure.nnz();
        debug!(round = rounds, closure_nnz = nnz, "tensor round");
        if last_nnz == Some(nnz) {
            break;
        }
        last_nnz = Some(nnz);

        for (i, j) in closure.iter() {
            let (ri, gi) = (i / n, i % n);
            let (rj, gj) = (j / n, j % n);
            if !rsm_fa.is_start(ri) || !rsm_fa.is_final(rj) {
                continue;
            }
            let (Some(src), Some(dst)) = (rsm_fa.state(ri), rsm_fa.state(rj)) else {
                continue;
            };
            if src.box_id != dst.box_id {
                continue;
            }
            if let Some((_, call)) = calls.get(src.box_id as usize) {
                graph_fa.add_transition(gi, call, gj);
            }
        }
    }

    let mut triples: FxHashSet<Triple> = FxHashSet::default();
    for (name, call) in &calls {
        if !graph_fa.has_symbol(call) {
            continue;
        }
        for (i, j) in graph_fa.matrix(call).iter() {
            if let (Some(&s), Some(&e)) = (graph_fa.state(i), graph_fa.state(j)) {
                triples.insert(Triple::new(s, *name, e));
            }
        }
    }
    let stats = SolveStats {
        rounds,
        derived: last_nnz.unwrap_or(0),
        elapsed_ms: t0.elapsed().as_secs_f64() * 1000.0,
    };
    info!(
        box_edges = triples.len(),
        rounds,
        elapsed_ms = stats.elapsed_ms,
        "tensor closure done"
    );
    Ok(Derivations { triples, stats })
}
