use crate::automaton::MatrixAutomaton;
use crate::error::{CfpqError, Result};
use crate::index::StateIndex;
use crate::matrix::BoolMatrix;
use std::hash::Hash;
use tracing::trace;

/// Product automaton of `a` and `b`.
///
/// The pair `(state_a[i], state_b[j])` gets index `i * |b| + j`. Only symbols
/// that both operands know survive; their matrices are Kronecker products.
pub fn intersect<A, B>(a: &MatrixAutomaton<A>, b: &MatrixAutomaton<B>) -> Result<MatrixAutomaton<(A, B)>>
where
    A: Clone + Eq + Hash,
    B: Clone + Eq + Hash,
{
    let (na, nb) = (a.num_states(), b.num_states());
    let fits = na
        .checked_mul(nb)
        .map_or(false, |n| u32::try_from(n).is_ok());
    if !fits {
        return Err(CfpqError::dimension_mismatch((na, na), (nb, nb)));
    }
    let states = StateIndex::try_from_states(
        a.states()
            .states()
            .iter()
            .flat_map(|sa| b.states().states().iter().map(move |sb| (sa.clone(), sb.clone()))),
    )?;
    let mut out = MatrixAutomaton::new(states);

    for (symbol, ma) in a.matrices() {
        if !b.has_symbol(symbol) {
            continue;
        }
        let k = ma.kron(&b.matrix(symbol))?;
        out.matrix_mut(symbol).union_with(&k)?;
    }

    let pair = |i: u32, j: u32| i * nb as u32 + j;
    for &i in a.start_indices() {
        for &j in b.start_indices() {
            out.mark_start(pair(i, j));
        }
    }
    for &i in a.final_indices() {
        for &j in b.final_indices() {
            out.mark_final(pair(i, j));
        }
    }
    trace!(
        states = out.num_states(),
        transitions = out.nnz(),
        "intersected automata"
    );
    Ok(out)
}

/// Alias of [`intersect`].
pub fn intersect_automata<A, B>(
    a: &MatrixAutomaton<A>,
    b: &MatrixAutomaton<B>,
) -> Result<MatrixAutomaton<(A, B)>>
where
    A: Clone + Eq + Hash,
    B: Clone + Eq + Hash,
{
    intersect(a, b)
}

/// Reflexive-transitive closure `I ∨ M ∨ M² ∨ …` of a square matrix.
///
/// Squares the running result until its entry count stops growing, so the
/// number of products is logarithmic in the longest shortest path.
pub fn transitive_closure(m: &BoolMatrix) -> Result<BoolMatrix> {
    if !m.is_square() {
        return Err(CfpqError::dimension_mismatch(m.shape(), m.shape()));
    }
    let (n, _) = m.shape();
    let mut closure = BoolMatrix::try_identity(n)?;
    closure.union_with(m)?;

    let mut rounds = 0usize;
    loop {
        let squared = closure.multiply(&closure)?;
        rounds += 1;
        if closure.union_with(&squared)? == 0 {
            break;
        }
    }
    trace!(n, rounds, nnz = closure.nnz(), "transitive closure");
    Ok(closure)
}
