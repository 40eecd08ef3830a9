//! Context-free path querying over edge-labeled graphs.
//!
//! Three engines answer the same question, which node pairs are joined by
//! a path whose word belongs to a context-free language:
//! [`hellings`](hellings::hellings) propagates triples through a worklist,
//! [`matrix_closure`](matrix_engine::matrix_closure) runs a semi-naive
//! boolean matrix fixpoint, and [`tensor_closure`](tensor::tensor_closure)
//! intersects a recursive state machine with the graph via Kronecker
//! products. [`cfpq`] picks one according to a [`CfpqConfig`].

pub mod automaton;
pub mod cfpq;
pub mod config;
pub mod error;
pub mod filter;
pub mod fsa;
pub mod grammar;
pub mod graph;
pub mod hellings;
pub mod index;
pub mod intersect;
pub mod matrix;
pub mod matrix_engine;
pub mod minimize;
pub mod normalize;
pub mod powerset;
pub mod reachability;
pub mod regex;
pub mod rsm;
pub mod tensor;
#[cfg(feature = "python")]
pub mod py;

pub use automaton::{build_automaton_from_graph, build_automaton_from_regex, MatrixAutomaton};
pub use cfpq::{cfpq, cfpq_with_stats, Query, QueryResult, Solver};
pub use config::{Algorithm, CfpqConfig};
pub use error::{CfpqError, Result};
pub use filter::{filter, Derivations, ResultFilter, SelfPairs, SolveStats, Triple};
pub use grammar::{Body, Grammar, GrammarSymbol, NormalGrammar, NormalRule, Production};
pub use graph::{labeled_two_cycles, GraphInfo, LabeledGraph};
pub use intersect::{intersect, intersect_automata, transitive_closure};
pub use matrix::BoolMatrix;
pub use normalize::{normalize, normalize_grammar};
pub use reachability::reachable_with_constraints;
pub use rsm::{Rsm, RsmLabel, RsmState};

#[cfg(feature = "python")]
use pyo3::prelude::*;

#[cfg(feature = "python")]
#[pymodule]
fn cfpq_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<py::RustGraph>()?;
    m.add_class::<py::RustGrammar>()?;
    m.add_class::<py::RustRsm>()?;
    m.add_class::<py::RustSolveStats>()?;
    m.add_class::<py::CfpqResult>()?;
    m.add_function(wrap_pyfunction!(py::cfpq, m)?)?;
    m.add_function(wrap_pyfunction!(py::regex_accepts, m)?)?;
    m.add_function(wrap_pyfunction!(py::reachable_with_constraints, m)?)?;
    Ok(())
}
