use crate::automaton::{build_automaton_from_regex, MatrixAutomaton};
use crate::cfpq::{cfpq_with_stats, Query};
use crate::config::{Algorithm, CfpqConfig};
use crate::error::CfpqError;
use crate::filter::{SelfPairs, SolveStats};
use crate::grammar::{Grammar, GrammarSymbol};
use crate::graph::LabeledGraph;
use crate::reachability;
use crate::regex::regex_to_min_dfa;
use crate::rsm::Rsm;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use rustc_hash::FxHashSet;
use std::collections::BTreeMap;

impl From<CfpqError> for PyErr {
    fn from(e: CfpqError) -> PyErr {
        PyValueError::new_err(e.to_string())
    }
}

fn node_set(nodes: Option<Vec<u32>>) -> Option<FxHashSet<u32>> {
    nodes.map(|v| v.into_iter().collect())
}

/// Python-visible labeled graph.
#[pyclass]
pub struct RustGraph {
    pub(crate) inner: LabeledGraph,
}

#[pymethods]
impl RustGraph {
    #[new]
    #[pyo3(signature = (edges=Vec::new()))]
    fn new(edges: Vec<(u32, String, u32)>) -> Self {
        let mut inner = LabeledGraph::new();
        for (src, label, dst) in &edges {
            inner.add_edge(*src, label, *dst);
        }
        RustGraph { inner }
    }

    /// Two cycles sharing node 0.
    #[staticmethod]
    fn two_cycles(n: u32, m: u32, labels: (String, String)) -> Self {
        RustGraph {
            inner: crate::graph::labeled_two_cycles(n, m, (labels.0.as_str(), labels.1.as_str())),
        }
    }

    fn add_node(&mut self, node: u32) {
        self.inner.add_node(node);
    }

    fn add_edge(&mut self, src: u32, label: &str, dst: u32) {
        self.inner.add_edge(src, label, dst);
    }

    fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    fn labels(&self) -> Vec<String> {
        self.inner.labels().into_iter().collect()
    }
}

/// Python-visible grammar. Body symbols are `(name, is_variable)` pairs; an
/// empty body is the ε-production.
#[pyclass]
pub struct RustGrammar {
    pub(crate) inner: Grammar,
}

#[pymethods]
impl RustGrammar {
    #[new]
    fn new(start: String) -> Self {
        RustGrammar {
            inner: Grammar::new(start),
        }
    }

    fn add_production(&mut self, head: String, body: Vec<(String, bool)>) -> bool {
        let body = body
            .into_iter()
            .map(|(name, is_var)| {
                if is_var {
                    GrammarSymbol::Variable(name)
                } else {
                    GrammarSymbol::Terminal(name)
                }
            })
            .collect();
        self.inner.add_production(head, body)
    }

    fn contains(&self, word: Vec<String>) -> bool {
        let word: Vec<&str> = word.iter().map(String::as_str).collect();
        self.inner.contains(&word)
    }

    fn __repr__(&self) -> String {
        let rules: Vec<String> = self.inner.productions().iter().map(|p| p.to_string()).collect();
        format!("Grammar(start={}, [{}])", self.inner.start(), rules.join("; "))
    }
}

/// Python-visible recursive state machine.
#[pyclass]
pub struct RustRsm {
    pub(crate) inner: Rsm,
}

#[pymethods]
impl RustRsm {
    #[staticmethod]
    fn from_regex_boxes(start: &str, boxes: Vec<(String, String)>) -> PyResult<Self> {
        let inner = Rsm::from_regex_boxes(start, boxes.iter().map(|(n, p)| (n.as_str(), p.as_str())))?;
        Ok(RustRsm { inner })
    }

    #[staticmethod]
    fn from_grammar(grammar: &RustGrammar) -> Self {
        RustRsm {
            inner: Rsm::from_grammar(&grammar.inner),
        }
    }

    fn nullable_symbols(&self) -> Vec<String> {
        self.inner.nullable_symbols().into_iter().collect()
    }
}

/// Python-visible solve statistics.
#[pyclass]
pub struct RustSolveStats {
    #[pyo3(get)]
    pub rounds: u64,
    #[pyo3(get)]
    pub derived: u64,
    #[pyo3(get)]
    pub elapsed_ms: f64,
}

#[pymethods]
impl RustSolveStats {
    fn __repr__(&self) -> String {
        format!(
            "SolveStats(rounds={}, derived={}, elapsed={:.1}ms)",
            self.rounds, self.derived, self.elapsed_ms
        )
    }
}

impl From<SolveStats> for RustSolveStats {
    fn from(s: SolveStats) -> Self {
        RustSolveStats {
            rounds: s.rounds,
            derived: s.derived,
            elapsed_ms: s.elapsed_ms,
        }
    }
}

#[pyclass]
pub struct CfpqResult {
    #[pyo3(get)]
    pairs: Vec<(u32, u32)>,
    #[pyo3(get)]
    stats: Py<RustSolveStats>,
}

/// Answer a CFPQ over `graph` for a grammar or an RSM (exactly one).
#[pyfunction]
#[pyo3(signature = (graph, grammar=None, rsm=None, start_nodes=None, final_nodes=None, algorithm="hellings", exclude_self_pairs=false, parallel=true))]
#[allow(clippy::too_many_arguments)]
pub fn cfpq(
    py: Python<'_>,
    graph: &RustGraph,
    grammar: Option<&RustGrammar>,
    rsm: Option<&RustRsm>,
    start_nodes: Option<Vec<u32>>,
    final_nodes: Option<Vec<u32>>,
    algorithm: &str,
    exclude_self_pairs: bool,
    parallel: bool,
) -> PyResult<CfpqResult> {
    let query = match (grammar, rsm) {
        (Some(g), None) => Query::Grammar(&g.inner),
        (None, Some(r)) => Query::Rsm(&r.inner),
        _ => return Err(PyValueError::new_err("pass exactly one of grammar or rsm")),
    };
    let config = CfpqConfig::new(algorithm.parse::<Algorithm>()?)
        .with_self_pairs(if exclude_self_pairs {
            SelfPairs::Exclude
        } else {
            SelfPairs::Keep
        })
        .with_parallel(parallel);
    let starts = node_set(start_nodes);
    let finals = node_set(final_nodes);

    let result = py.allow_threads(|| {
        cfpq_with_stats(query, &graph.inner, starts.as_ref(), finals.as_ref(), &config)
    })?;
    Ok(CfpqResult {
        pairs: result.pairs.into_iter().collect(),
        stats: Py::new(py, RustSolveStats::from(result.stats))?,
    })
}

/// Does the minimal DFA of `pattern` accept `word`?
#[pyfunction]
pub fn regex_accepts(pattern: &str, word: Vec<String>) -> PyResult<bool> {
    let dfa = regex_to_min_dfa(pattern)?;
    let word: Vec<&str> = word.iter().map(String::as_str).collect();
    Ok(dfa.accepts(&word))
}

/// For each start node, the final nodes reachable by a non-empty path whose
/// word matches `pattern`.
#[pyfunction]
#[pyo3(signature = (graph, pattern, start_nodes=None, final_nodes=None))]
pub fn reachable_with_constraints(
    graph: &RustGraph,
    pattern: &str,
    start_nodes: Option<Vec<u32>>,
    final_nodes: Option<Vec<u32>>,
) -> PyResult<BTreeMap<u32, Vec<u32>>> {
    let starts = node_set(start_nodes);
    let finals = node_set(final_nodes);
    let fa = MatrixAutomaton::from_graph(&graph.inner, starts.as_ref(), finals.as_ref());
    let constraint = build_automaton_from_regex(pattern)?;
    Ok(reachability::reachable_with_constraints(&fa, &constraint)
        .into_iter()
        .map(|(k, v)| (k, v.into_iter().collect()))
        .collect())
}
