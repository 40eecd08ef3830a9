use crate::config::{Algorithm, CfpqConfig};
use crate::error::{CfpqError, Result};
use crate::filter::{Derivations, ResultFilter, SolveStats};
use crate::grammar::{Grammar, NormalGrammar};
use crate::graph::LabeledGraph;
use crate::hellings::hellings;
use crate::matrix_engine::matrix_closure;
use crate::normalize::normalize;
use crate::rsm::Rsm;
use crate::tensor::tensor_closure;
use rustc_hash::FxHashSet;
use std::collections::BTreeSet;
use tracing::info;

/// The language side of a query.
#[derive(Debug, Clone, Copy)]
pub enum Query<'a> {
    Grammar(&'a Grammar),
    Rsm(&'a Rsm),
}

impl<'a> From<&'a Grammar> for Query<'a> {
    fn from(g: &'a Grammar) -> Self {
        Query::Grammar(g)
    }
}

impl<'a> From<&'a Rsm> for Query<'a> {
    fn from(r: &'a Rsm) -> Self {
        Query::Rsm(r)
    }
}

impl<'a> Query<'a> {
    pub fn start(&self) -> &'a str {
        match *self {
            Query::Grammar(g) => g.start(),
            Query::Rsm(r) => r.start(),
        }
    }

    /// No productions, or no boxes.
    pub fn is_empty(&self) -> bool {
        match self {
            Query::Grammar(g) => g.is_empty(),
            Query::Rsm(r) => r.is_empty(),
        }
    }

    /// A non-empty query must define its start symbol.
    fn check_start(&self) -> Result<()> {
        let defined = match self {
            Query::Grammar(g) => g.has_productions_for(g.start()),
            Query::Rsm(r) => r.has_box(r.start()),
        };
        if self.is_empty() || defined {
            Ok(())
        } else {
            Err(CfpqError::undefined(self.start()))
        }
    }

    /// Weak normal form of the query, converting an RSM through its
    /// per-state grammar.
    pub fn normal_grammar(&self) -> Result<NormalGrammar> {
        match self {
            Query::Grammar(g) => normalize(g),
            Query::Rsm(r) => normalize(&r.to_grammar()),
        }
    }

    pub fn rsm(&self) -> Rsm {
        match self {
            Query::Grammar(g) => Rsm::from_grammar(g),
            Query::Rsm(r) => (*r).clone(),
        }
    }
}

/// One CFPQ strategy: derive every `(start, variable, end)` fact.
pub trait Solver {
    fn name(&self) -> &'static str;

    fn derive(&self, query: Query<'_>, graph: &LabeledGraph) -> Result<Derivations>;
}

pub struct HellingsSolver;

impl Solver for HellingsSolver {
    fn name(&self) -> &'static str {
        "hellings"
    }

    fn derive(&self, query: Query<'_>, graph: &LabeledGraph) -> Result<Derivations> {
        Ok(hellings(&query.normal_grammar()?, graph))
    }
}

pub struct MatrixSolver {
    pub parallel: bool,
}

impl Solver for MatrixSolver {
    fn name(&self) -> &'static str {
        "matrix"
    }

    fn derive(&self, query: Query<'_>, graph: &LabeledGraph) -> Result<Derivations> {
        matrix_closure(&query.normal_grammar()?, graph, self.parallel)
    }
}

pub struct TensorSolver;

impl Solver for TensorSolver {
    fn name(&self) -> &'static str {
        "tensor"
    }

    fn derive(&self, query: Query<'_>, graph: &LabeledGraph) -> Result<Derivations> {
        match query {
            Query::Rsm(r) => tensor_closure(r, graph),
            Query::Grammar(_) => tensor_closure(&query.rsm(), graph),
        }
    }
}

impl CfpqConfig {
    pub fn solver(&self) -> Box<dyn Solver + Send + Sync> {
        match self.algorithm {
            Algorithm::Hellings => Box::new(HellingsSolver),
            Algorithm::Matrix => Box::new(MatrixSolver {
                parallel: self.parallel,
            }),
            Algorithm::Tensor => Box::new(TensorSolver),
        }
    }
}

/// Pairs for a query plus the engine's counters.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub pairs: BTreeSet<(u32, u32)>,
    pub stats: SolveStats,
}

/// Answer a query and report engine statistics.
///
/// Any engine accepts either a grammar or an RSM. Empty node sets behave
/// like `None`.
pub fn cfpq_with_stats<'a>(
    query: impl Into<Query<'a>>,
    graph: &LabeledGraph,
    start_nodes: Option<&FxHashSet<u32>>,
    final_nodes: Option<&FxHashSet<u32>>,
    config: &CfpqConfig,
) -> Result<QueryResult> {
    let query = query.into();
    query.check_start()?;
    if query.is_empty() {
        return Ok(QueryResult::default());
    }

    let solver = config.solver();
    let derivations = solver.derive(query, graph)?;
    let pairs = ResultFilter::new(query.start())
        .with_start_nodes(start_nodes)
        .with_final_nodes(final_nodes)
        .with_self_pairs(config.self_pairs)
        .apply(&derivations.triples);
    info!(
        algorithm = solver.name(),
        pairs = pairs.len(),
        elapsed_ms = derivations.stats.elapsed_ms,
        "cfpq answered"
    );
    Ok(QueryResult {
        pairs,
        stats: derivations.stats,
    })
}

/// Node pairs `(u, v)` joined by a path whose word the query derives from
/// its start symbol.
pub fn cfpq<'a>(
    query: impl Into<Query<'a>>,
    graph: &LabeledGraph,
    start_nodes: Option<&FxHashSet<u32>>,
    final_nodes: Option<&FxHashSet<u32>>,
    config: &CfpqConfig,
) -> Result<BTreeSet<(u32, u32)>> {
    Ok(cfpq_with_stats(query, graph, start_nodes, final_nodes, config)?.pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::SelfPairs;
    use crate::grammar::GrammarSymbol;

    fn t(s: &str) -> GrammarSymbol {
        GrammarSymbol::terminal(s)
    }

    fn v(s: &str) -> GrammarSymbol {
        GrammarSymbol::variable(s)
    }

    fn anbn() -> Grammar {
        let mut g = Grammar::new("S");
        g.add_production("S", vec![t("a"), v("S"), t("b")]);
        g.add_production("S", vec![t("a"), t("b")]);
        g
    }

    fn square() -> LabeledGraph {
        LabeledGraph::from_edges([(0, "a", 1), (1, "a", 2), (2, "b", 3), (3, "b", 0)])
    }

    #[test]
    fn test_end_to_end_every_algorithm() {
        let g = anbn();
        for a in Algorithm::ALL {
            let got = cfpq(&g, &square(), None, None, &CfpqConfig::new(a)).unwrap();
            assert!(got.contains(&(0, 0)), "{a}");
            assert!(got.contains(&(1, 3)), "{a}");
            assert!(!got.contains(&(0, 2)), "{a}");
            assert_eq!(got, [(0, 0), (1, 3)].into_iter().collect(), "{a}");
        }
    }

    #[test]
    fn test_rsm_query_every_algorithm() {
        let rsm = Rsm::from_regex("a S b | a b", "S").unwrap();
        for a in Algorithm::ALL {
            let got = cfpq(&rsm, &square(), None, None, &CfpqConfig::new(a)).unwrap();
            assert_eq!(got, [(0, 0), (1, 3)].into_iter().collect(), "{a}");
        }
    }

    #[test]
    fn test_node_filters() {
        let starts: FxHashSet<u32> = [1, 42].into_iter().collect();
        for a in Algorithm::ALL {
            let got = cfpq(&anbn(), &square(), Some(&starts), None, &CfpqConfig::new(a)).unwrap();
            assert_eq!(got, [(1, 3)].into_iter().collect(), "{a}");
        }
    }

    #[test]
    fn test_self_pairs_mode() {
        let config = CfpqConfig::default().with_self_pairs(SelfPairs::Exclude);
        let got = cfpq(&anbn(), &square(), None, None, &config).unwrap();
        assert_eq!(got, [(1, 3)].into_iter().collect());
    }

    #[test]
    fn test_undefined_start() {
        let mut g = Grammar::new("S");
        g.add_production("A", vec![t("a")]);
        for a in Algorithm::ALL {
            assert_eq!(
                cfpq(&g, &square(), None, None, &CfpqConfig::new(a)),
                Err(CfpqError::undefined("S"))
            );
        }
        let rsm = Rsm::from_regex("a", "A").unwrap();
        let mut moved = Rsm::new("S");
        moved.add_box("A", rsm.get_box("A").unwrap());
        assert!(cfpq(&moved, &square(), None, None, &CfpqConfig::default()).is_err());
    }

    #[test]
    fn test_empty_grammar_is_not_an_error() {
        let g = Grammar::new("S");
        for a in Algorithm::ALL {
            assert!(cfpq(&g, &square(), None, None, &CfpqConfig::new(a)).unwrap().is_empty());
        }
    }

    #[test]
    fn test_edge_labels_never_stand_for_variables() {
        let g = LabeledGraph::from_edges([(0, "a", 1), (1, "S", 2), (2, "b", 3)]);
        let mut terminal_s = Grammar::new("S");
        terminal_s.add_production("S", vec![t("S")]);
        for a in Algorithm::ALL {
            let config = CfpqConfig::new(a);
            assert!(cfpq(&anbn(), &g, None, None, &config).unwrap().is_empty(), "{a}");
            assert_eq!(
                cfpq(&terminal_s, &g, None, None, &config).unwrap(),
                [(1, 2)].into_iter().collect(),
                "{a}"
            );
        }
    }

    #[test]
    fn test_stats_are_reported() {
        let r = cfpq_with_stats(
            &anbn(),
            &square(),
            None,
            None,
            &CfpqConfig::new(Algorithm::Matrix),
        )
        .unwrap();
        assert!(r.stats.rounds >= 1);
        assert!(r.stats.derived >= r.pairs.len() as u64);
    }
}
