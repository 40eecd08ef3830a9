use rustc_hash::FxHashSet;
use std::collections::BTreeSet;

/// `(start, variable, end)`: some path `start → end` spells a word that
/// `variable` derives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Triple {
    pub start: u32,
    pub variable: String,
    pub end: u32,
}

impl Triple {
    pub fn new(start: u32, variable: impl Into<String>, end: u32) -> Self {
        Triple {
            start,
            variable: variable.into(),
            end,
        }
    }
}

/// Whether `(v, v)` pairs are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelfPairs {
    #[default]
    Keep,
    Exclude,
}

/// Counters for one engine run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolveStats {
    /// Fixpoint rounds (worklist pops for Hellings).
    pub rounds: u64,
    /// Facts held at the fixpoint: triples or true matrix entries.
    pub derived: u64,
    pub elapsed_ms: f64,
}

/// Everything an engine derived, before filtering.
#[derive(Debug, Clone, Default)]
pub struct Derivations {
    pub triples: FxHashSet<Triple>,
    pub stats: SolveStats,
}

/// Projects triples onto `(start, end)` pairs of one variable.
///
/// An absent or empty node set places no restriction on that side.
#[derive(Debug, Clone)]
pub struct ResultFilter<'a> {
    variable: &'a str,
    start_nodes: Option<&'a FxHashSet<u32>>,
    final_nodes: Option<&'a FxHashSet<u32>>,
    self_pairs: SelfPairs,
}

impl<'a> ResultFilter<'a> {
    pub fn new(variable: &'a str) -> Self {
        ResultFilter {
            variable,
            start_nodes: None,
            final_nodes: None,
            self_pairs: SelfPairs::Keep,
        }
    }

    pub fn with_start_nodes(mut self, nodes: Option<&'a FxHashSet<u32>>) -> Self {
        self.start_nodes = nodes.filter(|s| !s.is_empty());
        self
    }

    pub fn with_final_nodes(mut self, nodes: Option<&'a FxHashSet<u32>>) -> Self {
        self.final_nodes = nodes.filter(|s| !s.is_empty());
        self
    }

    pub fn with_self_pairs(mut self, mode: SelfPairs) -> Self {
        self.self_pairs = mode;
        self
    }

    /// Does the pair pass the node filters and self-pair mode?
    pub fn admits(&self, start: u32, end: u32) -> bool {
        self.start_nodes.map_or(true, |s| s.contains(&start))
            && self.final_nodes.map_or(true, |f| f.contains(&end))
            && !(self.self_pairs == SelfPairs::Exclude && start == end)
    }

    pub fn apply<'t>(&self, triples: impl IntoIterator<Item = &'t Triple>) -> BTreeSet<(u32, u32)> {
        triples
            .into_iter()
            .filter(|t| t.variable == self.variable && self.admits(t.start, t.end))
            .map(|t| (t.start, t.end))
            .collect()
    }
}

/// Keep the `start_symbol` triples whose endpoints pass the node filters.
pub fn filter<'t>(
    triples: impl IntoIterator<Item = &'t Triple>,
    start_symbol: &str,
    start_nodes: Option<&FxHashSet<u32>>,
    final_nodes: Option<&FxHashSet<u32>>,
) -> BTreeSet<(u32, u32)> {
    ResultFilter::new(start_symbol)
        .with_start_nodes(start_nodes)
        .with_final_nodes(final_nodes)
        .apply(triples)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Triple> {
        vec![
            Triple::new(0, "S", 1),
            Triple::new(1, "S", 1),
            Triple::new(1, "A", 2),
            Triple::new(2, "S", 0),
        ]
    }

    #[test]
    fn test_filter_by_variable() {
        let t = sample();
        let got = filter(&t, "S", None, None);
        assert_eq!(got, [(0, 1), (1, 1), (2, 0)].into_iter().collect());
        assert!(filter(&t, "B", None, None).is_empty());
    }

    #[test]
    fn test_filter_by_nodes() {
        let t = sample();
        let starts: FxHashSet<u32> = [0, 1].into_iter().collect();
        let finals: FxHashSet<u32> = [1].into_iter().collect();
        let got = filter(&t, "S", Some(&starts), Some(&finals));
        assert_eq!(got, [(0, 1), (1, 1)].into_iter().collect());
    }

    #[test]
    fn test_empty_node_set_is_unrestricted() {
        let t = sample();
        let empty = FxHashSet::default();
        assert_eq!(
            filter(&t, "S", Some(&empty), Some(&empty)),
            filter(&t, "S", None, None)
        );
    }

    #[test]
    fn test_exclude_self_pairs() {
        let t = sample();
        let got = ResultFilter::new("S")
            .with_self_pairs(SelfPairs::Exclude)
            .apply(&t);
        assert_eq!(got, [(0, 1), (2, 0)].into_iter().collect());
    }
}
