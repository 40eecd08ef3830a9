use std::collections::BTreeSet;

/// A labeled edge `src --label--> dst`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    pub src: u32,
    pub label: String,
    pub dst: u32,
}

/// Directed multigraph with one symbol per edge.
///
/// Nodes are kept sorted so every index derived from them is deterministic.
#[derive(Debug, Clone, Default)]
pub struct LabeledGraph {
    nodes: BTreeSet<u32>,
    edges: Vec<Edge>,
}

impl LabeledGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(src, label, dst)` triples.
    pub fn from_edges<'a>(edges: impl IntoIterator<Item = (u32, &'a str, u32)>) -> Self {
        let mut g = LabeledGraph::new();
        for (src, label, dst) in edges {
            g.add_edge(src, label, dst);
        }
        g
    }

    pub fn add_node(&mut self, node: u32) {
        self.nodes.insert(node);
    }

    /// Add an edge; parallel edges with the same label collapse in every
    /// matrix view but are kept here.
    pub fn add_edge(&mut self, src: u32, label: &str, dst: u32) {
        self.nodes.insert(src);
        self.nodes.insert(dst);
        self.edges.push(Edge {
            src,
            label: label.to_string(),
            dst,
        });
    }

    pub fn nodes(&self) -> impl Iterator<Item = u32> + '_ {
        self.nodes.iter().copied()
    }

    pub fn contains_node(&self, node: u32) -> bool {
        self.nodes.contains(&node)
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn labels(&self) -> BTreeSet<String> {
        self.edges.iter().map(|e| e.label.clone()).collect()
    }

    pub fn info(&self) -> GraphInfo {
        GraphInfo {
            node_count: self.node_count(),
            edge_count: self.edge_count(),
            labels: self.labels(),
        }
    }
}

/// Summary counts of a graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphInfo {
    pub node_count: usize,
    pub edge_count: usize,
    pub labels: BTreeSet<String>,
}

/// Two directed cycles sharing node 0.
///
/// The first cycle runs through nodes `1..=n` with edges labeled `labels.0`,
/// the second through `n+1..=n+m` with edges labeled `labels.1`.
pub fn labeled_two_cycles(n: u32, m: u32, labels: (&str, &str)) -> LabeledGraph {
    let mut g = LabeledGraph::new();
    g.add_node(0);

    let mut cycle = |nodes: Vec<u32>, label: &str| {
        let mut prev = 0;
        for v in nodes {
            g.add_edge(prev, label, v);
            prev = v;
        }
        g.add_edge(prev, label, 0);
    };
    cycle((1..=n).collect(), labels.0);
    cycle((n + 1..=n + m).collect(), labels.1);
    g
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_cycles_counts() {
        let g = labeled_two_cycles(3, 4, ("a", "b"));
        let info = g.info();
        assert_eq!(info.node_count, 8);
        assert_eq!(info.edge_count, 9);
        assert_eq!(
            info.labels,
            ["a", "b"].iter().map(|s| s.to_string()).collect()
        );
        let a_edges = g.edges().iter().filter(|e| e.label == "a").count();
        assert_eq!(a_edges, 4);
    }

    #[test]
    fn test_graph_info() {
        let mut g = LabeledGraph::from_edges([(1, "a", 2), (2, "b", 3)]);
        g.add_node(7);
        let info = g.info();
        assert_eq!(info.node_count, 4);
        assert_eq!(info.edge_count, 2);
        assert_eq!(g.nodes().collect::<Vec<_>>(), vec![1, 2, 3, 7]);
    }
}
