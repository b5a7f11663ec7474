use petgraph::algo::connected_components;
use petgraph::graph::{NodeIndex, UnGraph};
use std::collections::{HashMap, HashSet, VecDeque};

/// One connected component of a bus graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Island {
    pub island_id: usize,
    /// Member node weights in discovery order; the first one is the island's representative.
    pub members: Vec<String>,
}

/// Labels connected components (breadth-first search), visiting start nodes in insertion order.
pub fn find_islands<N, E>(graph: &UnGraph<N, E>) -> Vec<Vec<NodeIndex>> {
    let mut visited = HashSet::with_capacity(graph.node_count());
    let mut islands = Vec::new();
    for start in graph.node_indices() {
        if visited.contains(&start) {
            continue;
        }
        let mut queue = VecDeque::new();
        queue.push_back(start);
        let mut members = Vec::new();
        while let Some(node) = queue.pop_front() {
            if !visited.insert(node) {
                continue;
            }
            members.push(node);
            for neighbor in graph.neighbors(node) {
                if !visited.contains(&neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }
        if !members.is_empty() {
            islands.push(members);
        }
    }
    islands
}

/// Undirected graph over bus ids, used for connectivity checks.
#[derive(Debug, Default)]
pub struct BusGraph {
    graph: UnGraph<String, ()>,
    index: HashMap<String, NodeIndex>,
}

impl BusGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bus; adding the same id twice is a no-op.
    pub fn add_bus(&mut self, id: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(id) {
            return idx;
        }
        let idx = self.graph.add_node(id.to_string());
        self.index.insert(id.to_string(), idx);
        idx
    }

    /// Connect two known buses. Returns false when either id is unknown.
    pub fn connect(&mut self, a: &str, b: &str) -> bool {
        match (self.index.get(a), self.index.get(b)) {
            (Some(&ia), Some(&ib)) => {
                self.graph.add_edge(ia, ib, ());
                true
            }
            _ => false,
        }
    }

    pub fn bus_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn component_count(&self) -> usize {
        connected_components(&self.graph)
    }

    pub fn islands(&self) -> Vec<Island> {
        find_islands(&self.graph)
            .into_iter()
            .enumerate()
            .map(|(island_id, members)| Island {
                island_id,
                members: members.into_iter().map(|n| self.graph[n].clone()).collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_disconnected_buses_into_islands() {
        let mut g = BusGraph::new();
        for id in ["a", "b", "c", "d"] {
            g.add_bus(id);
        }
        assert!(g.connect("a", "b"));
        assert!(g.connect("c", "d"));
        assert!(!g.connect("a", "missing"));

        let islands = g.islands();
        assert_eq!(islands.len(), 2);
        assert_eq!(g.component_count(), 2);
        assert_eq!(islands[0].members, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(islands[1].members[0], "c");
    }

    #[test]
    fn duplicate_buses_are_ignored() {
        let mut g = BusGraph::new();
        let first = g.add_bus("a");
        let second = g.add_bus("a");
        assert_eq!(first, second);
        assert_eq!(g.bus_count(), 1);
    }

    #[test]
    fn generic_islands_cover_every_node() {
        let mut graph: UnGraph<usize, ()> = UnGraph::new_undirected();
        let n: Vec<_> = (0..5).map(|i| graph.add_node(i)).collect();
        graph.add_edge(n[0], n[4], ());
        graph.add_edge(n[1], n[2], ());
        let islands = find_islands(&graph);
        assert_eq!(islands.len(), 3);
        assert_eq!(islands.iter().map(Vec::len).sum::<usize>(), 5);
    }
}
