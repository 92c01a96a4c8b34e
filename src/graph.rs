//! Causal graphs used as ground truth.
//!
//! A [`DirectedGraph`] is a DAG over variable ids. It answers d-separation
//! queries, which is what the d-separation CI test and the accuracy
//! bookkeeping of the G-tests consult, and it knows the true Markov blanket of
//! each node.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use crate::error::{Error, Result};
use crate::types::{VarId, VarSet};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectedGraph {
    children: BTreeMap<VarId, BTreeSet<VarId>>,
    parents: BTreeMap<VarId, BTreeSet<VarId>>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
enum Direction {
    /// Arrived from a child, moving against the edge.
    Up,
    /// Arrived from a parent, moving along the edge.
    Down,
}

impl DirectedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from `parent -> child` edges.
    pub fn from_edges(edges: impl IntoIterator<Item = (VarId, VarId)>) -> Self {
        let mut graph = Self::new();
        for (parent, child) in edges {
            graph.add_edge(parent, child);
        }
        graph
    }

    /// Builds a graph from `node -> children` lists.
    pub fn from_adjacency<C>(adjacency: impl IntoIterator<Item = (VarId, C)>) -> Self
    where
        C: IntoIterator<Item = VarId>,
    {
        let mut graph = Self::new();
        for (node, children) in adjacency {
            graph.add_node(node);
            for child in children {
                graph.add_edge(node, child);
            }
        }
        graph
    }

    pub fn add_node(&mut self, node: VarId) {
        self.children.entry(node).or_default();
        self.parents.entry(node).or_default();
    }

    pub fn add_edge(&mut self, parent: VarId, child: VarId) {
        self.add_node(parent);
        self.add_node(child);
        self.children.entry(parent).or_default().insert(child);
        self.parents.entry(child).or_default().insert(parent);
    }

    /// All nodes, ascending.
    pub fn nodes(&self) -> Vec<VarId> {
        self.children.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn contains(&self, node: VarId) -> bool {
        self.children.contains_key(&node)
    }

    pub fn parents(&self, node: VarId) -> Result<&BTreeSet<VarId>> {
        self.parents.get(&node).ok_or(Error::UnknownVariable(node))
    }

    pub fn children(&self, node: VarId) -> Result<&BTreeSet<VarId>> {
        self.children.get(&node).ok_or(Error::UnknownVariable(node))
    }

    /// Nodes in `nodes` or with a descendant in `nodes`.
    fn ancestors_of(&self, nodes: &VarSet) -> Result<HashSet<VarId>> {
        let mut ancestors = HashSet::new();
        let mut stack: Vec<VarId> = nodes.to_vec();
        while let Some(node) = stack.pop() {
            if ancestors.insert(node) {
                stack.extend(self.parents(node)?.iter().copied());
            }
        }
        Ok(ancestors)
    }

    /// Whether `x` and `y` are d-separated by `z`.
    ///
    /// Runs a reachability search over active trails: a trail passes a
    /// non-collider outside `z`, and passes a collider that is in `z` or has a
    /// descendant in `z`.
    pub fn d_separated(&self, x: VarId, y: VarId, z: &VarSet) -> Result<bool> {
        for node in [x, y].into_iter().chain(z.iter()) {
            if !self.contains(node) {
                return Err(Error::UnknownVariable(node));
            }
        }
        if x == y {
            return Ok(false);
        }
        if z.contains(x) || z.contains(y) {
            return Ok(true);
        }

        let ancestors = self.ancestors_of(z)?;
        let mut visited: HashSet<(VarId, Direction)> = HashSet::new();
        let mut queue: VecDeque<(VarId, Direction)> = VecDeque::from([(x, Direction::Up)]);

        while let Some((node, direction)) = queue.pop_front() {
            if !visited.insert((node, direction)) {
                continue;
            }
            let observed = z.contains(node);
            if node == y && !observed {
                return Ok(false);
            }
            match direction {
                Direction::Up if !observed => {
                    queue.extend(self.parents(node)?.iter().map(|&p| (p, Direction::Up)));
                    queue.extend(self.children(node)?.iter().map(|&c| (c, Direction::Down)));
                }
                Direction::Up => {}
                Direction::Down => {
                    if !observed {
                        queue.extend(self.children(node)?.iter().map(|&c| (c, Direction::Down)));
                    }
                    if ancestors.contains(&node) {
                        queue.extend(self.parents(node)?.iter().map(|&p| (p, Direction::Up)));
                    }
                }
            }
        }
        Ok(true)
    }

    /// Ground-truth conditional independence: d-separation.
    pub fn conditionally_independent(&self, x: VarId, y: VarId, z: &VarSet) -> Result<bool> {
        self.d_separated(x, y, z)
    }

    /// Parents, children and the children's other parents of `node`.
    pub fn markov_blanket(&self, node: VarId) -> Result<VarSet> {
        let mut blanket: VarSet = self.parents(node)?.iter().copied().collect();
        for &child in self.children(node)? {
            blanket.insert(child);
            for &spouse in self.parents(child)? {
                blanket.insert(spouse);
            }
        }
        blanket.remove(node);
        Ok(blanket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    fn graph() -> DirectedGraph {
        // 0 -> 1 <- 4, 1 -> 2 -> 5, 1 -> 3 -> 5
        DirectedGraph::from_adjacency([
            (0, vec![1]),
            (4, vec![1]),
            (1, vec![2, 3]),
            (2, vec![5]),
            (3, vec![5]),
            (5, vec![]),
        ])
    }

    #[test]
    fn test_structure() {
        let g = graph();
        assert_eq!(g.nodes(), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(g.parents(1).unwrap(), &BTreeSet::from([0, 4]));
        assert_eq!(g.children(1).unwrap(), &BTreeSet::from([2, 3]));
        assert!(matches!(g.parents(9), Err(Error::UnknownVariable(9))));
    }

    #[test]
    fn test_chain_and_fork() {
        let g = graph();
        assert!(!g.d_separated(0, 2, &VarSet::new()).unwrap());
        assert!(g.d_separated(0, 2, &VarSet::from([1])).unwrap());
        assert!(!g.d_separated(2, 3, &VarSet::new()).unwrap());
        assert!(g.d_separated(2, 3, &VarSet::from([1])).unwrap());
    }

    #[test]
    fn test_collider() {
        let g = graph();
        assert!(g.d_separated(0, 4, &VarSet::new()).unwrap());
        assert!(!g.d_separated(0, 4, &VarSet::from([1])).unwrap());
        // Conditioning on a descendant of the collider also opens it.
        assert!(!g.d_separated(0, 4, &VarSet::from([5])).unwrap());
        assert!(!g.d_separated(2, 3, &VarSet::from([1, 5])).unwrap());
    }

    #[test]
    fn test_symmetry() {
        let g = graph();
        let nodes = g.nodes();
        for &x in &nodes {
            for &y in &nodes {
                for z in [VarSet::new(), VarSet::from([1]), VarSet::from([5]), VarSet::from([2, 3])] {
                    assert_eq!(g.d_separated(x, y, &z).unwrap(), g.d_separated(y, x, &z).unwrap());
                }
            }
        }
    }

    #[test]
    fn test_markov_blanket() {
        let g = graph();
        assert_eq!(g.markov_blanket(3).unwrap(), VarSet::from([1, 2, 5]));
        assert_eq!(g.markov_blanket(1).unwrap(), VarSet::from([0, 2, 3, 4]));
        assert_eq!(g.markov_blanket(0).unwrap(), VarSet::from([1, 4]));
    }

    #[test]
    fn test_unknown_node() {
        let g = graph();
        assert!(matches!(
            g.d_separated(0, 7, &VarSet::new()),
            Err(Error::UnknownVariable(7))
        ));
    }
}
