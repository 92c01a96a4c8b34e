#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::rc::Rc;

use mbtk_rs::dataset::DatasetMatrix;
use mbtk_rs::graph::DirectedGraph;
use mbtk_rs::types::{Value, VarId};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// 0 -> 1 <- 4, 1 -> 2 -> 5, 1 -> 3 -> 5
pub fn diamond() -> DirectedGraph {
    DirectedGraph::from_adjacency([(0, vec![1]), (4, vec![1]), (1, vec![2, 3]), (2, vec![5]), (3, vec![5])])
}

/// The example network of the PCMB article: 0 -> 1, 0 -> 2, 1 -> 3, 2 -> 3, 4 -> 1.
pub fn pcmb_example() -> DirectedGraph {
    DirectedGraph::from_adjacency([(0, vec![1, 2]), (1, vec![3]), (2, vec![3]), (3, vec![]), (4, vec![1])])
}

/// Samples `n` rows from a random categorical network over `graph`.
///
/// Every node takes `cardinality` values. Each row of every conditional
/// probability table puts most of its mass on one value, so that edges
/// translate into strong dependencies. Nodes must be numbered `0..len`.
pub fn sample_dataset(graph: &DirectedGraph, cardinality: Value, n: usize, seed: u64) -> Rc<DatasetMatrix> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let nodes = graph.nodes();
    assert_eq!(nodes, (0..nodes.len()).collect::<Vec<_>>(), "nodes must be numbered 0..len");
    let order = topological_order(graph);

    let mut tables: Vec<HashMap<Vec<Value>, Vec<f64>>> = vec![HashMap::new(); nodes.len()];
    let mut columns: Vec<Vec<Value>> = vec![Vec::with_capacity(n); nodes.len()];
    for _ in 0..n {
        let mut row: Vec<Option<Value>> = vec![None; nodes.len()];
        for &node in &order {
            let parent_values: Vec<Value> = graph
                .parents(node)
                .unwrap()
                .iter()
                .map(|&p| row[p].expect("parents are sampled first"))
                .collect();
            let weights = tables[node]
                .entry(parent_values)
                .or_insert_with(|| random_distribution(&mut rng, cardinality))
                .clone();
            let value = draw(&mut rng, &weights);
            row[node] = Some(value);
            columns[node].push(value);
        }
    }
    Rc::new(DatasetMatrix::from_columns("sampled", columns).unwrap())
}

/// Kahn's algorithm, taking the smallest ready node first.
pub fn topological_order(graph: &DirectedGraph) -> Vec<VarId> {
    let mut pending: BTreeMap<VarId, usize> = graph
        .nodes()
        .into_iter()
        .map(|node| (node, graph.parents(node).unwrap().len()))
        .collect();
    let mut ready: BTreeSet<VarId> = pending.iter().filter(|&(_, &d)| d == 0).map(|(&v, _)| v).collect();
    let mut order = Vec::with_capacity(pending.len());
    while let Some(node) = ready.pop_first() {
        pending.remove(&node);
        order.push(node);
        for &child in graph.children(node).unwrap() {
            let degree = pending.get_mut(&child).unwrap();
            *degree -= 1;
            if *degree == 0 {
                ready.insert(child);
            }
        }
    }
    assert!(pending.is_empty(), "graph has a cycle");
    order
}

fn random_distribution(rng: &mut ChaCha8Rng, cardinality: Value) -> Vec<f64> {
    let favourite = rng.random_range(0..cardinality) as usize;
    let mut weights: Vec<f64> = (0..cardinality).map(|_| rng.random::<f64>() * 0.3).collect();
    weights[favourite] += 1.0;
    let total: f64 = weights.iter().sum();
    weights.iter().map(|w| w / total).collect()
}

fn draw(rng: &mut ChaCha8Rng, weights: &[f64]) -> Value {
    let mut u = rng.random::<f64>();
    for (value, &w) in weights.iter().enumerate() {
        if u < w {
            return value as Value;
        }
        u -= w;
    }
    (weights.len() - 1) as Value
}
