use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use rand_distr::Uniform;

use crate::graph::{GraphError, Layer, LayeredGraph};
use crate::parameters::RandomGraphParameters;
use crate::types::NodeId;

/// Build a seeded random layered graph.
///
/// Each node draws its top level from an exponential distribution, capped at
/// `max_levels - 1`. At every level it belongs to, a node links to a uniformly
/// chosen number of other nodes of that level, so edges are asymmetric and
/// some nodes end up unreachable. The entry node is the lowest id among the
/// nodes of the top level.
pub fn make_random_graph(params: &RandomGraphParameters) -> Result<LayeredGraph, GraphError> {
    let mut prng = StdRng::seed_from_u64(params.seed);
    let unit = Uniform::from(0.0..1.0_f64);
    let max_level = params.max_levels.saturating_sub(1);
    let node_levels: Vec<usize> = (0..params.size)
        .map(|_| {
            let u: f64 = prng.sample(unit);
            let level = (-(1.0 - u).ln() / params.level_decay).floor();
            (level as usize).min(max_level)
        })
        .collect();
    let level_count = node_levels.iter().max().map_or(1, |top| top + 1);

    let mut layers = Vec::with_capacity(level_count);
    for level in 0..level_count {
        let nodes: Vec<NodeId> = node_levels
            .iter()
            .enumerate()
            .filter(|(_, top)| **top >= level)
            .map(|(n, _)| NodeId(n))
            .collect();
        let neighborhood_size = if level == 0 {
            params.zero_layer_neighborhood_size
        } else {
            params.neighborhood_size
        };
        let lists = nodes
            .iter()
            .map(|&node| {
                let count = prng.gen_range(0..=neighborhood_size);
                let neighbors: Vec<NodeId> = nodes
                    .choose_multiple(&mut prng, count)
                    .copied()
                    .filter(|n| *n != node)
                    .collect();
                (node, neighbors)
            })
            .collect();
        layers.push(Layer::from_lists(lists));
    }

    let entry_node = layers
        .last()
        .and_then(|top| top.nodes.first().copied())
        .unwrap_or(NodeId(0));
    LayeredGraph::new(params.size, entry_node, layers)
}
