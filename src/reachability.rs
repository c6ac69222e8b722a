use tracing::trace;

use crate::graph::{GraphAccessor, NeighborCursor, SeekError};
use crate::node_set::NodeSet;
use crate::types::NodeId;

/// Walks `level` from `start` with an explicit stack. `claim` decides
/// whether a popped node is new to the walk and records it.
fn traverse<G, F>(graph: &G, level: usize, start: NodeId, mut claim: F) -> Result<(), SeekError>
where
    G: GraphAccessor,
    F: FnMut(NodeId) -> bool,
{
    let mut cursor = graph.cursor();
    let mut visit_queue = vec![start];
    while let Some(node) = visit_queue.pop() {
        if !claim(node) {
            continue;
        }
        cursor.seek(level, node)?;
        visit_queue.extend(cursor.neighbors());
    }

    Ok(())
}

/// Every node reachable from `start` by following outgoing edges of `level`,
/// `start` included.
///
/// `start` must be present at `level`, as must every neighbor recorded at
/// that level. A node that is not is reported as an error.
pub fn reachable<G: GraphAccessor>(
    graph: &G,
    level: usize,
    start: NodeId,
) -> Result<NodeSet, SeekError> {
    let mut visited = NodeSet::new();
    traverse(graph, level, start, |node| visited.insert(node))?;
    Ok(visited)
}

/// Split `candidates` into representative-reachability components.
///
/// The lowest remaining candidate becomes a representative, and its
/// component is everything still in `candidates` that it reaches through
/// outgoing edges. Edges need not be symmetric, so a node that the
/// representative reaches joins its component even if it cannot reach the
/// representative back; this is not undirected connectivity. Members are
/// removed from `candidates` as components are formed, which leaves it empty
/// on success.
///
/// The traversal is confined to the remaining candidates: whatever lies
/// beyond a non-candidate was reached from the entry point or claimed by an
/// earlier component already. Each node is claimed once, so the work is
/// linear in the candidates and their edges however many components there
/// are.
pub fn components<G: GraphAccessor>(
    graph: &G,
    level: usize,
    candidates: &mut NodeSet,
) -> Result<Vec<NodeSet>, SeekError> {
    let mut result = Vec::new();
    while let Some(representative) = candidates.first() {
        let mut component = NodeSet::new();
        traverse(graph, level, representative, |node| {
            candidates.remove(node) && component.insert(node)
        })?;
        trace!(
            level,
            representative = representative.0,
            size = component.len(),
            "found component"
        );
        result.push(component);
    }

    Ok(result)
}

/// Every node reachable from the entry node when the levels are collapsed
/// into one graph.
///
/// A visited node contributes its outgoing edges from every level it
/// belongs to. Levels the node is absent from contribute nothing.
pub fn overall_reachable<G: GraphAccessor>(graph: &G) -> Result<NodeSet, SeekError> {
    let mut cursor = graph.cursor();
    let mut visited = NodeSet::new();
    let mut visit_queue = vec![graph.entry_node()];
    while let Some(node) = visit_queue.pop() {
        if !visited.insert(node) {
            continue;
        }
        for level in 0..graph.num_levels() {
            if !graph.has_node(level, node) {
                continue;
            }
            cursor.seek(level, node)?;
            visit_queue.extend(cursor.neighbors());
        }
    }

    Ok(visited)
}

/// Ids in `[0, size)` that [`overall_reachable`] never visits.
pub fn overall_unreachable<G: GraphAccessor>(graph: &G) -> Result<NodeSet, SeekError> {
    let reachable = overall_reachable(graph)?;
    let mut unreachable = NodeSet::full(graph.size());
    unreachable.remove_all(&reachable);
    Ok(unreachable)
}
