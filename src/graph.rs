use std::slice;

use thiserror::Error;

use crate::types::{EmptyValue, NodeId};

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum SeekError {
    #[error("node {node} is not present at level {level}")]
    NodeAbsentAtLevel { level: usize, node: NodeId },
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum GraphError {
    #[error("graph has no levels")]
    NoLevels,
    #[error("entry node {0} is not present at the top level")]
    EntryNotOnTopLevel(NodeId),
    #[error("level {level}: node {node} is outside a graph of size {size}")]
    NodeOutOfRange {
        level: usize,
        node: NodeId,
        size: usize,
    },
    #[error("level {level}: node list is not strictly increasing at node {node}")]
    UnsortedNodes { level: usize, node: NodeId },
    #[error("level {level}: expected {expected} neighbor slots, found {found}")]
    NeighborSlotMismatch {
        level: usize,
        expected: usize,
        found: usize,
    },
    #[error("level {level}: neighbor {neighbor} of node {node} is outside a graph of size {size}")]
    NeighborOutOfRange {
        level: usize,
        node: NodeId,
        neighbor: NodeId,
        size: usize,
    },
}

/// A positional cursor over the outgoing edges of one node at one level.
pub trait NeighborCursor {
    /// Position the cursor at `node` on `level`. Fails if the node does not
    /// belong to that level, in which case the cursor yields nothing.
    fn seek(&mut self, level: usize, node: NodeId) -> Result<(), SeekError>;

    /// Next neighbor of the node last sought, or `None` once exhausted.
    fn next_neighbor(&mut self) -> Option<NodeId>;

    fn neighbors(&mut self) -> Neighbors<'_, Self>
    where
        Self: Sized,
    {
        Neighbors { cursor: self }
    }
}

pub struct Neighbors<'c, C> {
    cursor: &'c mut C,
}

impl<'c, C: NeighborCursor> Iterator for Neighbors<'c, C> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        self.cursor.next_neighbor()
    }
}

/// Read access to a layered proximity graph.
///
/// Node ids are shared across levels and live in `[0, size())`. Level 0
/// holds every node, higher levels hold subsets of it. Each call to
/// [`GraphAccessor::cursor`] hands out an independent cursor, so traversals
/// never share positioning state.
pub trait GraphAccessor {
    type Nodes<'a>: Iterator<Item = NodeId>
    where
        Self: 'a;
    type Cursor<'a>: NeighborCursor
    where
        Self: 'a;

    fn size(&self) -> usize;
    fn num_levels(&self) -> usize;
    fn entry_node(&self) -> NodeId;
    /// Nodes present at `level`. Levels outside `[0, num_levels())` are empty.
    fn nodes_at_level(&self, level: usize) -> Self::Nodes<'_>;
    fn has_node(&self, level: usize, node: NodeId) -> bool;
    fn cursor(&self) -> Self::Cursor<'_>;
}

/// One level of a [`LayeredGraph`].
///
/// `nodes` is sorted. Neighbors are stored in fixed-width rows of
/// `neighborhood_size` slots, one row per entry of `nodes`, with unused
/// slots set to `NodeId::MAX`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layer {
    pub neighborhood_size: usize,
    pub nodes: Vec<NodeId>,
    pub neighbors: Vec<NodeId>,
}

impl Layer {
    pub fn new(neighborhood_size: usize, nodes: Vec<NodeId>, neighbors: Vec<NodeId>) -> Self {
        Self {
            neighborhood_size,
            nodes,
            neighbors,
        }
    }

    /// Build a layer from per-node neighbor lists, in any node order.
    pub fn from_lists(mut lists: Vec<(NodeId, Vec<NodeId>)>) -> Self {
        lists.sort_by_key(|(node, _)| *node);
        let neighborhood_size = lists.iter().map(|(_, ns)| ns.len()).max().unwrap_or(0);
        let mut nodes = Vec::with_capacity(lists.len());
        let mut neighbors = Vec::with_capacity(lists.len() * neighborhood_size);
        for (node, ns) in lists {
            nodes.push(node);
            let padding = neighborhood_size - ns.len();
            neighbors.extend(ns);
            neighbors.extend(std::iter::repeat(NodeId::empty()).take(padding));
        }

        Self {
            neighborhood_size,
            nodes,
            neighbors,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn get_index(&self, n: NodeId) -> Option<usize> {
        self.nodes.binary_search(&n).ok()
    }

    /// The raw neighbor row for the node at `index`, padding included.
    pub fn get_neighbors(&self, index: usize) -> &[NodeId] {
        &self.neighbors[(index * self.neighborhood_size)..((index + 1) * self.neighborhood_size)]
    }

    fn validate(&self, level: usize, size: usize) -> Result<(), GraphError> {
        let expected = self.nodes.len() * self.neighborhood_size;
        if self.neighbors.len() != expected {
            return Err(GraphError::NeighborSlotMismatch {
                level,
                expected,
                found: self.neighbors.len(),
            });
        }
        let mut last: Option<NodeId> = None;
        for (ix, &node) in self.nodes.iter().enumerate() {
            if node.0 >= size {
                return Err(GraphError::NodeOutOfRange { level, node, size });
            }
            if last.map_or(false, |l| l >= node) {
                return Err(GraphError::UnsortedNodes { level, node });
            }
            last = Some(node);
            if let Some(&neighbor) = self
                .get_neighbors(ix)
                .iter()
                .find(|n| !n.is_empty() && n.0 >= size)
            {
                return Err(GraphError::NeighborOutOfRange {
                    level,
                    node,
                    neighbor,
                    size,
                });
            }
        }
        Ok(())
    }
}

/// An immutable, fully materialized layered graph. `layers[0]` is level 0.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayeredGraph {
    size: usize,
    entry_node: NodeId,
    layers: Vec<Layer>,
}

impl LayeredGraph {
    pub fn new(size: usize, entry_node: NodeId, layers: Vec<Layer>) -> Result<Self, GraphError> {
        for (level, layer) in layers.iter().enumerate() {
            layer.validate(level, size)?;
        }
        let top = layers.last().ok_or(GraphError::NoLevels)?;
        if top.get_index(entry_node).is_none() {
            return Err(GraphError::EntryNotOnTopLevel(entry_node));
        }

        Ok(Self {
            size,
            entry_node,
            layers,
        })
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn get_layer(&self, level: usize) -> Option<&Layer> {
        self.layers.get(level)
    }
}

fn empty_row<'a>() -> slice::Iter<'a, NodeId> {
    let row: &'a [NodeId] = &[];
    row.iter()
}

pub struct LayeredGraphCursor<'a> {
    graph: &'a LayeredGraph,
    slots: slice::Iter<'a, NodeId>,
}

impl<'a> NeighborCursor for LayeredGraphCursor<'a> {
    fn seek(&mut self, level: usize, node: NodeId) -> Result<(), SeekError> {
        let row = self
            .graph
            .get_layer(level)
            .and_then(|layer| layer.get_index(node).map(|ix| layer.get_neighbors(ix)));
        match row {
            Some(row) => {
                self.slots = row.iter();
                Ok(())
            }
            None => {
                self.slots = empty_row();
                Err(SeekError::NodeAbsentAtLevel { level, node })
            }
        }
    }

    fn next_neighbor(&mut self) -> Option<NodeId> {
        self.slots.find(|n| !n.is_empty()).copied()
    }
}

impl GraphAccessor for LayeredGraph {
    type Nodes<'a> = std::iter::Copied<slice::Iter<'a, NodeId>>;
    type Cursor<'a> = LayeredGraphCursor<'a>;

    fn size(&self) -> usize {
        self.size
    }

    fn num_levels(&self) -> usize {
        self.layers.len()
    }

    fn entry_node(&self) -> NodeId {
        self.entry_node
    }

    fn nodes_at_level(&self, level: usize) -> Self::Nodes<'_> {
        match self.layers.get(level) {
            Some(layer) => layer.nodes.iter().copied(),
            None => empty_row().copied(),
        }
    }

    fn has_node(&self, level: usize, node: NodeId) -> bool {
        self.layers
            .get(level)
            .map_or(false, |layer| layer.get_index(node).is_some())
    }

    fn cursor(&self) -> Self::Cursor<'_> {
        LayeredGraphCursor {
            graph: self,
            slots: empty_row(),
        }
    }
}
