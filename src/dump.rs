use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::{self, Write};
use std::num::ParseIntError;
use std::str::FromStr;

use itertools::Itertools;
use thiserror::Error;

use crate::graph::{GraphAccessor, NeighborCursor, SeekError};
use crate::types::NodeId;

#[derive(Error, Debug)]
pub enum DumpError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Seek(#[from] SeekError),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseRecordError {
    #[error("expected field `{0}`")]
    MissingField(&'static str),
    #[error("invalid number in field `{field}`: {source}")]
    InvalidNumber {
        field: &'static str,
        source: ParseIntError,
    },
    #[error("count {count} does not match {listed} listed neighbors")]
    CountMismatch { count: usize, listed: usize },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseFilterError {
    #[error("expected `<level>:<node>[,<node>...]`, got `{0}`")]
    Malformed(String),
    #[error(transparent)]
    InvalidNumber(#[from] ParseIntError),
}

/// Restricts a dump to a set of `(level, node)` pairs. Levels that are not
/// mentioned contribute nothing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DumpFilter {
    levels: HashMap<usize, HashSet<NodeId>>,
}

impl DumpFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, level: usize, node: NodeId) {
        self.levels.entry(level).or_default().insert(node);
    }

    pub fn includes_level(&self, level: usize) -> bool {
        self.levels.contains_key(&level)
    }

    pub fn includes(&self, level: usize, node: NodeId) -> bool {
        self.levels
            .get(&level)
            .map_or(false, |nodes| nodes.contains(&node))
    }
}

impl FromIterator<(usize, NodeId)> for DumpFilter {
    fn from_iter<I: IntoIterator<Item = (usize, NodeId)>>(iter: I) -> Self {
        let mut filter = DumpFilter::new();
        for (level, node) in iter {
            filter.insert(level, node);
        }
        filter
    }
}

/// Parses `0:2,5;1:7`, meaning nodes 2 and 5 at level 0 and node 7 at level 1.
impl FromStr for DumpFilter {
    type Err = ParseFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut filter = DumpFilter::new();
        for group in s.split(';').map(str::trim).filter(|g| !g.is_empty()) {
            let (level, nodes) = group
                .split_once(':')
                .ok_or_else(|| ParseFilterError::Malformed(group.to_string()))?;
            let level: usize = level.trim().parse()?;
            let mut any = false;
            for node in nodes.split(',').map(str::trim).filter(|n| !n.is_empty()) {
                filter.insert(level, NodeId(node.parse()?));
                any = true;
            }
            if !any {
                return Err(ParseFilterError::Malformed(group.to_string()));
            }
        }
        Ok(filter)
    }
}

/// One line of a graph dump.
///
/// `count` is the node's out-degree. `neighbors` holds the neighbor ids when
/// the dump lists them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DumpRecord {
    pub level: usize,
    pub node: NodeId,
    pub count: usize,
    pub neighbors: Option<Vec<NodeId>>,
}

impl fmt::Display for DumpRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "level={},node={},count={}",
            self.level, self.node, self.count
        )?;
        if let Some(neighbors) = &self.neighbors {
            write!(f, ",friends={}", neighbors.iter().join(","))?;
        }
        Ok(())
    }
}

fn parse_field<'s>(s: &'s str, field: &'static str) -> Result<&'s str, ParseRecordError> {
    s.strip_prefix(field)
        .and_then(|rest| rest.strip_prefix('='))
        .ok_or(ParseRecordError::MissingField(field))
}

fn parse_number(s: &str, field: &'static str) -> Result<usize, ParseRecordError> {
    s.parse()
        .map_err(|source| ParseRecordError::InvalidNumber { field, source })
}

impl FromStr for DumpRecord {
    type Err = ParseRecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim_end().splitn(4, ',');
        let mut next = |field: &'static str| parse_field(parts.next().unwrap_or(""), field);
        let level = parse_number(next("level")?, "level")?;
        let node = NodeId(parse_number(next("node")?, "node")?);
        let count = parse_number(next("count")?, "count")?;
        let neighbors = match parts.next() {
            None => None,
            Some(rest) => {
                let listed = parse_field(rest, "friends")?;
                let neighbors = listed
                    .split(',')
                    .filter(|n| !n.is_empty())
                    .map(|n| parse_number(n, "friends").map(NodeId))
                    .collect::<Result<Vec<_>, _>>()?;
                if neighbors.len() != count {
                    return Err(ParseRecordError::CountMismatch {
                        count,
                        listed: neighbors.len(),
                    });
                }
                Some(neighbors)
            }
        };

        Ok(Self {
            level,
            node,
            count,
            neighbors,
        })
    }
}

/// A lazy, level-major walk over a graph's adjacency, one record per node.
///
/// Only the current node's neighbor list is held in memory. A failed seek
/// ends the walk after yielding the error.
pub struct GraphDump<'a, G: GraphAccessor + 'a> {
    graph: &'a G,
    filter: Option<&'a DumpFilter>,
    with_neighbors: bool,
    level: usize,
    nodes: G::Nodes<'a>,
    cursor: G::Cursor<'a>,
}

pub fn dump<'a, G: GraphAccessor>(
    graph: &'a G,
    filter: Option<&'a DumpFilter>,
    with_neighbors: bool,
) -> GraphDump<'a, G> {
    let mut dump = GraphDump {
        graph,
        filter,
        with_neighbors,
        level: 0,
        nodes: graph.nodes_at_level(0),
        cursor: graph.cursor(),
    };
    dump.skip_filtered_levels();
    dump
}

impl<'a, G: GraphAccessor + 'a> GraphDump<'a, G> {
    fn skip_filtered_levels(&mut self) {
        let Some(filter) = self.filter else {
            return;
        };
        let start = self.level;
        while self.level < self.graph.num_levels() && !filter.includes_level(self.level) {
            self.level += 1;
        }
        if self.level != start {
            self.nodes = self.graph.nodes_at_level(self.level);
        }
    }

    fn advance_level(&mut self) {
        self.level += 1;
        self.nodes = self.graph.nodes_at_level(self.level);
        self.skip_filtered_levels();
    }
}

impl<'a, G: GraphAccessor + 'a> Iterator for GraphDump<'a, G> {
    type Item = Result<DumpRecord, SeekError>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.level < self.graph.num_levels() {
            let Some(node) = self.nodes.next() else {
                self.advance_level();
                continue;
            };
            if self
                .filter
                .map_or(false, |filter| !filter.includes(self.level, node))
            {
                continue;
            }
            if let Err(e) = self.cursor.seek(self.level, node) {
                self.level = self.graph.num_levels();
                return Some(Err(e));
            }
            let (count, neighbors) = if self.with_neighbors {
                let neighbors: Vec<NodeId> = self.cursor.neighbors().collect();
                (neighbors.len(), Some(neighbors))
            } else {
                (self.cursor.neighbors().count(), None)
            };

            return Some(Ok(DumpRecord {
                level: self.level,
                node,
                count,
                neighbors,
            }));
        }

        None
    }
}

/// Write every record of [`dump`] as a line. Returns the number of lines.
pub fn write_dump<G: GraphAccessor, W: Write>(
    graph: &G,
    filter: Option<&DumpFilter>,
    with_neighbors: bool,
    writer: &mut W,
) -> Result<usize, DumpError> {
    let mut lines = 0;
    for record in dump(graph, filter, with_neighbors) {
        writeln!(writer, "{}", record?)?;
        lines += 1;
    }
    Ok(lines)
}
