use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::graph::{GraphAccessor, SeekError};
use crate::node_set::NodeSet;
use crate::reachability::{components, overall_reachable, reachable};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("level {level}: {source}")]
    Level { level: usize, source: SeekError },
    #[error("overall reachability: {0}")]
    Overall(SeekError),
}

fn percent(part: usize, whole: usize) -> f32 {
    if whole == 0 {
        0.0
    } else {
        part as f32 * 100.0 / whole as f32
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelStats {
    pub level: usize,
    pub total: usize,
    pub reachable: usize,
    /// Sizes of the components the unreached nodes split into.
    pub components: Vec<usize>,
}

impl LevelStats {
    pub fn unreachable(&self) -> usize {
        self.total - self.reachable
    }

    pub fn disconnectedness(&self) -> f32 {
        percent(self.unreachable(), self.total)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverallStats {
    pub total: usize,
    pub reachable: usize,
}

impl OverallStats {
    pub fn unreachable(&self) -> usize {
        self.total - self.reachable
    }

    pub fn disconnectedness(&self) -> f32 {
        percent(self.unreachable(), self.total)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphReport {
    pub levels: Vec<LevelStats>,
    pub overall: OverallStats,
}

impl GraphReport {
    /// The positional form: one `[total, reachable, component sizes...]` row
    /// per level, then a final `[total, reachable]` row for the whole graph.
    pub fn to_counts(&self) -> Vec<Vec<usize>> {
        let mut counts: Vec<Vec<usize>> = self
            .levels
            .iter()
            .map(|l| {
                let mut row = Vec::with_capacity(2 + l.components.len());
                row.push(l.total);
                row.push(l.reachable);
                row.extend(&l.components);
                row
            })
            .collect();
        counts.push(vec![self.overall.total, self.overall.reachable]);
        counts
    }
}

/// Connectivity of every level of `graph` from its entry node, plus the
/// reachability of the collapsed graph.
pub fn analyze<G: GraphAccessor>(graph: &G) -> Result<GraphReport, AnalysisError> {
    let entry = graph.entry_node();
    let mut levels = Vec::with_capacity(graph.num_levels());
    for level in 0..graph.num_levels() {
        let reached =
            reachable(graph, level, entry).map_err(|source| AnalysisError::Level { level, source })?;

        let mut total = 0;
        let mut unreached = NodeSet::new();
        for node in graph.nodes_at_level(level) {
            total += 1;
            if !reached.contains(node) {
                unreached.insert(node);
            }
        }
        let others = if unreached.is_empty() {
            Vec::new()
        } else {
            components(graph, level, &mut unreached)
                .map_err(|source| AnalysisError::Level { level, source })?
        };

        debug!(
            level,
            total,
            reachable = reached.len(),
            components = others.len(),
            "analyzed level"
        );
        levels.push(LevelStats {
            level,
            total,
            reachable: reached.len(),
            components: others.iter().map(NodeSet::len).collect(),
        });
    }

    let overall = overall_reachable(graph).map_err(AnalysisError::Overall)?;
    Ok(GraphReport {
        levels,
        overall: OverallStats {
            total: graph.size(),
            reachable: overall.len(),
        },
    })
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentReport {
    /// Position of the segment in the index, counting unindexed ones. Skipped
    /// segments leave gaps, so the `Segment=` column of the rendered report
    /// is not a running count of the reported segments.
    pub segment: usize,
    pub name: String,
    pub report: GraphReport,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexReport {
    pub index: PathBuf,
    pub field: String,
    pub analyzed_at: DateTime<Utc>,
    pub segments: Vec<SegmentReport>,
}

const SEPARATOR: &str =
    "-----------------------------------------------------------------------------------";

impl fmt::Display for SegmentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for level in self.report.levels.iter() {
            write!(
                f,
                "Segment={:<8}\tLevel = {:<8}\tTotal Nodes = {:<8}\tReachable Nodes = {:<8}\tUnreachable Nodes = {:<8}\t%Disconnectedness = {:4.4}\tOther connected component sizes = ",
                self.segment,
                level.level,
                level.total,
                level.reachable,
                level.unreachable(),
                level.disconnectedness(),
            )?;
            for size in level.components.iter() {
                write!(f, "{size},")?;
            }
            writeln!(f)?;
        }
        let overall = &self.report.overall;
        writeln!(
            f,
            "Overall\tTotal Nodes = {:<8}\tReachable Nodes = {:<8}\tUnreachable Nodes = {:<8}\t%Disconnectedness = {:4.4}",
            overall.total,
            overall.reachable,
            overall.unreachable(),
            overall.disconnectedness(),
        )?;
        writeln!(f, "{SEPARATOR}")
    }
}

impl fmt::Display for IndexReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in self.segments.iter() {
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Layer, LayeredGraph};
    use crate::parameters::RandomGraphParameters;
    use crate::random::make_random_graph;
    use crate::types::NodeId;

    fn layer(lists: Vec<(usize, Vec<usize>)>) -> Layer {
        Layer::from_lists(
            lists
                .into_iter()
                .map(|(n, ns)| (NodeId(n), ns.into_iter().map(NodeId).collect()))
                .collect(),
        )
    }

    #[test]
    fn single_node_graph() {
        let graph = LayeredGraph::new(1, NodeId(0), vec![layer(vec![(0, vec![])])]).unwrap();
        let report = analyze(&graph).unwrap();
        assert_eq!(report.to_counts(), vec![vec![1, 1], vec![1, 1]]);
    }

    #[test]
    fn split_bottom_level() {
        let bottom = layer(vec![(0, vec![1]), (1, vec![0]), (2, vec![3]), (3, vec![])]);
        let top = layer(vec![(0, vec![])]);
        let graph = LayeredGraph::new(4, NodeId(0), vec![bottom, top]).unwrap();
        let report = analyze(&graph).unwrap();
        assert_eq!(
            report.levels[0],
            LevelStats {
                level: 0,
                total: 4,
                reachable: 2,
                components: vec![2]
            }
        );
        assert_eq!(report.levels[0].unreachable(), 2);
        assert_eq!(report.levels[0].disconnectedness(), 50.0);
        assert_eq!(report.to_counts(), vec![vec![4, 2, 2], vec![1, 1], vec![4, 2]]);
    }

    #[test]
    fn isolated_entry_node() {
        let bottom = layer(vec![
            (0, vec![]),
            (1, vec![2]),
            (2, vec![3]),
            (3, vec![1]),
            (4, vec![1]),
        ]);
        let top = layer(vec![(0, vec![]), (4, vec![])]);
        let graph = LayeredGraph::new(5, NodeId(0), vec![bottom, top]).unwrap();
        let report = analyze(&graph).unwrap();
        assert_eq!(
            report.overall,
            OverallStats {
                total: 5,
                reachable: 1
            }
        );
        assert_eq!(report.levels[0].components, vec![3, 1]);
        assert_eq!(report.levels[1].components, vec![1]);
        assert_eq!(report.overall.disconnectedness(), 80.0);
    }

    #[test]
    fn level_of_isolated_nodes() {
        let size = 40_000;
        let bottom = Layer::from_lists((0..size).map(|n| (NodeId(n), Vec::new())).collect());
        let graph = LayeredGraph::new(size, NodeId(0), vec![bottom]).unwrap();
        let report = analyze(&graph).unwrap();
        let level = &report.levels[0];
        assert_eq!(level.total, size);
        assert_eq!(level.reachable, 1);
        assert_eq!(level.components.len(), size - 1);
        assert!(level.components.iter().all(|&c| c == 1));
        assert_eq!(report.overall.reachable, 1);
    }

    #[test]
    fn broken_level_aborts_the_analysis() {
        let bottom = layer(vec![(0, vec![]), (1, vec![])]);
        let top = layer(vec![(0, vec![1])]);
        let graph = LayeredGraph::new(2, NodeId(0), vec![bottom, top]).unwrap();
        assert_eq!(
            analyze(&graph),
            Err(AnalysisError::Level {
                level: 1,
                source: SeekError::NodeAbsentAtLevel {
                    level: 1,
                    node: NodeId(1)
                }
            })
        );
    }

    #[test]
    fn analysis_is_idempotent_and_consistent() {
        let params = RandomGraphParameters {
            size: 3000,
            neighborhood_size: 2,
            zero_layer_neighborhood_size: 3,
            level_decay: 1.5,
            ..Default::default()
        };
        let graph = make_random_graph(&params).unwrap();
        let first = analyze(&graph).unwrap();
        let second = analyze(&graph).unwrap();
        assert_eq!(first, second);

        let best_level = first.levels.iter().map(|l| l.reachable).max().unwrap();
        assert!(first.overall.reachable >= best_level);
        assert!(first.overall.reachable <= first.overall.total);
        for level in first.levels.iter() {
            assert!(level.reachable <= level.total);
            assert_eq!(
                level.reachable + level.components.iter().sum::<usize>(),
                level.total
            );
        }
    }

    #[test]
    fn zero_node_level_reports_no_disconnectedness() {
        let stats = LevelStats {
            level: 3,
            total: 0,
            reachable: 0,
            components: vec![],
        };
        assert_eq!(stats.disconnectedness(), 0.0);
    }

    #[test]
    fn renders_table() {
        let segment = SegmentReport {
            segment: 1,
            name: "_1".to_string(),
            report: GraphReport {
                levels: vec![
                    LevelStats {
                        level: 0,
                        total: 4,
                        reachable: 2,
                        components: vec![1, 1],
                    },
                    LevelStats {
                        level: 1,
                        total: 1,
                        reachable: 1,
                        components: vec![],
                    },
                ],
                overall: OverallStats {
                    total: 4,
                    reachable: 3,
                },
            },
        };
        let rendered = segment.to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[0],
            "Segment=1       \tLevel = 0       \tTotal Nodes = 4       \tReachable Nodes = 2       \tUnreachable Nodes = 2       \t%Disconnectedness = 50.0000\tOther connected component sizes = 1,1,"
        );
        assert!(lines[1].ends_with("%Disconnectedness = 0.0000\tOther connected component sizes = "));
        assert_eq!(
            lines[2],
            "Overall\tTotal Nodes = 4       \tReachable Nodes = 3       \tUnreachable Nodes = 1       \t%Disconnectedness = 25.0000"
        );
        assert_eq!(lines[3], SEPARATOR);
    }
}
