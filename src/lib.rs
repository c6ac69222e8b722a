//! Structural health checks for layered proximity graphs (HNSW-style).
//!
//! Given a graph through [`GraphAccessor`], [`analyze`] reports per level how
//! many nodes the entry node reaches and how the rest split into
//! components, along with the reachability of all levels collapsed into
//! one graph. [`dump`] writes out the adjacency structure for offline
//! inspection.

pub mod dump;
pub mod graph;
pub mod index;
pub mod node_set;
pub mod parameters;
pub mod random;
pub mod reachability;
pub mod report;
pub mod serialize;
pub mod types;

pub use dump::{dump, write_dump, DumpError, DumpFilter, DumpRecord, GraphDump};
pub use graph::{GraphAccessor, GraphError, Layer, LayeredGraph, NeighborCursor, SeekError};
pub use index::{check_connected, check_index, dump_index, CheckError, Index};
pub use node_set::NodeSet;
pub use parameters::{CheckParameters, RandomGraphParameters};
pub use random::make_random_graph;
pub use reachability::{components, overall_reachable, overall_unreachable, reachable};
pub use report::{
    analyze, AnalysisError, GraphReport, IndexReport, LevelStats, OverallStats, SegmentReport,
};
pub use serialize::{deserialize_graph, serialize_graph, SerializationError};
pub use types::NodeId;
