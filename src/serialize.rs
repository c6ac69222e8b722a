use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::graph::{GraphAccessor, GraphError, Layer, LayeredGraph};
use crate::types::NodeId;

const ID_BYTES: usize = std::mem::size_of::<u64>();

#[derive(Error, Debug)]
pub enum SerializationError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("no graph stored at {0:?}")]
    GraphNotFound(PathBuf),
    #[error("index has no segment at position {0}")]
    SegmentOutOfRange(usize),
    #[error("field `{field}` has no graph in segment `{segment}`")]
    FieldNotIndexed { segment: String, field: String },
    #[error("{path:?} holds {found} bytes, expected {expected}")]
    Truncated {
        path: PathBuf,
        expected: usize,
        found: usize,
    },
    #[error("{path:?} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: &'static str },
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct LayerMeta {
    pub node_count: usize,
    pub neighborhood_size: usize,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct GraphMeta {
    pub size: usize,
    pub entry_node: NodeId,
    pub layer_count: usize,
}

fn create<P: AsRef<Path>>(path: P) -> io::Result<std::fs::File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

fn read_to_string(path: &Path) -> io::Result<String> {
    let mut file = OpenOptions::new().read(true).open(path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    Ok(contents)
}

/// Ids are stored as little-endian u64, with empty slots as `u64::MAX`.
fn write_ids(path: &Path, ids: &[NodeId]) -> io::Result<()> {
    let mut writer = BufWriter::new(create(path)?);
    for id in ids {
        let raw = if id.0 == !0 { u64::MAX } else { id.0 as u64 };
        writer.write_all(&raw.to_le_bytes())?;
    }
    writer.flush()
}

fn read_ids(path: &Path, count: usize) -> Result<Vec<NodeId>, SerializationError> {
    let expected = count
        .checked_mul(ID_BYTES)
        .ok_or_else(|| SerializationError::Corrupt {
            path: path.to_path_buf(),
            reason: "id count overflows",
        })?;
    let mut file = OpenOptions::new().read(true).open(path)?;
    let found = usize::try_from(file.metadata()?.len()).unwrap_or(usize::MAX);
    if found != expected {
        return Err(SerializationError::Truncated {
            path: path.to_path_buf(),
            expected,
            found,
        });
    }
    let mut bytes = Vec::with_capacity(expected);
    file.read_to_end(&mut bytes)?;
    if bytes.len() != expected {
        return Err(SerializationError::Truncated {
            path: path.to_path_buf(),
            expected,
            found: bytes.len(),
        });
    }

    Ok(bytes
        .chunks_exact(ID_BYTES)
        .map(|chunk| {
            let mut raw = [0; ID_BYTES];
            raw.copy_from_slice(chunk);
            match u64::from_le_bytes(raw) {
                u64::MAX => NodeId::MAX,
                id => NodeId(id as usize),
            }
        })
        .collect())
}

pub fn serialize_graph<P: AsRef<Path>>(
    graph: &LayeredGraph,
    path: P,
) -> Result<(), SerializationError> {
    let path = path.as_ref();
    let layer_count = graph.num_levels();

    std::fs::create_dir_all(path)?;
    debug!(?path, "graph serialization path");
    let serialized = serde_json::to_string(&GraphMeta {
        size: graph.size(),
        entry_node: graph.entry_node(),
        layer_count,
    })?;
    create(path.join("meta"))?.write_all(serialized.as_bytes())?;

    for (level, layer) in graph.layers().iter().enumerate() {
        let layer_meta = serde_json::to_string(&LayerMeta {
            node_count: layer.node_count(),
            neighborhood_size: layer.neighborhood_size,
        })?;
        create(path.join(format!("layer.meta.{level}")))?.write_all(layer_meta.as_bytes())?;
        write_ids(&path.join(format!("layer.nodes.{level}")), &layer.nodes)?;
        write_ids(&path.join(format!("layer.neighbors.{level}")), &layer.neighbors)?;
        debug!(level, nodes = layer.node_count(), "wrote layer");
    }
    Ok(())
}

pub fn deserialize_graph<P: AsRef<Path>>(path: P) -> Result<LayeredGraph, SerializationError> {
    let path = path.as_ref();
    let meta_path = path.join("meta");
    if !meta_path.exists() {
        return Err(SerializationError::GraphNotFound(path.to_path_buf()));
    }
    let GraphMeta {
        size,
        entry_node,
        layer_count,
    } = serde_json::from_str(&read_to_string(&meta_path)?)?;

    let mut layers = Vec::new();
    for level in 0..layer_count {
        let LayerMeta {
            node_count,
            neighborhood_size,
        } = serde_json::from_str(&read_to_string(&path.join(format!("layer.meta.{level}")))?)?;
        let slots = node_count.checked_mul(neighborhood_size).ok_or_else(|| {
            SerializationError::Corrupt {
                path: path.join(format!("layer.meta.{level}")),
                reason: "neighbor slot count overflows",
            }
        })?;
        let nodes = read_ids(&path.join(format!("layer.nodes.{level}")), node_count)?;
        let neighbors = read_ids(&path.join(format!("layer.neighbors.{level}")), slots)?;
        debug!(level, nodes = node_count, "read layer");
        layers.push(Layer::new(neighborhood_size, nodes, neighbors));
    }

    Ok(LayeredGraph::new(size, entry_node, layers)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::RandomGraphParameters;
    use crate::random::make_random_graph;

    #[test]
    fn graph_survives_a_trip_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let params = RandomGraphParameters {
            size: 500,
            ..Default::default()
        };
        let graph = make_random_graph(&params).unwrap();
        serialize_graph(&graph, dir.path().join("vector")).unwrap();
        let read = deserialize_graph(dir.path().join("vector")).unwrap();
        assert_eq!(read, graph);
    }

    #[test]
    fn missing_graph_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            deserialize_graph(dir.path()),
            Err(SerializationError::GraphNotFound(_))
        ));
    }

    #[test]
    fn truncated_layer_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let graph = make_random_graph(&RandomGraphParameters {
            size: 50,
            ..Default::default()
        })
        .unwrap();
        serialize_graph(&graph, dir.path()).unwrap();
        let nodes = dir.path().join("layer.nodes.0");
        let bytes = std::fs::read(&nodes).unwrap();
        std::fs::write(&nodes, &bytes[..bytes.len() - 3]).unwrap();
        assert!(matches!(
            deserialize_graph(dir.path()),
            Err(SerializationError::Truncated {
                expected: 400,
                found: 397,
                ..
            })
        ));
    }

    #[test]
    fn oversized_layer_meta_is_rejected_before_reading() {
        let dir = tempfile::tempdir().unwrap();
        let graph = make_random_graph(&RandomGraphParameters {
            size: 50,
            ..Default::default()
        })
        .unwrap();
        serialize_graph(&graph, dir.path()).unwrap();
        let layer_meta = dir.path().join("layer.meta.0");

        std::fs::write(
            &layer_meta,
            r#"{"node_count":1099511627776,"neighborhood_size":1099511627776}"#,
        )
        .unwrap();
        assert!(matches!(
            deserialize_graph(dir.path()),
            Err(SerializationError::Corrupt { path, .. }) if path == layer_meta
        ));

        std::fs::write(
            &layer_meta,
            r#"{"node_count":1099511627776,"neighborhood_size":1}"#,
        )
        .unwrap();
        assert!(matches!(
            deserialize_graph(dir.path()),
            Err(SerializationError::Truncated {
                expected: 8796093022208,
                found: 400,
                ..
            })
        ));
    }

    #[test]
    fn inconsistent_graph_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let graph = make_random_graph(&RandomGraphParameters {
            size: 50,
            ..Default::default()
        })
        .unwrap();
        serialize_graph(&graph, dir.path()).unwrap();
        let meta = serde_json::to_string(&GraphMeta {
            size: 10,
            entry_node: graph.entry_node(),
            layer_count: graph.num_levels(),
        })
        .unwrap();
        std::fs::write(dir.path().join("meta"), meta).unwrap();
        assert!(matches!(
            deserialize_graph(dir.path()),
            Err(SerializationError::Graph(_))
        ));
    }
}
