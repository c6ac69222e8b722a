use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use rayon::prelude::*;
use thiserror::Error;
use tracing::{info, warn};

use crate::dump::{write_dump, DumpError, DumpFilter};
use crate::graph::LayeredGraph;
use crate::parameters::CheckParameters;
use crate::report::{analyze, AnalysisError, IndexReport, SegmentReport};
use crate::serialize::{deserialize_graph, serialize_graph, SerializationError};

#[derive(Error, Debug)]
pub enum CheckError {
    #[error(transparent)]
    Serialization(#[from] SerializationError),
    #[error("segment `{segment}`: {source}")]
    Analysis {
        segment: String,
        source: AnalysisError,
    },
    #[error("segment `{segment}`: {source}")]
    Dump { segment: String, source: DumpError },
}

/// A directory of segments. Each segment is a subdirectory holding one
/// graph directory per indexed vector field.
#[derive(Clone, Debug)]
pub struct Index {
    path: PathBuf,
    segments: Vec<String>,
}

impl Index {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SerializationError> {
        let path = path.as_ref().to_path_buf();
        let mut segments = Vec::new();
        for entry in std::fs::read_dir(&path)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                segments.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        segments.sort();

        Ok(Self { path, segments })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    fn field_path(&self, segment: &str, field: &str) -> PathBuf {
        self.path.join(segment).join(field)
    }

    /// The graph of `field` in the segment at position `segment`, or
    /// `FieldNotIndexed` when that segment holds no such graph.
    pub fn field_graph(
        &self,
        segment: usize,
        field: &str,
    ) -> Result<LayeredGraph, SerializationError> {
        let name = self
            .segments
            .get(segment)
            .ok_or(SerializationError::SegmentOutOfRange(segment))?;
        match deserialize_graph(self.field_path(name, field)) {
            Err(SerializationError::GraphNotFound(_)) => Err(SerializationError::FieldNotIndexed {
                segment: name.clone(),
                field: field.to_string(),
            }),
            result => result,
        }
    }

    /// Store `graph` as the `field` graph of segment `segment`, creating the
    /// segment if needed.
    pub fn write_field_graph(
        &mut self,
        segment: &str,
        field: &str,
        graph: &LayeredGraph,
    ) -> Result<(), SerializationError> {
        serialize_graph(graph, self.field_path(segment, field))?;
        if let Err(ix) = self.segments.binary_search_by(|s| s.as_str().cmp(segment)) {
            self.segments.insert(ix, segment.to_string());
        }
        Ok(())
    }

    fn indexed_graph(
        &self,
        segment: usize,
        field: &str,
    ) -> Result<Option<LayeredGraph>, SerializationError> {
        match self.field_graph(segment, field) {
            Ok(graph) => Ok(Some(graph)),
            Err(SerializationError::FieldNotIndexed { segment, field }) => {
                warn!(%segment, %field, "field not indexed, skipping segment");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

fn check_segment(
    index: &Index,
    segment: usize,
    field: &str,
) -> Result<Option<SegmentReport>, CheckError> {
    let Some(graph) = index.indexed_graph(segment, field)? else {
        return Ok(None);
    };
    let name = index.segments()[segment].clone();
    let report = match analyze(&graph) {
        Ok(report) => report,
        Err(source) => return Err(CheckError::Analysis { segment: name, source }),
    };
    info!(
        segment = name.as_str(),
        levels = report.levels.len(),
        total = report.overall.total,
        reachable = report.overall.reachable,
        "analyzed segment"
    );

    Ok(Some(SegmentReport {
        segment,
        name,
        report,
    }))
}

/// Analyze the `field` graph of every segment, in segment order. Segments
/// without that field are left out of the result.
pub fn check_connected(
    index: &Index,
    field: &str,
    params: &CheckParameters,
) -> Result<Vec<SegmentReport>, CheckError> {
    let segment_count = index.segments().len();
    let reports: Vec<Option<SegmentReport>> = if params.parallel {
        (0..segment_count)
            .into_par_iter()
            .map(|segment| check_segment(index, segment, field))
            .collect::<Result<Vec<_>, CheckError>>()?
    } else {
        (0..segment_count)
            .map(|segment| check_segment(index, segment, field))
            .collect::<Result<Vec<_>, CheckError>>()?
    };

    Ok(reports.into_iter().flatten().collect())
}

pub fn check_index<P: AsRef<Path>>(
    path: P,
    field: &str,
    params: &CheckParameters,
) -> Result<IndexReport, CheckError> {
    let index = Index::open(&path)?;
    let segments = check_connected(&index, field, params)?;
    Ok(IndexReport {
        index: index.path().to_path_buf(),
        field: field.to_string(),
        analyzed_at: Utc::now(),
        segments,
    })
}

/// Dump the `field` graph of every indexed segment to `writer`, one segment
/// after another, applying `filter` to each. Returns the number of lines
/// written.
pub fn dump_index<W: Write>(
    index: &Index,
    field: &str,
    filter: Option<&DumpFilter>,
    params: &CheckParameters,
    writer: &mut W,
) -> Result<usize, CheckError> {
    let mut lines = 0;
    for segment in 0..index.segments().len() {
        let Some(graph) = index.indexed_graph(segment, field)? else {
            continue;
        };
        lines += write_dump(&graph, filter, params.dump_neighbors, writer).map_err(|source| {
            CheckError::Dump {
                segment: index.segments()[segment].clone(),
                source,
            }
        })?;
    }
    Ok(lines)
}
