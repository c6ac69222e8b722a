use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hnsw_connectedness::{check_index, dump_index, CheckParameters, DumpFilter, Index};

/// Report how much of each segment's graph is reachable from its entry node.
#[derive(Parser, Debug)]
#[command(version)]
struct Command {
    /// Index directory, holding one subdirectory per segment
    index: PathBuf,
    /// Vector field whose graphs are checked
    field: String,
    /// Also write the adjacency of every checked graph to this file
    dump_file: Option<PathBuf>,
    /// JSON file with check parameters
    #[arg(long)]
    config: Option<PathBuf>,
    /// Only dump these nodes, as `<level>:<node>,...;<level>:<node>,...`
    #[arg(long)]
    filter: Option<DumpFilter>,
    /// Dump out-degrees without the neighbor lists
    #[arg(long)]
    no_friends: bool,
    /// Check segments in parallel
    #[arg(long)]
    parallel: bool,
    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hnsw_connectedness=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let command = Command::parse();
    let mut params = match &command.config {
        Some(path) => CheckParameters::load(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => CheckParameters::default(),
    };
    if command.no_friends {
        params.dump_neighbors = false;
    }
    if command.parallel {
        params.parallel = true;
    }

    let report = check_index(&command.index, &command.field, &params)?;
    if command.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "For index {} field : {}",
            command.index.display(),
            command.field
        );
        print!("{report}");
    }

    if let Some(dump_file) = &command.dump_file {
        let index = Index::open(&command.index)?;
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(dump_file)
            .with_context(|| format!("creating dump file {}", dump_file.display()))?;
        let mut writer = BufWriter::new(file);
        let lines = dump_index(
            &index,
            &command.field,
            command.filter.as_ref(),
            &params,
            &mut writer,
        )?;
        writer.flush()?;
        info!(lines, path = ?dump_file, "wrote graph dump");
    }

    Ok(())
}
