use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hnsw_connectedness::{make_random_graph, Index, RandomGraphParameters};

/// Write an index of random layered graphs, one per segment.
#[derive(Parser, Debug)]
struct Command {
    /// Directory to write the index to
    output: PathBuf,
    #[arg(long, default_value = "vector")]
    field: String,
    #[arg(long, default_value_t = 1)]
    segments: usize,
    /// JSON file with generator parameters
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    size: Option<usize>,
    #[arg(long)]
    seed: Option<u64>,
}

pub fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hnsw_connectedness=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let command = Command::parse();
    let mut params = match &command.config {
        Some(path) => RandomGraphParameters::load(path)?,
        None => RandomGraphParameters::default(),
    };
    if let Some(size) = command.size {
        params.size = size;
    }
    if let Some(seed) = command.seed {
        params.seed = seed;
    }

    std::fs::create_dir_all(&command.output)?;
    let mut index = Index::open(&command.output)?;
    for segment in 0..command.segments {
        let segment_params = RandomGraphParameters {
            seed: params.seed + segment as u64,
            ..params
        };
        let graph = make_random_graph(&segment_params)?;
        let name = format!("_{segment}");
        index.write_field_graph(&name, &command.field, &graph)?;
        info!(segment = name.as_str(), size = params.size, "wrote segment");
    }

    Ok(())
}
