use std::fs::OpenOptions;
use std::io::Read;
use std::path::Path;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::serialize::SerializationError;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct CheckParameters {
    /// Emit the `friends=` list for every dumped node.
    pub dump_neighbors: bool,
    /// Analyze segments on the rayon pool rather than one after another.
    pub parallel: bool,
}

impl Default for CheckParameters {
    fn default() -> Self {
        Self {
            dump_neighbors: true,
            parallel: false,
        }
    }
}

fn load_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T, SerializationError> {
    let mut file = OpenOptions::new().read(true).open(path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    Ok(serde_json::from_str(&contents)?)
}

impl CheckParameters {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SerializationError> {
        load_json(path)
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct RandomGraphParameters {
    pub size: usize,
    pub neighborhood_size: usize,
    pub zero_layer_neighborhood_size: usize,
    /// Rate of the exponential level distribution; higher rates give
    /// sparser upper levels.
    pub level_decay: f64,
    pub max_levels: usize,
    pub seed: u64,
}

impl Default for RandomGraphParameters {
    fn default() -> Self {
        Self {
            size: 1000,
            neighborhood_size: 12,
            zero_layer_neighborhood_size: 24,
            level_decay: (12.0_f64).ln(),
            max_levels: 8,
            seed: 42,
        }
    }
}

impl RandomGraphParameters {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SerializationError> {
        load_json(path)
    }
}
