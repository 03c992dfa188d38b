pub mod config;
pub mod error;
pub mod input_mapping;
pub mod nd_json;

pub use config::ReservoirConfig;
pub use error::{ContextError, Result};
pub use input_mapping::{IndexMapping, KeyedMapping};
pub use loaders::Snapshot;
pub use nd_json::{NdArray, NdJsonError};

use loaders::FileLoader;
use res::Esn;
use std::path::Path;
use tracing::{debug, info, warn};

/// Reads and writes address at most this many values per state unit.
pub const MAX_VALUES_PER_UNIT: usize = 64;

/// Writes a snapshot captured earlier by [`ResContext::step`] or [`ResContext::snapshot`].
/// Needs no access to the context, so it can run after the lock around it is released.
pub fn persist(snapshot: &Snapshot, path: &Path) -> Result<()> {
    FileLoader::new(path).write_snapshot(snapshot)?;
    Ok(())
}

/// Owns the reservoir together with the bookkeeping around it: the step counter, the snapshot
/// cadence and the key mapping used by reads and writes.
///
/// The context does no locking itself. A service sharing it between requests wraps it in a
/// mutex, and should only hold that mutex while capturing a snapshot, not while writing it.
pub struct ResContext {
    esn: Esn,
    steps: u64,
    loader: Option<FileLoader>,
    save_every: Option<u64>,
    mapping: Box<dyn IndexMapping>,
}

impl std::fmt::Debug for ResContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResContext")
            .field("params", self.esn.params())
            .field("steps", &self.steps)
            .field("loader", &self.loader)
            .field("save_every", &self.save_every)
            .finish()
    }
}

impl ResContext {
    pub fn open(config: &ReservoirConfig) -> Result<Self> {
        Self::open_with_mapping(config, KeyedMapping)
    }

    /// Restores the reservoir from `model_path` when a snapshot exists there, otherwise draws a
    /// fresh one. A snapshot that exists but cannot be read is an error, never a fresh start.
    pub fn open_with_mapping(
        config: &ReservoirConfig,
        mapping: impl IndexMapping + 'static,
    ) -> Result<Self> {
        config.validate()?;
        let params = config.esn_parameters();
        let loader = config.model_path.clone().map(FileLoader::new);

        let restored = match &loader {
            Some(loader) => loader.try_load()?,
            None => None,
        };
        let esn = match restored {
            Some(esn) => {
                if esn.params() != &params {
                    warn!(
                        snapshot = ?esn.params(),
                        configured = ?params,
                        "snapshot hyperparameters differ from configuration, keeping snapshot"
                    );
                }
                esn
            }
            None => {
                if let Some(loader) = &loader {
                    info!(path = %loader.path().display(), "no snapshot found, drawing a fresh reservoir");
                }
                Esn::new(params)?
            }
        };

        Ok(Self {
            esn,
            steps: 0,
            loader,
            save_every: config.save_every,
            mapping: Box::new(mapping),
        })
    }

    /// Wraps an existing reservoir without persistence.
    pub fn new(esn: Esn) -> Self {
        Self {
            esn,
            steps: 0,
            loader: None,
            save_every: None,
            mapping: Box::new(KeyedMapping),
        }
    }

    pub fn esn(&self) -> &Esn {
        &self.esn
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn loader(&self) -> Option<&FileLoader> {
        self.loader.as_ref()
    }

    pub fn model_path(&self) -> Option<&Path> {
        self.loader.as_ref().map(FileLoader::path)
    }

    fn indices(&self, key: &str, shape: &[usize]) -> Result<Vec<usize>> {
        let size = self.esn.size();
        let expected = nd_json::element_count(shape)?;
        let limit = size.saturating_mul(MAX_VALUES_PER_UNIT);
        if expected > limit {
            return Err(ContextError::ShapeTooLarge {
                shape: shape.to_vec(),
                count: expected,
                limit,
            });
        }
        let indices = self.mapping.map_indices(key, shape, size);
        if indices.len() != expected {
            return Err(ContextError::MappingMismatch {
                key: key.to_owned(),
                expected,
                actual: indices.len(),
            });
        }
        if let Some(index) = indices.iter().find(|i| **i >= size) {
            return Err(ContextError::IndexOutOfRange {
                key: key.to_owned(),
                index: *index,
                size,
            });
        }
        Ok(indices)
    }

    pub fn read(&self, key: &str, shape: &[usize]) -> Result<NdArray> {
        let indices = self.indices(key, shape)?;
        debug!(key, ?shape, "read");
        let values = input_mapping::gather(self.esn.state().as_slice(), &indices);
        Ok(NdArray::new(shape.to_vec(), values)?)
    }

    /// Adds `values` into the units addressed by `key`.
    pub fn write(&mut self, key: &str, values: &NdArray) -> Result<()> {
        let indices = self.indices(key, values.shape())?;
        debug!(key, shape = ?values.shape(), "write");
        input_mapping::scatter_add(self.esn.state_mut(), &indices, values.data());
        Ok(())
    }

    /// Advances the reservoir one tick. Returns a captured snapshot when one is due; the caller
    /// writes it, ideally after releasing any lock around the context.
    pub fn step(&mut self) -> Option<Snapshot> {
        self.esn.step();
        self.steps += 1;
        match (self.save_every, &self.loader) {
            (Some(every), Some(_)) if self.steps % every == 0 => {
                debug!(steps = self.steps, "snapshot due");
                Some(self.snapshot())
            }
            _ => None,
        }
    }

    pub fn reset(&mut self) {
        self.esn.reset();
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.esn)
    }

    /// Captures and writes in one go, for callers that do not share the context.
    pub fn save(&self) -> Result<()> {
        let loader = self.loader.as_ref().ok_or(ContextError::NoModelPath)?;
        loader.write_snapshot(&self.snapshot())?;
        Ok(())
    }
}
