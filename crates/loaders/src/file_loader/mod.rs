use crate::{
    error::{Result, SnapshotError},
    snapshot::{SNAPSHOT_VERSION, Snapshot},
};
use res::Esn;
use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;
use tracing::{debug, info};

// Snapshot file at a fixed path. The parent directory has to exist already.
#[derive(Debug, Clone)]
pub struct FileLoader {
    path: PathBuf,
}

impl FileLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, esn: &Esn) -> Result<()> {
        self.write_snapshot(&Snapshot::capture(esn))
    }

    /// Encodes into a uniquely named temporary file next to the target and renames it over
    /// the target, so readers never see a half written snapshot. Concurrent writers each get
    /// their own temporary file; the last rename wins.
    pub fn write_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        let serialized = serde_json::to_vec(snapshot)
            .map_err(|e| SnapshotError::io(&self.path, io::Error::other(e)))?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| SnapshotError::io(&self.path, e))?;
        tmp.write_all(&serialized)
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| SnapshotError::io(&self.path, e))?;
        tmp.persist(&self.path)
            .map_err(|e| SnapshotError::io(&self.path, e.error))?;
        info!(
            path = %self.path.display(),
            size = snapshot.size,
            bytes = serialized.len(),
            "saved reservoir snapshot"
        );
        Ok(())
    }

    pub fn read_snapshot(&self) -> Result<Snapshot> {
        let content = fs::read(&self.path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => SnapshotError::NotFound(self.path.clone()),
            _ => SnapshotError::io(&self.path, e),
        })?;
        let snapshot: Snapshot = serde_json::from_slice(&content)
            .map_err(|e| SnapshotError::corrupt(&self.path, e))?;
        if snapshot.version == 0 || snapshot.version > SNAPSHOT_VERSION {
            return Err(SnapshotError::corrupt(
                &self.path,
                format!("unsupported snapshot version {}", snapshot.version),
            ));
        }
        Ok(snapshot)
    }

    pub fn load(&self) -> Result<Esn> {
        let snapshot = self.read_snapshot()?;
        debug!(version = snapshot.version, "decoded reservoir snapshot");
        let esn = snapshot
            .restore()
            .map_err(|e| SnapshotError::corrupt(&self.path, e))?;
        info!(
            path = %self.path.display(),
            size = esn.size(),
            normalized = esn.normalizer().is_some(),
            "loaded reservoir snapshot"
        );
        Ok(esn)
    }

    /// Like `load`, but a missing file is `Ok(None)`. Any other failure is still an error.
    pub fn try_load(&self) -> Result<Option<Esn>> {
        match self.load() {
            Ok(esn) => Ok(Some(esn)),
            Err(SnapshotError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

pub fn save(esn: &Esn, path: impl Into<PathBuf>) -> Result<()> {
    FileLoader::new(path).save(esn)
}

pub fn load(path: impl Into<PathBuf>) -> Result<Esn> {
    FileLoader::new(path).load()
}
