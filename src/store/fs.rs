use std::{
    fs::{self, File},
    io::{self, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use log::{debug, info, warn};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::manager::ModelVersion;

use super::{ModelStore, StoreError};

/// The on-disk layout version written by this build
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a, P> {
    format: u32,
    version: &'a ModelVersion<P>,
}

#[derive(Deserialize)]
struct Envelope<P> {
    format: u32,
    version: ModelVersion<P>,
}

/// Stores the published version as one JSON file, replaced atomically on save
#[derive(Debug, Clone)]
pub struct FsModelStore {
    path: PathBuf,
}

impl FsModelStore {
    /// Create a store backed by the file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The model file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `version` to a temp file and rename it over the target.
    ///
    /// Once the rename lands the new version is what `load` returns, so a failed `sync` after
    /// that point is only logged.
    fn write_atomically<P: Serialize>(
        &self,
        version: &ModelVersion<P>,
        sync: impl FnOnce(&Path) -> io::Result<()>,
    ) -> Result<(), StoreError> {
        let dir = self.dir();
        fs::create_dir_all(dir)?;

        // The temp file lives next to the target so the final rename stays on one filesystem
        let tmp = tempfile::Builder::new()
            .prefix(".model-")
            .suffix(".tmp")
            .tempfile_in(dir)?;

        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer(
                &mut writer,
                &EnvelopeRef {
                    format: FORMAT_VERSION,
                    version,
                },
            )?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;

        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;

        if let Err(err) = sync(dir) {
            warn!(
                "Model written to {} but syncing {} failed: {}",
                self.path.display(),
                dir.display(),
                err
            );
        }

        debug!("Persisted model to {}", self.path.display());

        Ok(())
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl<P> ModelStore<P> for FsModelStore
where
    P: Serialize + DeserializeOwned + Send + Sync,
{
    fn load(&self) -> Result<ModelVersion<P>, StoreError> {
        let file = File::open(&self.path)?;
        let envelope: Envelope<P> = serde_json::from_reader(BufReader::new(file))?;

        if envelope.format != FORMAT_VERSION {
            return Err(StoreError::Format(format!(
                "expected format {}, found {}",
                FORMAT_VERSION, envelope.format
            )));
        }

        info!(
            "Loaded model from {} ({} training rows, trained at {})",
            self.path.display(),
            envelope.version.corpus.len(),
            envelope.version.trained_at
        );

        Ok(envelope.version)
    }

    fn save(&self, version: &ModelVersion<P>) -> Result<(), StoreError> {
        self.write_atomically(version, sync_dir)
    }
}

/// Flush the directory entry of a rename to disk
#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}
