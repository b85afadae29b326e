use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use postes_core::{EstablishmentId, JobCatalog, MergeRecord, MergeSet};
use postes_logging::postes_debug;
use tempfile::NamedTempFile;
use thiserror::Error;

const RECORD_SUFFIX: &str = ".merges";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("store directory missing or not writable: {0}")]
    StoreDir(String),
    #[error("establishment id {0:?} cannot be used as a storage key")]
    InvalidKey(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Durable, establishment-scoped storage of the last saved grouping.
pub trait MergeStore: Send + Sync {
    /// Replaces the stored record wholesale.
    fn store(&self, establishment: &EstablishmentId, record: &MergeRecord) -> Result<(), PersistError>;

    /// The stored record, empty when none exists. Malformed content is
    /// pruned rather than reported.
    fn retrieve(&self, establishment: &EstablishmentId) -> Result<MergeRecord, PersistError>;

    fn clear(&self, establishment: &EstablishmentId) -> Result<(), PersistError>;

    /// Retrieves and hydrates against `catalog`, pruning ids it no longer holds.
    fn hydrate(
        &self,
        establishment: &EstablishmentId,
        catalog: &JobCatalog,
    ) -> Result<MergeSet, PersistError> {
        let record = self.retrieve(establishment)?;
        Ok(record.hydrate(establishment.clone(), catalog))
    }
}

/// Ensure store directory exists; create if missing.
pub fn ensure_store_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::StoreDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::StoreDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::StoreDir(e.to_string()))?;
    }
    Ok(())
}

/// Atomically write content to `{dir}/{filename}` by writing a temp file then renaming.
#[derive(Debug, Clone)]
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn write(&self, filename: &str, content: &str) -> Result<PathBuf, PersistError> {
        ensure_store_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}

/// One `<establishment>.merges` JSON file per establishment.
#[derive(Debug, Clone)]
pub struct FileMergeStore {
    dir: PathBuf,
    writer: AtomicFileWriter,
}

impl FileMergeStore {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            writer: AtomicFileWriter::new(dir.clone()),
            dir,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn record_path(&self, establishment: &EstablishmentId) -> Result<PathBuf, PersistError> {
        Ok(self.dir.join(record_filename(establishment)?))
    }
}

impl MergeStore for FileMergeStore {
    fn store(&self, establishment: &EstablishmentId, record: &MergeRecord) -> Result<(), PersistError> {
        let filename = record_filename(establishment)?;
        let path = self.writer.write(&filename, &record.to_json_string())?;
        postes_debug!("Stored {} group(s) at {:?}", record.groups().len(), path);
        Ok(())
    }

    fn retrieve(&self, establishment: &EstablishmentId) -> Result<MergeRecord, PersistError> {
        let path = self.record_path(establishment)?;
        match fs::read_to_string(&path) {
            Ok(text) => Ok(MergeRecord::from_json_str(&text)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(MergeRecord::default()),
            Err(err) => Err(err.into()),
        }
    }

    fn clear(&self, establishment: &EstablishmentId) -> Result<(), PersistError> {
        let path = self.record_path(establishment)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

fn record_filename(establishment: &EstablishmentId) -> Result<String, PersistError> {
    let key = establishment.as_str();
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(PersistError::InvalidKey(key.to_string()));
    }
    Ok(format!("{key}{RECORD_SUFFIX}"))
}
