//! JSON backend and the file-backed gateway.

use serde_json::{Map, Value};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{Database, StoreError};

/// Serializes a [`Database`] to and from a byte stream.
pub trait StorageBackend {
    fn load(&self, reader: &mut dyn Read) -> Result<Database, StoreError>;
    fn dump(&self, db: &Database, writer: &mut dyn Write) -> Result<(), StoreError>;
}

/// Document layout: `{ "<table>": { "<primary key>": { "<Column>": value } } }`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonStore;

impl StorageBackend for JsonStore {
    fn load(&self, reader: &mut dyn Read) -> Result<Database, StoreError> {
        let document: Map<String, Value> = serde_json::from_reader(reader)?;
        Database::from_document(document)
    }

    fn dump(&self, db: &Database, writer: &mut dyn Write) -> Result<(), StoreError> {
        let document = db.to_document()?;
        serde_json::to_writer_pretty(&mut *writer, &document)?;
        writer.write_all(b"\n").map_err(serde_json::Error::io)?;
        Ok(())
    }
}

/// Picks the storage backend from the file extension.
pub fn backend_for_path(path: &Path) -> Result<Box<dyn StorageBackend>, StoreError> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(Box::new(JsonStore)),
        _ => Err(StoreError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Owns the backing file path and the backend used to read and write it.
pub struct PersistenceGateway {
    path: PathBuf,
    backend: Box<dyn StorageBackend>,
}

impl std::fmt::Debug for PersistenceGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceGateway")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl PersistenceGateway {
    pub fn for_path(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let backend = backend_for_path(&path)?;
        Ok(Self { path, backend })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Database, StoreError> {
        let file = File::open(&self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        let db = self.backend.load(&mut BufReader::new(file))?;
        info!(path = %self.path.display(), "loaded database");
        Ok(db)
    }

    /// Rewrites the backing file in place with the full database.
    pub fn save(&self, db: &Database) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        self.backend.dump(db, &mut writer)?;
        writer.flush().map_err(io_err)?;
        debug!(path = %self.path.display(), "saved database");
        Ok(())
    }
}
