//! Whole-document JSON persistence shared by the repositories.
//!
//! Both repositories keep their entire data set in memory and rewrite the backing
//! file after every mutation. Loading never fails: a missing, unreadable or corrupt
//! file degrades to an empty document and is logged. Saving goes through a temporary
//! file in the target directory that is renamed over the target, so a crash mid-write
//! leaves the previous document intact.

use log::{debug, error, info, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Errors that can occur while writing a document to disk.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// The file (or its directory) could not be written
    #[error("Cannot write {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The document could not be turned into JSON
    #[error("Cannot serialize document for {}", path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Reads the JSON document at `path`, falling back to `T::default()` on any failure.
pub fn load<T: DeserializeOwned + Default>(path: &Path) -> T {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("No document at {}, starting empty", path.display());
            return T::default();
        }
        Err(e) => {
            error!("Failed to read {}: {}", path.display(), e);
            return T::default();
        }
    };
    match serde_json::from_str(&contents) {
        Ok(document) => document,
        Err(e) => {
            warn!(
                "Could not decode JSON from {}, starting empty: {}",
                path.display(),
                e
            );
            T::default()
        }
    }
}

/// Writes `document` to `path` as indented JSON, replacing the previous file atomically.
pub fn save<T: Serialize>(path: &Path, document: &T) -> Result<(), PersistenceError> {
    let io_error = |source: std::io::Error| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(io_error)?;

    let mut json =
        serde_json::to_vec_pretty(document).map_err(|source| PersistenceError::Serialize {
            path: path.to_path_buf(),
            source,
        })?;
    json.push(b'\n');

    let mut tmp = NamedTempFile::new_in(dir).map_err(io_error)?;
    tmp.write_all(&json).map_err(io_error)?;
    tmp.as_file().sync_all().map_err(io_error)?;
    tmp.persist(path).map_err(|e| io_error(e.error))?;
    debug!("Saved {} bytes to {}", json.len(), path.display());
    Ok(())
}
