//! Persistent cassette stores.
//!
//! # Design
//! A store is an append-only log of recordings plus a restartable cursor.
//! Appends are flushed immediately and become visible to the next
//! `rewind` + `next_recording` pass over the same file. Iteration holds at
//! most one record in memory: the cursor reads lines until the next record
//! boundary (a `-` in column 0) and pushes the boundary line back by seeking,
//! so file size never bounds memory use.

mod blackhole;
mod json;
mod reader;
mod yaml;

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use blackhole::BlackholeStorage;
pub use json::JsonStorage;
pub use yaml::YamlStorage;

use crate::config::StorageBackend;
use crate::error::{ConfigError, StoreError, VcrError};
use crate::request::Request;
use crate::response::Response;

/// One stored interaction: a request and the response it received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub request: Request,
    pub response: Response,
}

impl Recording {
    pub fn new(request: Request, response: Response) -> Self {
        Recording { request, response }
    }
}

/// An ordered, restartable sequence of recordings.
pub trait Storage {
    /// Durably appends `recording`; observable by a subsequent
    /// `rewind` + `next_recording` pass on the same store.
    fn store_recording(&mut self, recording: &Recording) -> Result<(), StoreError>;

    /// Resets the cursor to the first record.
    fn rewind(&mut self) -> Result<(), StoreError>;

    /// Yields the next recording in insertion order, or `None` past the end.
    fn next_recording(&mut self) -> Result<Option<Recording>, StoreError>;
}

/// Opens the storage configured for `backend` under `root`/`name`.
pub fn create_storage(
    backend: StorageBackend,
    root: &Path,
    name: &str,
) -> Result<Box<dyn Storage>, VcrError> {
    match backend {
        StorageBackend::Yaml => Ok(Box::new(YamlStorage::open(root, name)?)),
        StorageBackend::Json => Ok(Box::new(JsonStorage::open(root, name)?)),
        StorageBackend::Blackhole => Ok(Box::new(BlackholeStorage::new())),
    }
}

/// Resolves `name` below the cassette root, creating the file (and any
/// intermediate directories inside the root) on first use. The root itself
/// must already exist.
pub(crate) fn cassette_file_path(root: &Path, name: &str) -> Result<PathBuf, VcrError> {
    if !root.is_dir() {
        return Err(ConfigError::CassettePath {
            path: root.to_path_buf(),
        }
        .into());
    }
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StoreError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    if !path.exists() {
        File::create(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
    }
    Ok(path)
}

/// Appends `chunk` to the cassette file, making sure exactly one newline
/// separates it from the previous record, and flushes.
pub(crate) fn append_chunk(path: &Path, chunk: &str) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .open(path)
        .map_err(io_err)?;
    let len = file.seek(SeekFrom::End(0)).map_err(io_err)?;
    if len > 0 {
        file.seek(SeekFrom::End(-1)).map_err(io_err)?;
        let mut last = [0u8; 1];
        file.read_exact(&mut last).map_err(io_err)?;
        if last[0] != b'\n' {
            file.write_all(b"\n").map_err(io_err)?;
        }
    }
    file.write_all(chunk.as_bytes()).map_err(io_err)?;
    file.flush().map_err(io_err)?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::headers::HeaderMap;

    /// A minimal recording for store round-trip tests.
    pub fn sample_recording(path: &str, body: &str) -> Recording {
        let request = Request::new("GET", &format!("http://example.com{path}")).unwrap();
        let response = Response::new(
            200,
            HeaderMap::from([("Content-Type", "text/plain")]),
            body.to_string(),
        );
        Recording::new(request, response)
    }
}
