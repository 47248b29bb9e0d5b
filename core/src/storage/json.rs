//! Json-based store for recordings.
//!
//! Same append-log discipline as the yaml store: every record is introduced
//! by a bare `-` separator line in column 0, followed by one pretty-printed
//! JSON document. The shared record cursor only depends on that boundary.

use std::path::Path;

use crate::error::{StoreError, VcrError};

use super::reader::RecordReader;
use super::{append_chunk, cassette_file_path, Recording, Storage};

pub struct JsonStorage {
    reader: RecordReader,
}

impl JsonStorage {
    /// Opens (creating if needed) the cassette file `name` under `root`.
    pub fn open(root: &Path, name: &str) -> Result<Self, VcrError> {
        let path = cassette_file_path(root, name)?;
        Ok(JsonStorage {
            reader: RecordReader::open(&path)?,
        })
    }

    fn malformed(&self, cause: String) -> StoreError {
        StoreError::MalformedRecord {
            path: self.reader.path().to_path_buf(),
            position: self.reader.position(),
            cause,
        }
    }
}

impl Storage for JsonStorage {
    fn store_recording(&mut self, recording: &Recording) -> Result<(), StoreError> {
        let document = serde_json::to_string_pretty(recording)
            .map_err(|e| self.malformed(e.to_string()))?;
        let chunk = format!("-\n{document}\n");
        append_chunk(self.reader.path(), &chunk)
    }

    fn rewind(&mut self) -> Result<(), StoreError> {
        self.reader.rewind()
    }

    fn next_recording(&mut self) -> Result<Option<Recording>, StoreError> {
        let Some(chunk) = self.reader.next_chunk()? else {
            return Ok(None);
        };
        // Drop the separator line, the rest is one JSON document.
        let document = match chunk.split_once('\n') {
            Some((_, rest)) => rest,
            None => return Err(self.malformed("record separator without document".to_string())),
        };
        serde_json::from_str(document)
            .map(Some)
            .map_err(|e| self.malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::sample_recording;
    use super::*;
    use std::fs;

    fn storage_in(dir: &tempfile::TempDir) -> JsonStorage {
        JsonStorage::open(dir.path(), "json_test").unwrap()
    }

    #[test]
    fn append_then_iterate_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = storage_in(&dir);
        let recordings = vec![
            sample_recording("/first", "one"),
            sample_recording("/second", "two"),
        ];
        for recording in &recordings {
            storage.store_recording(recording).unwrap();
        }

        storage.rewind().unwrap();
        let mut replayed = Vec::new();
        while let Some(recording) = storage.next_recording().unwrap() {
            replayed.push(recording);
        }
        assert_eq!(replayed, recordings);
    }

    #[test]
    fn records_are_separated_by_bare_dash_lines() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = storage_in(&dir);
        storage.store_recording(&sample_recording("/", "a")).unwrap();
        storage.store_recording(&sample_recording("/", "b")).unwrap();

        let contents = fs::read_to_string(dir.path().join("json_test")).unwrap();
        let separators = contents.lines().filter(|line| *line == "-").count();
        assert_eq!(separators, 2);
    }

    #[test]
    fn malformed_document_propagates_a_store_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("json_test"), "-\n{\"request\": oops}\n").unwrap();
        let mut storage = storage_in(&dir);
        storage.rewind().unwrap();
        let err = storage.next_recording().unwrap_err();
        assert!(matches!(err, StoreError::MalformedRecord { .. }));
    }

    #[test]
    fn empty_file_iterates_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = storage_in(&dir);
        storage.rewind().unwrap();
        assert!(storage.next_recording().unwrap().is_none());
    }
}
