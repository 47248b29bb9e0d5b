//! Yaml-based store for recordings.
//!
//! Each record is dumped as a one-element list, so a well-behaved cassette
//! file is a sequence of `- request: ... response: ...` blocks. The file can
//! be iterated while keeping memory bounded by the largest single record.

use std::path::Path;

use crate::error::{StoreError, VcrError};

use super::reader::RecordReader;
use super::{append_chunk, cassette_file_path, Recording, Storage};

pub struct YamlStorage {
    reader: RecordReader,
}

impl YamlStorage {
    /// Opens (creating if needed) the cassette file `name` under `root`.
    pub fn open(root: &Path, name: &str) -> Result<Self, VcrError> {
        let path = cassette_file_path(root, name)?;
        Ok(YamlStorage {
            reader: RecordReader::open(&path)?,
        })
    }
}

impl Storage for YamlStorage {
    fn store_recording(&mut self, recording: &Recording) -> Result<(), StoreError> {
        let chunk = serde_yaml::to_string(&[recording]).map_err(|e| StoreError::MalformedRecord {
            path: self.reader.path().to_path_buf(),
            position: self.reader.position(),
            cause: e.to_string(),
        })?;
        append_chunk(self.reader.path(), &chunk)
    }

    fn rewind(&mut self) -> Result<(), StoreError> {
        self.reader.rewind()
    }

    fn next_recording(&mut self) -> Result<Option<Recording>, StoreError> {
        let Some(chunk) = self.reader.next_chunk()? else {
            return Ok(None);
        };
        let mut records: Vec<Recording> =
            serde_yaml::from_str(&chunk).map_err(|e| StoreError::MalformedRecord {
                path: self.reader.path().to_path_buf(),
                position: self.reader.position(),
                cause: e.to_string(),
            })?;
        match records.pop() {
            Some(recording) => Ok(Some(recording)),
            None => Err(StoreError::MalformedRecord {
                path: self.reader.path().to_path_buf(),
                position: self.reader.position(),
                cause: "record block holds no recording".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::sample_recording;
    use super::*;
    use std::fs;

    fn storage_in(dir: &tempfile::TempDir) -> YamlStorage {
        YamlStorage::open(dir.path(), "yaml_test").unwrap()
    }

    #[test]
    fn append_then_iterate_round_trips_one_recording() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = storage_in(&dir);
        let recording = sample_recording("/", "some response");

        storage.store_recording(&recording).unwrap();

        storage.rewind().unwrap();
        assert_eq!(storage.next_recording().unwrap().unwrap(), recording);
        assert!(storage.next_recording().unwrap().is_none());
    }

    // Appending r1..rn to an empty store and iterating after rewind yields
    // exactly r1..rn.
    #[test]
    fn append_then_iterate_preserves_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = storage_in(&dir);
        let recordings = vec![
            sample_recording("/first", "one"),
            sample_recording("/second", "two"),
            sample_recording("/third", "three"),
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
    fn iteration_is_restartable() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = storage_in(&dir);
        storage.store_recording(&sample_recording("/a", "a")).unwrap();
        storage.store_recording(&sample_recording("/b", "b")).unwrap();

        storage.rewind().unwrap();
        while storage.next_recording().unwrap().is_some() {}

        storage.rewind().unwrap();
        assert_eq!(
            storage.next_recording().unwrap().unwrap(),
            sample_recording("/a", "a")
        );
    }

    #[test]
    fn appends_are_visible_to_an_open_cursor_after_rewind() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = storage_in(&dir);
        storage.store_recording(&sample_recording("/a", "a")).unwrap();
        storage.rewind().unwrap();
        while storage.next_recording().unwrap().is_some() {}

        storage.store_recording(&sample_recording("/b", "b")).unwrap();
        storage.rewind().unwrap();
        let mut count = 0;
        while storage.next_recording().unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 2);
    }

    #[test]
    fn each_record_is_a_one_element_list_block() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = storage_in(&dir);
        storage.store_recording(&sample_recording("/", "body")).unwrap();
        storage.store_recording(&sample_recording("/", "body")).unwrap();

        let contents = fs::read_to_string(dir.path().join("yaml_test")).unwrap();
        let boundaries = contents
            .lines()
            .filter(|line| line.as_bytes().first() == Some(&b'-'))
            .count();
        assert_eq!(boundaries, 2);
    }

    #[test]
    fn malformed_record_propagates_a_store_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("yaml_test"), "-\n  ]broken[: : :\n").unwrap();
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
