//! Store that keeps nothing.
//!
//! For tests that want interception but neither record nor replay: appends
//! are discarded and iteration always comes up empty.

use crate::error::StoreError;

use super::{Recording, Storage};

#[derive(Debug, Default)]
pub struct BlackholeStorage;

impl BlackholeStorage {
    pub fn new() -> Self {
        BlackholeStorage
    }
}

impl Storage for BlackholeStorage {
    fn store_recording(&mut self, _recording: &Recording) -> Result<(), StoreError> {
        Ok(())
    }

    fn rewind(&mut self) -> Result<(), StoreError> {
        Ok(())
    }

    fn next_recording(&mut self) -> Result<Option<Recording>, StoreError> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::sample_recording;
    use super::*;

    #[test]
    fn swallows_appends_and_iterates_empty() {
        let mut storage = BlackholeStorage::new();
        storage
            .store_recording(&sample_recording("/", "gone"))
            .unwrap();
        storage.rewind().unwrap();
        assert!(storage.next_recording().unwrap().is_none());
    }
}
