//! A named, ordered, persistent log of recorded interactions.
//!
//! The cassette owns its storage and scans it front to back for every
//! lookup, so memory stays bounded by one record regardless of file size.
//! Whether it was empty at insertion is latched once, because the `once`
//! mode keeps recording onto a cassette that started out empty even after
//! the first append.

use tracing::debug;

use crate::config::Configuration;
use crate::error::{StoreError, VcrError};
use crate::matchers::{self, Matcher};
use crate::request::Request;
use crate::response::Response;
use crate::storage::{self, Recording, Storage};

pub struct Cassette {
    name: String,
    storage: Box<dyn Storage>,
    empty_at_insert: bool,
}

impl Cassette {
    /// Opens (creating if needed) the cassette `name` under the configured
    /// root and storage backend.
    pub fn new(name: &str, config: &Configuration) -> Result<Self, VcrError> {
        let mut storage =
            storage::create_storage(config.storage_backend(), config.cassette_path(), name)?;
        storage.rewind()?;
        let empty_at_insert = storage.next_recording()?.is_none();
        debug!(cassette = name, empty = empty_at_insert, "cassette inserted");
        Ok(Cassette {
            name: name.to_string(),
            storage,
            empty_at_insert,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the cassette held no recordings when it was inserted. Latched
    /// at insert time; later appends do not flip it.
    pub fn was_empty_at_insert(&self) -> bool {
        self.empty_at_insert
    }

    /// The first stored recording the enabled matchers accept for `request`.
    pub fn find_match(
        &mut self,
        request: &Request,
        matchers: &[Matcher],
    ) -> Result<Option<Recording>, StoreError> {
        self.storage.rewind()?;
        while let Some(recording) = self.storage.next_recording()? {
            if matchers::request_matches(&recording.request, request, matchers) {
                return Ok(Some(recording));
            }
        }
        Ok(None)
    }

    /// Appends one interaction to the store.
    pub fn record(&mut self, request: &Request, response: &Response) -> Result<(), StoreError> {
        debug!(cassette = %self.name, url = %request.url_str(), "recording response");
        let recording = Recording::new(request.clone(), response.clone());
        self.storage.store_recording(&recording)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::HeaderMap;

    fn config_in(dir: &tempfile::TempDir) -> Configuration {
        let mut config = Configuration::new();
        config.set_cassette_path(dir.path()).unwrap();
        config
    }

    fn response(body: &str) -> Response {
        Response::new(200, HeaderMap::new(), body.to_string())
    }

    #[test]
    fn empty_at_insert_is_latched() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let mut cassette = Cassette::new("latched", &config).unwrap();
        assert!(cassette.was_empty_at_insert());

        let request = Request::new("GET", "http://example.com/").unwrap();
        cassette.record(&request, &response("body")).unwrap();
        assert!(cassette.was_empty_at_insert());

        // A fresh insert over the now non-empty file sees it as non-empty.
        let cassette = Cassette::new("latched", &config).unwrap();
        assert!(!cassette.was_empty_at_insert());
    }

    #[test]
    fn find_match_returns_first_matching_recording() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let mut cassette = Cassette::new("ordered", &config).unwrap();

        let a = Request::new("GET", "http://example.com/a").unwrap();
        let b = Request::new("GET", "http://example.com/b").unwrap();
        cassette.record(&a, &response("first")).unwrap();
        cassette.record(&a, &response("second")).unwrap();
        cassette.record(&b, &response("other")).unwrap();

        let matchers = config.request_matchers();
        let hit = cassette.find_match(&a, &matchers).unwrap().unwrap();
        assert_eq!(hit.response.body(), Some("first"));

        let hit = cassette.find_match(&b, &matchers).unwrap().unwrap();
        assert_eq!(hit.response.body(), Some("other"));

        let miss = Request::new("GET", "http://example.com/c").unwrap();
        assert!(cassette.find_match(&miss, &matchers).unwrap().is_none());
    }

    #[test]
    fn nested_cassette_names_create_directories() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        Cassette::new("folder/file", &config).unwrap();
        assert!(dir.path().join("folder").join("file").is_file());
    }
}
