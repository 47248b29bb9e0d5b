//! Error types for the recorder core.
//!
//! # Design
//! Configuration mistakes, unmatched requests and malformed cassettes surface
//! to the test as hard errors. Failures of real (passthrough) transfers are
//! deliberately *not* propagated out of the handle hook: they are captured on
//! the handle as a [`NetworkError`] so `error()`/`errno()`/`getinfo()` can
//! report them afterwards, matching the native client contract.

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for recorder operations.
#[derive(Error, Debug)]
pub enum VcrError {
    /// A configuration-time mistake. Never swallowed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A request was constructed from a URL without scheme and host.
    #[error("URL '{url}' must carry a scheme and a host")]
    InvalidHost {
        /// The offending URL as given by the caller.
        url: String,
    },

    /// No recording matched and the cassette mode forbids a live request.
    #[error(
        "no recording matches {method} '{url}' on cassette '{cassette}' (mode '{mode}'); \
         re-record the cassette or adjust the enabled request matchers"
    )]
    UnmatchedRequest {
        /// Method of the unmatched request.
        method: String,
        /// URL of the unmatched request.
        url: String,
        /// Name of the active cassette.
        cassette: String,
        /// The mode that refused the live request.
        mode: String,
    },

    /// A live transfer failed while recording or passing through.
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// A cassette file could not be read or written.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// `getinfo` was called on a handle with neither a response nor an error.
    #[error("handle {handle} has neither a response nor an error to report")]
    HandleInfoUnavailable {
        /// The handle that was queried.
        handle: u64,
    },

    /// An operation referenced a handle id that was never issued or was closed.
    #[error("unknown client handle {handle}")]
    UnknownHandle {
        /// The handle that was not found.
        handle: u64,
    },

    /// A hook dispatched a request but the recorder behind it is gone.
    #[error("request dispatcher is no longer alive")]
    DispatcherGone,

    /// A request was intercepted while no cassette is inserted.
    #[error("no cassette inserted; insert a cassette before issuing requests")]
    CassetteNotInserted,

    /// Delivering a response body to its sink (file, stdout) failed.
    #[error("writing response output failed: {0}")]
    Output(#[from] std::io::Error),
}

/// Configuration-time errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The cassette root path does not exist or is not a directory.
    #[error("cassette path '{path}' is not an existing directory; create it or configure a different path")]
    CassettePath {
        /// The rejected path.
        path: PathBuf,
    },

    /// A hook was enabled by a name that is not registered.
    #[error("library hook '{name}' does not exist")]
    UnknownHook {
        /// The unknown hook name.
        name: String,
    },

    /// One or more matcher names are not registered.
    #[error("request matchers don't exist: {names}")]
    UnknownMatchers {
        /// Comma-joined list of the unknown names.
        names: String,
    },

    /// A storage backend was selected by an unknown name.
    #[error("storage '{name}' is not available")]
    UnknownStorage {
        /// The unknown storage name.
        name: String,
    },

    /// A mode was selected by an unknown name.
    #[error("mode '{name}' does not exist")]
    UnknownMode {
        /// The unknown mode name.
        name: String,
    },

    /// `add_request_matcher` was called with an empty name.
    #[error("a request matcher name must be at least one character long")]
    EmptyMatcherName,

    /// A read callback was set without the in-file size option.
    #[error("a read callback requires the in-file size option to be set first")]
    ReadFunctionWithoutSize,
}

/// Cassette file errors raised while appending or iterating records.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The cassette file could not be created, read or written.
    #[error("cassette file i/o failed at '{path}': {source}")]
    Io {
        /// Path of the cassette file.
        path: PathBuf,
        /// The underlying i/o error.
        source: std::io::Error,
    },

    /// A record could not be decoded. Aborts the current iteration.
    #[error("malformed record {position} in cassette '{path}': {cause}")]
    MalformedRecord {
        /// Path of the cassette file.
        path: PathBuf,
        /// One-based position of the record in the file.
        position: usize,
        /// Decoder diagnostic.
        cause: String,
    },
}

/// A failed live transfer, reported with a curl-style numeric code.
///
/// Stored verbatim on the originating handle so that `error()`, `errno()`
/// and `getinfo()` can reproduce what the native client would have reported.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct NetworkError {
    /// Human-readable transport diagnostic.
    pub message: String,
    /// curl-style numeric error code (7 = could not connect).
    pub code: i64,
    /// The URL of the failed transfer, when known.
    pub url: Option<String>,
}
