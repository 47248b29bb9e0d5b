//! Record-and-replay layer for outbound HTTP and SOAP traffic in tests.
//!
//! # Overview
//! While recording, real requests reach the network and each exchange is
//! appended to a persistent cassette; while replaying, the same requests are
//! diverted before they touch the network and answered from the cassette.
//! The result is deterministic, offline test runs of code that performs
//! HTTP I/O.
//!
//! # Design
//! - Three hooks intercept distinct client surfaces (byte-stream, handle
//!   based, SOAP) and normalize every call into a [`Request`].
//! - The [`Vcr`] dispatcher owns the active [`Cassette`] and resolves each
//!   request under the enabled matcher set and the configured mode.
//! - Cassette stores are append-only logs iterated one record at a time, so
//!   memory stays bounded by the largest record.
//! - Everything is single-threaded and synchronous; hooks hold only weak
//!   references to the dispatcher, so dropping the recorder revokes
//!   interception everywhere.

pub mod cassette;
pub mod config;
pub mod error;
pub mod events;
pub mod headers;
pub mod hooks;
pub mod matchers;
pub mod request;
pub mod response;
pub mod storage;
pub mod transport;

mod recorder;

pub use cassette::Cassette;
pub use config::{Configuration, HookKind, Mode, StorageBackend};
pub use error::{ConfigError, NetworkError, StoreError, VcrError};
pub use events::{Event, EventBus, EventListener};
pub use headers::HeaderMap;
pub use hooks::handle::{
    ExecResult, HandleHook, HandleId, InfoField, InfoValue, MultiCode, MultiId, MultiMessage,
    MultiMsg,
};
pub use hooks::soap::{SoapHook, SoapVersion};
pub use hooks::stream::{StreamContext, StreamHandle, StreamHook};
pub use hooks::{LibraryHook, RequestCallback};
pub use recorder::Vcr;
pub use request::{
    ClientOpt, ClientOptions, FileSink, HeaderCallback, OptValue, ReadCallback, Request,
    WriteCallback,
};
pub use response::{Response, Status};
pub use storage::{Recording, Storage};
