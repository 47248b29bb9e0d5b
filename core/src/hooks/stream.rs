//! Hook for the byte-stream client surface.
//!
//! # Design
//! The native surface opens `http`/`https` URLs with a per-call context
//! (method, a single header block, body, redirect and timeout tweaks) and
//! reads the response as a stream. The hook materializes that context as a
//! [`Request`], routes it through the dispatcher, and hands back a readable
//! handle over the recorded body.

use std::io::{Cursor, Read};
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::error::VcrError;
use crate::request::{ClientOpt, OptValue, Request};
use crate::response::Response;

use super::{dispatch, LibraryHook, RequestCallback};

/// Per-call options of a stream open, mirroring the native context keys.
#[derive(Debug, Clone, Default)]
pub struct StreamContext {
    /// HTTP method; `GET` when absent.
    pub method: Option<String>,
    /// A single header block, one `Name: Value` per line, optionally
    /// CRLF-terminated.
    pub header: Option<String>,
    /// Becomes the `User-Agent` header.
    pub user_agent: Option<String>,
    /// Becomes the request body.
    pub content: Option<String>,
    /// `0` disables redirect following.
    pub follow_location: Option<i64>,
    /// Redirect cap.
    pub max_redirects: Option<i64>,
    /// Timeout in seconds.
    pub timeout: Option<i64>,
}

/// Builds a normalized request from a stream context.
pub fn request_from_context(url: &str, context: &StreamContext) -> Result<Request, VcrError> {
    let method = context.method.as_deref().unwrap_or("GET");
    let mut request = Request::new(method, url)?;

    if let Some(block) = &context.header {
        for line in block.split("\r\n").flat_map(|part| part.split('\n')) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some((name, value)) = line.split_once(':') {
                request.set_header(name.trim(), Some(value.trim().to_string()));
            }
        }
    }
    if let Some(user_agent) = &context.user_agent {
        request.set_header("User-Agent", Some(user_agent.clone()));
    }
    if let Some(content) = &context.content {
        request.set_body(Some(content.clone()));
    }
    if let Some(follow) = context.follow_location {
        request.set_client_option(ClientOpt::FollowLocation, OptValue::Bool(follow != 0));
    }
    if let Some(max) = context.max_redirects {
        request.set_client_option(ClientOpt::MaxRedirs, OptValue::Int(max));
    }
    if let Some(timeout) = context.timeout {
        request.set_client_option(ClientOpt::Timeout, OptValue::Int(timeout));
    }
    Ok(request)
}

/// The stream-client hook.
#[derive(Default)]
pub struct StreamHook {
    callback: Option<Weak<RequestCallback>>,
}

impl StreamHook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens `url` under `context` and returns a readable handle over the
    /// response body. Disabled hooks perform the real transfer.
    pub fn open(&self, url: &str, context: &StreamContext) -> Result<StreamHandle, VcrError> {
        let request = request_from_context(url, context)?;
        debug!(url, intercepted = self.is_enabled(), "stream open");
        let response = dispatch(&self.callback, &request)?;
        Ok(StreamHandle::new(response))
    }
}

impl LibraryHook for StreamHook {
    fn enable(&mut self, callback: &Rc<RequestCallback>) {
        if self.callback.is_some() {
            return;
        }
        self.callback = Some(Rc::downgrade(callback));
    }

    fn disable(&mut self) {
        self.callback = None;
    }

    fn is_enabled(&self) -> bool {
        self.callback.is_some()
    }
}

/// Readable view over a resolved response body, with the response metadata
/// still reachable for callers that want status or headers.
#[derive(Debug)]
pub struct StreamHandle {
    response: Response,
    cursor: Cursor<Vec<u8>>,
}

impl StreamHandle {
    fn new(response: Response) -> Self {
        let cursor = Cursor::new(response.body_str().as_bytes().to_vec());
        StreamHandle { response, cursor }
    }

    pub fn response(&self) -> &Response {
        &self.response
    }
}

impl Read for StreamHandle {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.cursor.read(buf)
    }
}
