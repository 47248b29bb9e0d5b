//! Hook for the handle-based (cURL-shaped) client surface.
//!
//! # Design
//! The native library keeps per-transfer state behind an opaque handle
//! pointer; here a handle is a small integer id into hook-owned registries:
//! `requests`, `responses`, `options` and `last_errors`, plus multi-handle
//! membership and a completion queue. Option mutations are folded into the
//! pending request as they arrive; `exec` resolves the request through the
//! dispatcher and renders the response exactly the way the native client
//! would (header block, header/write callbacks, file sink, return-transfer
//! or stdout). Transfer failures never escape `exec`: they are parked on the
//! handle for `error`/`errno`/`getinfo`.
//!
//! Registries survive disable/enable so in-flight handles stay usable; they
//! are dropped on `reset` and `close`.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{Cursor, Write};
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::error::{ConfigError, NetworkError, VcrError};
use crate::request::{ClientOpt, ClientOptions, OptValue, Request};
use crate::response::Response;

use super::{dispatch, LibraryHook, RequestCallback};

/// Opaque per-transfer handle id.
pub type HandleId = u64;

/// Opaque multi-handle id.
pub type MultiId = u64;

/// What `exec` hands back to the client.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecResult {
    /// The body, when the return-transfer option is on.
    Transfer(String),
    /// The transfer completed and its output went to a sink.
    Done,
    /// The transfer failed; the error is parked on the handle.
    Failed,
}

impl ExecResult {
    pub fn is_failed(&self) -> bool {
        matches!(self, ExecResult::Failed)
    }

    pub fn into_transfer(self) -> Option<String> {
        match self {
            ExecResult::Transfer(body) => Some(body),
            _ => None,
        }
    }
}

/// Return code of `multi_exec`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiCode {
    Ok,
}

/// Message kind reported by `multi_info_read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiMsg {
    Done,
}

/// One completion message popped by `multi_info_read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultiMessage {
    pub msg: MultiMsg,
    pub handle: HandleId,
    /// Per-transfer result code; 0 is success.
    pub result: i64,
}

/// A single transfer-info field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoField {
    Url,
    ContentType,
    HttpCode,
    HeaderSize,
    RequestSize,
    Filetime,
    SslVerifyResult,
    RedirectCount,
    TotalTime,
    NamelookupTime,
    ConnectTime,
    PretransferTime,
    SizeUpload,
    SizeDownload,
    SpeedDownload,
    SpeedUpload,
    DownloadContentLength,
    UploadContentLength,
    StarttransferTime,
    RedirectTime,
    PrimaryIp,
}

impl InfoField {
    /// Every info field, in the order the full map reports them.
    pub const ALL: [InfoField; 21] = [
        InfoField::Url,
        InfoField::ContentType,
        InfoField::HttpCode,
        InfoField::HeaderSize,
        InfoField::RequestSize,
        InfoField::Filetime,
        InfoField::SslVerifyResult,
        InfoField::RedirectCount,
        InfoField::TotalTime,
        InfoField::NamelookupTime,
        InfoField::ConnectTime,
        InfoField::PretransferTime,
        InfoField::SizeUpload,
        InfoField::SizeDownload,
        InfoField::SpeedDownload,
        InfoField::SpeedUpload,
        InfoField::DownloadContentLength,
        InfoField::UploadContentLength,
        InfoField::StarttransferTime,
        InfoField::RedirectTime,
        InfoField::PrimaryIp,
    ];

    pub fn key(self) -> &'static str {
        match self {
            InfoField::Url => "url",
            InfoField::ContentType => "content_type",
            InfoField::HttpCode => "http_code",
            InfoField::HeaderSize => "header_size",
            InfoField::RequestSize => "request_size",
            InfoField::Filetime => "filetime",
            InfoField::SslVerifyResult => "ssl_verify_result",
            InfoField::RedirectCount => "redirect_count",
            InfoField::TotalTime => "total_time",
            InfoField::NamelookupTime => "namelookup_time",
            InfoField::ConnectTime => "connect_time",
            InfoField::PretransferTime => "pretransfer_time",
            InfoField::SizeUpload => "size_upload",
            InfoField::SizeDownload => "size_download",
            InfoField::SpeedDownload => "speed_download",
            InfoField::SpeedUpload => "speed_upload",
            InfoField::DownloadContentLength => "download_content_length",
            InfoField::UploadContentLength => "upload_content_length",
            InfoField::StarttransferTime => "starttransfer_time",
            InfoField::RedirectTime => "redirect_time",
            InfoField::PrimaryIp => "primary_ip",
        }
    }
}

/// A transfer-info value.
#[derive(Debug, Clone, PartialEq)]
pub enum InfoValue {
    Str(String),
    Int(i64),
    Float(f64),
}

impl InfoValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            InfoValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            InfoValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// The handle-based client hook.
#[derive(Default)]
pub struct HandleHook {
    callback: Option<Weak<RequestCallback>>,
    next_handle: HandleId,
    next_multi: MultiId,
    requests: BTreeMap<HandleId, Request>,
    responses: BTreeMap<HandleId, Response>,
    options: BTreeMap<HandleId, ClientOptions>,
    last_errors: BTreeMap<HandleId, NetworkError>,
    multi_handles: BTreeMap<MultiId, BTreeSet<HandleId>>,
    multi_exec_done: Vec<HandleId>,
}

impl HandleHook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a fresh handle, seeded with a GET request for `url`.
    pub fn init(&mut self, url: Option<&str>) -> Result<HandleId, VcrError> {
        let request = match url {
            Some(url) => Request::new("GET", url)?,
            None => Request::without_url("GET"),
        };
        self.next_handle += 1;
        let handle = self.next_handle;
        self.requests.insert(handle, request);
        self.options.insert(handle, ClientOptions::default());
        Ok(handle)
    }

    /// Reseeds the handle as if it had just been issued without a URL.
    pub fn reset(&mut self, handle: HandleId) {
        self.requests.insert(handle, Request::without_url("GET"));
        self.options.insert(handle, ClientOptions::default());
        self.responses.remove(&handle);
    }

    /// Finalizes the handle and drops all of its state.
    pub fn close(&mut self, handle: HandleId) {
        self.requests.remove(&handle);
        self.responses.remove(&handle);
        self.options.remove(&handle);
        self.last_errors.remove(&handle);
    }

    /// The pending request of `handle`, if the handle is live.
    pub fn request(&self, handle: HandleId) -> Option<&Request> {
        self.requests.get(&handle)
    }

    /// The stored response of `handle`, once `exec` succeeded.
    pub fn response(&self, handle: HandleId) -> Option<&Response> {
        self.responses.get(&handle)
    }

    /// Applies one option to the handle's pending request and records it for
    /// response rendering.
    pub fn setopt(
        &mut self,
        handle: HandleId,
        opt: ClientOpt,
        value: OptValue,
    ) -> Result<(), VcrError> {
        let request = self
            .requests
            .get_mut(&handle)
            .ok_or(VcrError::UnknownHandle { handle })?;
        apply_option(request, opt, &value)?;

        let options = self.options.entry(handle).or_default();
        if opt == ClientOpt::ReadFunction && matches!(value, OptValue::Null) {
            options.remove(ClientOpt::ReadFunction);
        } else {
            options.set(opt, value);
        }
        Ok(())
    }

    /// Applies a batch of options in insertion order.
    pub fn setopt_array(
        &mut self,
        handle: HandleId,
        options: Vec<(ClientOpt, OptValue)>,
    ) -> Result<(), VcrError> {
        for (opt, value) in options {
            self.setopt(handle, opt, value)?;
        }
        Ok(())
    }

    /// Performs the transfer: resolves the pending request through the
    /// dispatcher (or the real network while disabled) and renders the
    /// response according to the handle's options.
    pub fn exec(&mut self, handle: HandleId) -> Result<ExecResult, VcrError> {
        self.resolve_read_function(handle)?;
        let request = self
            .requests
            .get(&handle)
            .ok_or(VcrError::UnknownHandle { handle })?
            .clone();
        debug!(
            handle,
            url = %request.url_str(),
            intercepted = self.is_enabled(),
            "handle exec"
        );
        match dispatch(&self.callback, &request) {
            Ok(response) => {
                self.responses.insert(handle, response.clone());
                self.render_output(handle, &response)
            }
            Err(VcrError::Network(error)) => {
                self.last_errors.insert(handle, error);
                Ok(ExecResult::Failed)
            }
            Err(other) => Err(other),
        }
    }

    /// One transfer-info field, computed from the stored response, or from
    /// the parked error when the transfer failed.
    pub fn getinfo(&self, handle: HandleId, field: InfoField) -> Result<InfoValue, VcrError> {
        if let Some(response) = self.responses.get(&handle) {
            Ok(response_info(self.requests.get(&handle), response, field))
        } else if let Some(error) = self.last_errors.get(&handle) {
            Ok(error_info(error, field))
        } else {
            Err(VcrError::HandleInfoUnavailable { handle })
        }
    }

    /// The full transfer-info map. Exactly [`InfoField::ALL`] keys.
    pub fn getinfo_all(
        &self,
        handle: HandleId,
    ) -> Result<BTreeMap<&'static str, InfoValue>, VcrError> {
        InfoField::ALL
            .iter()
            .map(|field| Ok((field.key(), self.getinfo(handle, *field)?)))
            .collect()
    }

    /// The parked error message, or the empty string.
    pub fn error(&self, handle: HandleId) -> String {
        self.last_errors
            .get(&handle)
            .map(|e| e.message.clone())
            .unwrap_or_default()
    }

    /// The parked error code, or 0.
    pub fn errno(&self, handle: HandleId) -> i64 {
        self.last_errors.get(&handle).map(|e| e.code).unwrap_or(0)
    }

    pub fn multi_init(&mut self) -> MultiId {
        self.next_multi += 1;
        self.multi_handles.insert(self.next_multi, BTreeSet::new());
        self.next_multi
    }

    pub fn multi_add(&mut self, multi: MultiId, handle: HandleId) {
        self.multi_handles.entry(multi).or_default().insert(handle);
    }

    pub fn multi_remove(&mut self, multi: MultiId, handle: HandleId) {
        if let Some(handles) = self.multi_handles.get_mut(&multi) {
            handles.remove(&handle);
        }
    }

    pub fn multi_close(&mut self, multi: MultiId) {
        self.multi_handles.remove(&multi);
    }

    /// Executes every member handle that has no response yet. All work is
    /// synchronous, so `still_running` always comes back 0.
    pub fn multi_exec(
        &mut self,
        multi: MultiId,
        still_running: &mut i32,
    ) -> Result<MultiCode, VcrError> {
        if let Some(handles) = self.multi_handles.get(&multi).cloned() {
            for handle in handles {
                if !self.responses.contains_key(&handle) {
                    self.multi_exec_done.push(handle);
                    self.exec(handle)?;
                }
            }
        }
        *still_running = 0;
        Ok(MultiCode::Ok)
    }

    /// Pops one completion message, last finished handle first, or `None`
    /// when the queue is drained.
    pub fn multi_info_read(&mut self, _multi: MultiId) -> Option<MultiMessage> {
        self.multi_exec_done.pop().map(|handle| MultiMessage {
            msg: MultiMsg::Done,
            handle,
            result: 0,
        })
    }

    /// Runs the upload callback, if one is set. Requires the in-file size
    /// option; fails with a configuration error otherwise.
    fn resolve_read_function(&mut self, handle: HandleId) -> Result<(), VcrError> {
        let read_fn = match self
            .options
            .get(&handle)
            .and_then(|o| o.get(ClientOpt::ReadFunction))
        {
            Some(OptValue::ReadFn(f)) => Rc::clone(f),
            _ => return Ok(()),
        };
        let size = self
            .options
            .get(&handle)
            .and_then(|o| o.get(ClientOpt::InfileSize))
            .and_then(OptValue::as_int)
            .ok_or(ConfigError::ReadFunctionWithoutSize)?;

        let request = self
            .requests
            .get_mut(&handle)
            .ok_or(VcrError::UnknownHandle { handle })?;
        let mut body_stream = Cursor::new(request.body().unwrap_or("").as_bytes().to_vec());
        let body = read_fn(handle, &mut body_stream, size as usize);
        request.set_body(Some(body));
        Ok(())
    }

    /// Renders `response` into the client-visible output channels.
    fn render_output(
        &mut self,
        handle: HandleId,
        response: &Response,
    ) -> Result<ExecResult, VcrError> {
        let options = self.options.get(&handle).cloned().unwrap_or_default();

        let mut output = response.body_str().to_string();
        if options
            .get(ClientOpt::Header)
            .map(OptValue::is_truthy)
            .unwrap_or(false)
        {
            output = format!("{}{output}", response.header_block());
        }
        if let Some(OptValue::HeaderFn(header_fn)) = options.get(ClientOpt::HeaderFunction) {
            for line in response.header_lines() {
                header_fn(handle, &line);
            }
        }

        if let Some(OptValue::WriteFn(write_fn)) = options.get(ClientOpt::WriteFunction) {
            write_fn(handle, &output);
            return Ok(ExecResult::Done);
        }
        if let Some(OptValue::File(sink)) = options.get(ClientOpt::File) {
            sink.borrow_mut().write_all(output.as_bytes())?;
            return Ok(ExecResult::Done);
        }
        if options
            .get(ClientOpt::ReturnTransfer)
            .map(OptValue::is_truthy)
            .unwrap_or(false)
        {
            return Ok(ExecResult::Transfer(output));
        }
        std::io::stdout().write_all(output.as_bytes())?;
        Ok(ExecResult::Done)
    }
}

impl LibraryHook for HandleHook {
    fn enable(&mut self, callback: &Rc<RequestCallback>) {
        if self.callback.is_some() {
            return;
        }
        self.callback = Some(Rc::downgrade(callback));
    }

    fn disable(&mut self) {
        // Per-handle registries stay put so live handles survive a
        // disable/enable cycle.
        self.callback = None;
    }

    fn is_enabled(&self) -> bool {
        self.callback.is_some()
    }
}

/// Folds one option mutation into the pending request.
fn apply_option(request: &mut Request, opt: ClientOpt, value: &OptValue) -> Result<(), VcrError> {
    match opt {
        ClientOpt::Url => {
            if let Some(url) = value.as_str() {
                request.set_url(url)?;
            }
        }
        ClientOpt::HttpHeader => {
            if let OptValue::List(lines) = value {
                for line in lines {
                    if let Some((name, header_value)) = line.split_once(':') {
                        request.set_header(name.trim(), Some(header_value.trim().to_string()));
                    }
                }
            }
        }
        ClientOpt::PostFields => match value {
            OptValue::Fields(fields) if !fields.is_empty() => {
                request.set_post_fields(fields.clone());
                enforce_method_after_post_fields(request);
            }
            OptValue::Str(body) if !body.is_empty() => {
                request.set_body(Some(body.clone()));
                enforce_method_after_post_fields(request);
            }
            // Empty string, empty mapping or null: clear both body shapes,
            // consistent with how requests read back out of storage.
            _ => request.set_post_fields(BTreeMap::new()),
        },
        ClientOpt::CustomRequest => {
            if let Some(method) = value.as_str() {
                let method = method.to_string();
                request.set_method(&method);
            }
        }
        ClientOpt::ReadFunction => {
            if matches!(value, OptValue::Null) {
                request.remove_client_option(ClientOpt::ReadFunction);
                return Ok(());
            }
        }
        _ => {}
    }
    request.set_client_option(opt, value.clone());
    Ok(())
}

/// The custom-request override is sticky: whenever post fields change the
/// method, a stored custom request wins over the implied POST.
fn enforce_method_after_post_fields(request: &mut Request) {
    let custom = request
        .client_option(ClientOpt::CustomRequest)
        .and_then(OptValue::as_str)
        .map(str::to_string);
    match custom {
        Some(method) => request.set_method(&method),
        None => request.set_method("POST"),
    }
}

fn response_info(request: Option<&Request>, response: &Response, field: InfoField) -> InfoValue {
    match field {
        InfoField::Url => InfoValue::Str(request.map(Request::url_str).unwrap_or_default()),
        InfoField::ContentType => {
            InfoValue::Str(response.content_type().unwrap_or_default().to_string())
        }
        InfoField::HttpCode => InfoValue::Int(i64::from(response.code())),
        InfoField::HeaderSize => InfoValue::Int(response.header_block().len() as i64),
        InfoField::SizeDownload => InfoValue::Int(response.body_str().len() as i64),
        InfoField::PrimaryIp => InfoValue::Str(String::new()),
        InfoField::RequestSize
        | InfoField::Filetime
        | InfoField::SslVerifyResult
        | InfoField::RedirectCount
        | InfoField::SizeUpload
        | InfoField::DownloadContentLength
        | InfoField::UploadContentLength => InfoValue::Int(0),
        InfoField::TotalTime
        | InfoField::NamelookupTime
        | InfoField::ConnectTime
        | InfoField::PretransferTime
        | InfoField::SpeedDownload
        | InfoField::SpeedUpload
        | InfoField::StarttransferTime
        | InfoField::RedirectTime => InfoValue::Float(0.0),
    }
}

fn error_info(error: &NetworkError, field: InfoField) -> InfoValue {
    match field {
        InfoField::Url => InfoValue::Str(error.url.clone().unwrap_or_default()),
        InfoField::ContentType | InfoField::PrimaryIp => InfoValue::Str(String::new()),
        InfoField::HttpCode
        | InfoField::HeaderSize
        | InfoField::RequestSize
        | InfoField::Filetime
        | InfoField::SslVerifyResult
        | InfoField::RedirectCount
        | InfoField::SizeUpload
        | InfoField::SizeDownload
        | InfoField::DownloadContentLength
        | InfoField::UploadContentLength => InfoValue::Int(0),
        InfoField::TotalTime
        | InfoField::NamelookupTime
        | InfoField::ConnectTime
        | InfoField::PretransferTime
        | InfoField::SpeedDownload
        | InfoField::SpeedUpload
        | InfoField::StarttransferTime
        | InfoField::RedirectTime => InfoValue::Float(0.0),
    }
}
